use poise::serenity_prelude::{self as serenity, Context};
use serenity::all::{
    ComponentInteraction, CreateInteractionResponse, CreateInteractionResponseMessage, GuildId,
    Permissions,
};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::button_controls::{PLAY_PAUSE, QUEUE, SKIP, STOP};
use super::checks::check_voice_membership;
use super::embedded_messages;
use super::limits::{Bucket, Limits};
use super::music_manager::{MusicError, MusicManager, MusicResult};
use super::pool::{BotPool, PlayerHandle, PoolBot};

/// Handle a button press on a player controller
pub async fn handle_interaction(
    ctx: &Context,
    interaction: &ComponentInteraction,
    pool: &BotPool,
    limits: &Limits,
) {
    let response = match process(ctx, interaction, pool, limits).await {
        Ok(response) => response,
        Err(e) => {
            if !e.is_user_facing() {
                error!(
                    "Error handling button {} for {}: {}",
                    interaction.data.custom_id, interaction.user.name, e
                );
            }
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embed(embedded_messages::error(e.to_string()))
                    .ephemeral(true),
            )
        }
    };

    if let Err(e) = interaction.create_response(&ctx.http, response).await {
        error!("Failed to respond to button interaction: {}", e);
    }
}

async fn process(
    ctx: &Context,
    interaction: &ComponentInteraction,
    pool: &BotPool,
    limits: &Limits,
) -> MusicResult<CreateInteractionResponse> {
    let guild_id = interaction.guild_id.ok_or(MusicError::NotInGuild)?;
    let user_id = interaction.user.id;
    let _permit = limits
        .player_interaction
        .try_acquire(Bucket::Member(guild_id, user_id))?;

    // The controller was sent by the bot hosting the player, so the press lands on its client.
    let bot_id = ctx.cache.current_user().id;
    let bot = pool.get(bot_id).await.ok_or(MusicError::PoolUnavailable)?;
    let handle = bot.player(guild_id).ok_or(MusicError::NoPlayer)?;

    let player_voice = handle.lock().await.voice_channel;
    check_voice_membership(bot.voice_channel_of(guild_id, user_id), Some(player_voice))?;

    let permissions = interaction
        .member
        .as_ref()
        .and_then(|member| member.permissions)
        .unwrap_or_else(Permissions::empty);

    debug!(
        "Button {} pressed by {} in guild {}",
        interaction.data.custom_id, interaction.user.name, guild_id
    );

    match interaction.data.custom_id.as_str() {
        PLAY_PAUSE => handle_play_pause(&bot, &handle, interaction).await,
        SKIP => handle_skip(&bot, &handle, interaction, permissions).await,
        STOP => handle_stop(&bot, &handle, guild_id, interaction, permissions).await,
        QUEUE => {
            let player = handle.lock().await;
            let reply = embedded_messages::queue(&player);
            Ok(CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .embeds(reply.embeds)
                    .ephemeral(true),
            ))
        }
        other => {
            error!("Unknown button ID: {}", other);
            Err(MusicError::Generic("Unknown button action.".into()))
        }
    }
}

/// Handler for alternating Play/Pause button
async fn handle_play_pause(
    bot: &PoolBot,
    handle: &PlayerHandle,
    interaction: &ComponentInteraction,
) -> MusicResult<CreateInteractionResponse> {
    let mut player = handle.lock().await;
    if player.is_idle() {
        return Err(MusicError::NothingPlaying);
    }

    let paused = !player.paused;
    MusicManager::set_paused(bot.node.as_ref(), &mut player, paused).await?;
    player.set_command_log(
        format!(
            "{} {} the music",
            interaction.user.name,
            if paused { "paused" } else { "resumed" }
        ),
        if paused { "⏸️" } else { "▶️" },
    );
    player.update = false;

    // Redraw the controller in place.
    let reply = embedded_messages::controller(&player);
    Ok(CreateInteractionResponse::UpdateMessage(
        CreateInteractionResponseMessage::new()
            .embeds(reply.embeds)
            .components(reply.components.unwrap_or_default()),
    ))
}

/// Handler for Next Track button
async fn handle_skip(
    bot: &PoolBot,
    handle: &PlayerHandle,
    interaction: &ComponentInteraction,
    permissions: Permissions,
) -> MusicResult<CreateInteractionResponse> {
    let mut player = handle.lock().await;
    MusicManager::check_dj(bot, &player, interaction.user.id, permissions)?;

    let Some(skipped) = player.current.as_ref().map(|track| track.title().to_string()) else {
        return Err(MusicError::NothingPlaying);
    };

    player.set_command_log(format!("{} skipped {}", interaction.user.name, skipped), "⏭️");
    let next = MusicManager::skip(bot.node.as_ref(), &mut player).await?;
    info!("Skipped '{}' in guild {}", skipped, player.guild_id);

    if next.is_none() {
        // No track start will follow, so redraw the idle controller now.
        player.update = false;
        let reply = embedded_messages::controller(&player);
        return Ok(CreateInteractionResponse::UpdateMessage(
            CreateInteractionResponseMessage::new()
                .embeds(reply.embeds)
                .components(reply.components.unwrap_or_default()),
        ));
    }
    Ok(CreateInteractionResponse::Acknowledge)
}

/// Handler for Stop button
async fn handle_stop(
    bot: &Arc<PoolBot>,
    handle: &PlayerHandle,
    guild_id: GuildId,
    interaction: &ComponentInteraction,
    permissions: Permissions,
) -> MusicResult<CreateInteractionResponse> {
    {
        let player = handle.lock().await;
        MusicManager::check_dj(bot, &player, interaction.user.id, permissions)?;
    }

    MusicManager::destroy_player(bot, guild_id).await;
    info!("{} stopped the player in guild {}", interaction.user.name, guild_id);

    let reply = embedded_messages::stopped();
    Ok(CreateInteractionResponse::Message(
        CreateInteractionResponseMessage::new().embeds(reply.embeds),
    ))
}
