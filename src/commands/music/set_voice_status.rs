use super::*;
use crate::commands::music::utils::{
    checks::check_voice_membership,
    embedded_messages,
    limits::Bucket,
    music_manager::refresh_controller_logged,
    stage_status::{VoiceStatusMode, has_placeholder},
};
use crate::utils::database::{GuildSettings, Model};
use chrono::Utc;
use poise::serenity_prelude as serenity;

/// Bot owners and members with manage-guild may change the voice status template.
async fn manage_guild_or_owner(ctx: Context<'_>) -> Result<bool, Error> {
    if ctx.framework().options().owners.contains(&ctx.author().id) {
        return Ok(true);
    }
    let Some(member) = ctx.author_member().await else {
        return Ok(false);
    };
    #[allow(deprecated)]
    let manage_guild = member
        .permissions(ctx.cache())
        .is_ok_and(|perms| perms.contains(serenity::Permissions::MANAGE_GUILD));
    Ok(manage_guild)
}

/// Keep the voice channel status (or stage topic) in sync with the current track
#[poise::command(
    slash_command,
    prefix_command,
    aliases("setvoicestatus", "stagevc", "announce", "vcstatus", "voicestatus"),
    check = "manage_guild_or_owner",
    category = "Music"
)]
pub async fn set_voice_status(
    ctx: Context<'_>,
    #[description = "Apply to this player, save as the server default, or turn off"]
    mode: Option<VoiceStatusMode>,
    #[description = "Template, e.g. {track.author} - {track.title}"]
    #[rest]
    template: Option<String>,
) -> CommandResult {
    let guild_id = ctx.guild_id().ok_or(MusicError::NotInGuild)?;
    let limits = &ctx.data().limits;
    limits.stage_cooldown.check(Bucket::Guild(guild_id))?;
    let _permit = limits.stage_concurrency.try_acquire(Bucket::Guild(guild_id))?;

    let mode = mode.unwrap_or(VoiceStatusMode::Player);
    let template = template
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    let player = resolve_player_context(ctx)
        .await
        .ok()
        .and_then(|music| music.player().map(|handle| (music, handle)));

    if mode == VoiceStatusMode::Off {
        store_default(ctx, guild_id, mode, None)?;
        if let Some((music, handle)) = player {
            {
                let mut player = handle.lock().await;
                check_voice_membership(music.author_voice, Some(player.voice_channel))?;
                player.set_command_log(
                    format!("{} disabled the automatic voice status", ctx.author().name),
                    "🔇",
                );
            }
            MusicManager::disable_voice_status(music.bot(), &handle).await?;
            refresh_controller_logged(music.bot(), &handle).await;
        }
        ctx.send(
            embedded_messages::success("🔇 Automatic voice status", "The automatic voice status is off.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let current = match &player {
        Some((_, handle)) => handle.lock().await.stage_title_template.clone(),
        None => None,
    };
    // Saving as the server default without a template keeps the player's one.
    let template = match (template, mode) {
        (Some(template), _) => template,
        (None, VoiceStatusMode::Server) if current.is_some() => current.unwrap_or_default(),
        (None, _) => {
            ctx.send(embedded_messages::voice_status_help(current.as_deref()))
                .await?;
            return Ok(());
        }
    };

    if !has_placeholder(&template) {
        return Err(MusicError::Generic(
            "The template needs at least one placeholder, like `{track.title}`.".into(),
        )
        .into());
    }

    if mode == VoiceStatusMode::Server {
        store_default(ctx, guild_id, mode, Some(&template))?;
    }

    let Some((music, handle)) = player else {
        if mode == VoiceStatusMode::Player {
            return Err(MusicError::NoPlayer.into());
        }
        ctx.send(
            embedded_messages::success(
                "📢 Automatic voice status",
                format!("New players will follow the template `{}`.", template),
            )
            .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    {
        let mut player = handle.lock().await;
        check_voice_membership(music.author_voice, Some(player.voice_channel))?;
        player.stage_title_template = Some(template.clone());
        player.stage_title_event = true;
        player.start_time = Utc::now();
        player.set_command_log(
            format!("{} enabled the automatic voice status", ctx.author().name),
            "📢",
        );
        player.update = true;
    }

    MusicManager::apply_voice_status(music.bot(), &handle).await?;
    refresh_controller_logged(music.bot(), &handle).await;

    let scope = match mode {
        VoiceStatusMode::Server => " Saved as the server default.",
        _ => "",
    };
    ctx.send(
        embedded_messages::success(
            "📢 Automatic voice status",
            format!("The status will follow the template `{}`.{}", template, scope),
        )
        .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Writes the guild's default template, skipping the write when nothing changes.
fn store_default(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    mode: VoiceStatusMode,
    template: Option<&str>,
) -> MusicResult<()> {
    let database = &ctx.data().database;
    let mut settings: GuildSettings = database.get_data(guild_id.get(), Model::Guilds)?;
    let stored = mode.stored_template(settings.stage_template.clone(), template);
    if stored != settings.stage_template {
        settings.stage_template = stored;
        database.update_data(guild_id.get(), Model::Guilds, &settings)?;
    }
    Ok(())
}
