use super::*;
use crate::commands::music::utils::{
    embedded_messages, music_manager::resolve_play_context, play_args::parse_server_id,
};
use crate::utils::database::{GuildSettings, Model};
use poise::serenity_prelude::GuildChannel;
use tracing::info;

/// Join your voice channel (or the given one) without playing anything
#[poise::command(slash_command, prefix_command, aliases("con"), category = "Music")]
pub async fn connect(
    ctx: Context<'_>,
    #[description = "Voice channel to join"]
    #[channel_types("Voice", "Stage")]
    channel: Option<GuildChannel>,
    #[description = "Id of the server to join in"] server: Option<String>,
    #[description = "Choose which bot joins"] manual_bot_choice: Option<bool>,
) -> CommandResult {
    let server = server.as_deref().map(parse_server_id).transpose()?;
    let music = resolve_play_context(ctx, server, manual_bot_choice.unwrap_or(false)).await?;
    let bot = music.bot();

    let voice_channel = channel
        .map(|channel| channel.id)
        .or(music.author_voice)
        .ok_or(MusicError::NoVoice)?;

    if let Some(handle) = music.player() {
        let current = handle.lock().await.voice_channel;
        return Err(MusicError::Generic(format!("<@{}> is already connected to <#{}>.", bot.user_id, current)).into());
    }

    let handle = MusicManager::ensure_player(&music, voice_channel, ctx.channel_id()).await?;
    let settings: GuildSettings = ctx.data().database.get_data(music.guild_id.get(), Model::Guilds)?;
    handle.lock().await.apply_guild_settings(&settings, ctx.channel_id());

    info!("{} connected {} to {}", ctx.author().name, bot.name, voice_channel);
    ctx.send(embedded_messages::connected(voice_channel, bot.user_id))
        .await?;
    Ok(())
}
