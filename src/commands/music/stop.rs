use super::*;
use crate::commands::music::utils::embedded_messages;
use tracing::info;

/// Stop playback, clear the queue and leave the voice channel
#[poise::command(
    slash_command,
    prefix_command,
    aliases("leave", "parar"),
    category = "Music"
)]
pub async fn stop(ctx: Context<'_>) -> CommandResult {
    let (music, _handle) = dj_player(ctx).await?;

    MusicManager::destroy_player(music.bot(), music.guild_id).await;
    info!("{} stopped the player in guild {}", ctx.author().name, music.guild_id);

    ctx.send(embedded_messages::stopped()).await?;
    Ok(())
}
