use super::*;
use crate::commands::music::utils::embedded_messages;

/// Show the current track and its progress
#[poise::command(
    slash_command,
    prefix_command,
    aliases("np", "nowplaying"),
    category = "Music"
)]
pub async fn now_playing(ctx: Context<'_>) -> CommandResult {
    let (_music, handle) = current_player(ctx).await?;

    let reply = {
        let player = handle.lock().await;
        let track = player.current.as_ref().ok_or(MusicError::NothingPlaying)?;
        embedded_messages::now_playing(track, player.position())
    };

    ctx.send(reply).await?;
    Ok(())
}
