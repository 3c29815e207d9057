use super::*;
use crate::commands::music::utils::embedded_messages;

/// Show the last change made to the player
#[poise::command(slash_command, prefix_command, aliases("log"), category = "Music")]
pub async fn command_log(ctx: Context<'_>) -> CommandResult {
    let (_music, handle) = current_player(ctx).await?;
    let reply = embedded_messages::command_log(handle.lock().await.command_log.as_ref());
    ctx.send(reply).await?;
    Ok(())
}
