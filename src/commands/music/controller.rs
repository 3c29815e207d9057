use super::*;
use crate::commands::music::utils::embedded_messages;

/// Send the player controller to this channel
#[poise::command(slash_command, prefix_command, aliases("ctl"), category = "Music")]
pub async fn controller(ctx: Context<'_>) -> CommandResult {
    let (music, handle) = current_player(ctx).await?;

    if handle.lock().await.static_mode {
        return Err(MusicError::Generic(
            "The controller stays in the song request channel while static mode is on.".into(),
        )
        .into());
    }

    MusicManager::resend_controller(music.bot(), &handle, ctx.channel_id()).await?;
    ctx.send(embedded_messages::success("🎛️ Controller", "The controller was moved here.").ephemeral(true))
        .await?;
    Ok(())
}
