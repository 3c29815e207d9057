use super::*;
use crate::commands::music::utils::{embedded_messages, saved_queue::SavedQueue};

/// Save the current track and the queue to load them back later
#[poise::command(
    slash_command,
    prefix_command,
    aliases("savequeue", "sq"),
    category = "Music"
)]
pub async fn save_queue(ctx: Context<'_>) -> CommandResult {
    let (music, handle) = current_player(ctx).await?;

    let tracks = handle.lock().await.tracks();
    let queue = SavedQueue::new(tracks, music.guild_id).map_err(MusicError::from)?;
    ctx.data()
        .saved_queues
        .save(music.author_id, &queue)
        .await
        .map_err(MusicError::from)?;

    ctx.send(embedded_messages::queue_saved(queue.tracks.len()))
        .await?;
    Ok(())
}
