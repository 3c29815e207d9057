use super::*;
use crate::commands::music::utils::{
    embedded_messages, limits::Bucket, music_manager::refresh_controller_logged,
};

/// Toggle the nightcore effect (faster and higher pitched)
#[poise::command(slash_command, prefix_command, aliases("nc"), category = "Music")]
pub async fn nightcore(ctx: Context<'_>) -> CommandResult {
    let (music, handle) = dj_player(ctx).await?;
    ctx.data()
        .limits
        .music_settings
        .check(Bucket::Guild(music.guild_id))?;

    let enabled = {
        let mut player = handle.lock().await;
        let enabled = MusicManager::toggle_nightcore(music.bot().node.as_ref(), &mut player).await?;
        player.set_command_log(
            format!(
                "{} {} the nightcore effect",
                ctx.author().name,
                if enabled { "enabled" } else { "disabled" }
            ),
            "🇳",
        );
        enabled
    };

    refresh_controller_logged(music.bot(), &handle).await;
    ctx.send(embedded_messages::nightcore(enabled)).await?;
    Ok(())
}
