use super::*;
use crate::commands::music::utils::{
    checks::{DjCandidate, validate_dj_addition, validate_dj_removal},
    embedded_messages,
    music_manager::refresh_controller_logged,
};
use poise::serenity_prelude as serenity;

/// Let a member control the player
#[poise::command(
    slash_command,
    prefix_command,
    aliases("adddj", "adj"),
    category = "Music"
)]
pub async fn add_dj(
    ctx: Context<'_>,
    #[description = "Member who will be able to control the player"] member: serenity::User,
) -> CommandResult {
    let (music, handle) = dj_player(ctx).await?;

    let candidate = DjCandidate {
        id: member.id,
        bot: member.bot,
        manage_channels: music
            .bot()
            .member_permissions(music.guild_id, member.id)
            .is_some_and(|perms| perms.contains(serenity::Permissions::MANAGE_CHANNELS)),
    };

    {
        let mut player = handle.lock().await;
        validate_dj_addition(&player, music.author_id, &candidate)?;
        player.dj_ids.insert(member.id);
        player.set_command_log(
            format!("{} added {} to the DJ list", ctx.author().name, member.name),
            "🎧",
        );
    }

    refresh_controller_logged(music.bot(), &handle).await;
    ctx.send(embedded_messages::dj_added(member.id)).await?;
    Ok(())
}

/// Take a member off the DJ list
#[poise::command(
    slash_command,
    prefix_command,
    aliases("removedj", "rdj"),
    category = "Music"
)]
pub async fn remove_dj(
    ctx: Context<'_>,
    #[description = "Member to remove from the DJ list"] member: serenity::User,
) -> CommandResult {
    let (music, handle) = dj_player(ctx).await?;

    {
        let mut player = handle.lock().await;
        validate_dj_removal(&player, member.id)?;
        player.dj_ids.remove(&member.id);
        player.set_command_log(
            format!("{} removed {} from the DJ list", ctx.author().name, member.name),
            "🎧",
        );
    }

    refresh_controller_logged(music.bot(), &handle).await;
    ctx.send(embedded_messages::dj_removed(member.id)).await?;
    Ok(())
}
