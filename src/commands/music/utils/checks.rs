//! Precondition checks shared by the music commands and the controller buttons.
//! Everything here works on plain values pulled out of the cache beforehand.

use serenity::all::{ChannelId, Permissions, UserId};

use super::music_manager::{MusicError, MusicResult};
use super::player::Player;

/// The member a DJ command is aimed at.
#[derive(Debug, Clone, Copy)]
pub struct DjCandidate {
    pub id: UserId,
    pub bot: bool,
    pub manage_channels: bool,
}

/// Rejects, in order: bots, the author themself, members who already control the
/// player through manage-channels, the player creator and members already listed.
pub fn validate_dj_addition(
    player: &Player,
    author: UserId,
    candidate: &DjCandidate,
) -> MusicResult<()> {
    if candidate.bot {
        return Err(MusicError::Generic("Bots can't be added as DJs.".into()));
    }
    if candidate.id == author {
        return Err(MusicError::Generic("You can't add yourself as a DJ.".into()));
    }
    if candidate.manage_channels {
        return Err(MusicError::Generic(format!(
            "<@{}> has the manage channels permission and is already a DJ.",
            candidate.id
        )));
    }
    if candidate.id == player.creator {
        return Err(MusicError::Generic(format!(
            "<@{}> created the player and is already a DJ.",
            candidate.id
        )));
    }
    if player.is_dj_listed(candidate.id) {
        return Err(MusicError::Generic(format!(
            "<@{}> is already in the DJ list.",
            candidate.id
        )));
    }
    Ok(())
}

pub fn validate_dj_removal(player: &Player, member: UserId) -> MusicResult<()> {
    if !player.is_dj_listed(member) {
        return Err(MusicError::Generic(format!(
            "<@{}> is not in the DJ list.",
            member
        )));
    }
    Ok(())
}

/// A member is a DJ when they can manage channels, are listed, created the player,
/// or are the only listener left (unless the player is in restrict mode).
pub fn is_dj(player: &Player, member: UserId, manage_channels: bool, sole_listener: bool) -> bool {
    manage_channels
        || player.is_dj_listed(member)
        || player.creator == member
        || (sole_listener && !player.restrict_mode)
}

pub fn require_dj(
    player: &Player,
    member: UserId,
    manage_channels: bool,
    sole_listener: bool,
) -> MusicResult<()> {
    if is_dj(player, member, manage_channels, sole_listener) {
        Ok(())
    } else {
        Err(MusicError::NotDj)
    }
}

/// The author must be in voice, and in the bot's channel when the bot is already connected.
pub fn check_voice_membership(
    author_voice: Option<ChannelId>,
    bot_voice: Option<ChannelId>,
) -> MusicResult<ChannelId> {
    let channel = author_voice.ok_or(MusicError::NoVoice)?;
    match bot_voice {
        Some(bot_channel) if bot_channel != channel => Err(MusicError::DiffVoiceChannel(bot_channel)),
        _ => Ok(channel),
    }
}

/// The bot needs connect and speak in the target channel.
pub fn check_voice_permissions(channel: ChannelId, permissions: Permissions) -> MusicResult<()> {
    let missing: Vec<&str> = [
        (Permissions::CONNECT, "connect"),
        (Permissions::SPEAK, "speak"),
    ]
    .into_iter()
    .filter(|(permission, _)| !permissions.contains(*permission))
    .map(|(_, name)| name)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(MusicError::MissingVoicePerms {
            channel,
            missing: missing.join(", "),
        })
    }
}

/// A full channel can only be joined with move-members.
pub fn check_channel_limit(
    channel: ChannelId,
    user_limit: Option<u32>,
    connected: usize,
    permissions: Permissions,
) -> MusicResult<()> {
    match user_limit {
        Some(limit) if limit > 0 && connected >= limit as usize && !permissions.contains(Permissions::MOVE_MEMBERS) => {
            Err(MusicError::Generic(format!(
                "<#{}> is full and I don't have the move members permission to join it.",
                channel
            )))
        }
        _ => Ok(()),
    }
}

pub fn check_queue_capacity(queued: usize, adding: usize, max_entries: usize) -> MusicResult<()> {
    if queued + adding > max_entries {
        return Err(MusicError::Generic(format!(
            "The queue is limited to {} tracks ({} already queued).",
            max_entries, queued
        )));
    }
    Ok(())
}

/// Turns a user supplied 1-based position into a queue index.
pub fn parse_position(position: i64) -> MusicResult<usize> {
    if position < 1 {
        return Err(MusicError::Generic(
            "The position must be 1 or higher.".into(),
        ));
    }
    usize::try_from(position - 1).map_err(|_| MusicError::Generic("Invalid position.".into()))
}
