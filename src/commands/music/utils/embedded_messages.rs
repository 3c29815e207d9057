use poise::{CreateReply, serenity_prelude as serenity};
use serenity::all::{ChannelId, CreateEmbed, CreateEmbedFooter, UserId};
use std::time::Duration;

use super::button_controls::{create_controller_buttons, create_idle_buttons};
use super::player::{CommandLog, Player};
use super::stage_status::PLACEHOLDERS;
use super::format_duration;
use crate::commands::music::audio_node::track::{PlaylistRef, Track};

pub const COLOR_OK: u32 = 0x00ff00;
pub const COLOR_ERROR: u32 = 0xff0000;

/// How many upcoming tracks the queue embed lists.
const QUEUE_PREVIEW: usize = 10;

/// Create a progress bar for the current track
pub fn format_progress_bar(position: Duration, total: Duration) -> String {
    const BAR_LENGTH: usize = 15;
    let progress = if total.as_secs() == 0 {
        0.0
    } else {
        (position.as_secs_f64() / total.as_secs_f64()).min(1.0)
    };

    let filled = (progress * BAR_LENGTH as f64).round() as usize;
    let empty = BAR_LENGTH - filled;

    format!("{}🔘{}", "▬".repeat(filled), "▬".repeat(empty))
}

fn track_link(track: &Track) -> String {
    format!("[{}]({})", track.title(), track.url())
}

fn duration_label(track: &Track) -> String {
    track
        .duration()
        .map(format_duration)
        .unwrap_or_else(|| "🔴 Live".to_string())
}

/// Red error embed, used by the framework error handler and the component handlers
pub fn error(message: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .title("❌ Error")
        .description(message)
        .color(COLOR_ERROR)
}

pub fn success(title: &str, description: impl Into<String>) -> CreateReply {
    CreateReply::default().embed(
        CreateEmbed::new()
            .title(title)
            .description(description)
            .color(COLOR_OK),
    )
}

/// The player controller: current track, a few settings and the control buttons
pub fn controller(player: &Player) -> CreateReply {
    let Some(track) = player.current.as_ref() else {
        return idle(player);
    };

    let mut embed = CreateEmbed::new()
        .title(if player.paused { "⏸️ Paused" } else { "🎵 Now Playing" })
        .description(format!("{} {}", track.source_emoji(), track_link(track)))
        .field("Author", track.author(), true)
        .field("Duration", format!("`{}`", duration_label(track)), true)
        .field("Requested by", format!("<@{}>", track.requester), true)
        .color(COLOR_OK);

    if let Some(artwork) = &track.info.artwork_url {
        embed = embed.thumbnail(artwork);
    }

    if let Some(playlist) = &track.playlist {
        embed = embed.field("Playlist", format!("[{}]({})", playlist.name, playlist.url), true);
    }

    let mut settings = Vec::new();
    if player.nightcore {
        settings.push("🇳 Nightcore");
    }
    if player.stage_title_event {
        settings.push("📢 Auto status");
    }
    if player.restrict_mode {
        settings.push("🔐 Restricted");
    }
    if !settings.is_empty() {
        embed = embed.field("Settings", settings.join(" • "), false);
    }

    if let Some(log) = &player.command_log {
        embed = embed.field("Last action", format!("{} {}", log.emoji, log.text), false);
    }

    embed = embed.footer(CreateEmbedFooter::new(format!(
        "{} in queue • Volume {}%",
        player.queue.len(),
        player.volume
    )));

    CreateReply::default()
        .embed(embed)
        .components(create_controller_buttons(player.paused, !player.queue.is_empty()))
}

/// Shown in place of the controller once the queue ran out
pub fn idle(player: &Player) -> CreateReply {
    let mut description = "The queue is empty. Use `/play` to add more music.".to_string();
    if let Some(last) = player.history.front() {
        description.push_str(&format!("\n\nLast played: {}", track_link(last)));
    }

    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("💤 Idle")
                .description(description)
                .color(COLOR_OK),
        )
        .components(create_idle_buttons())
}

/// Create an embed for the current track with its progress
pub fn now_playing(track: &Track, position: Duration) -> CreateReply {
    let mut description = format!("{} {}\n", track.source_emoji(), track_link(track));
    match track.duration() {
        Some(length) => description.push_str(&format!(
            "{} `{}/{}`",
            format_progress_bar(position, length),
            format_duration(position),
            format_duration(length)
        )),
        None => description.push_str("`🔴 Live`"),
    }

    let mut embed = CreateEmbed::new()
        .title("🎵 Now Playing")
        .description(description)
        .field("Author", track.author(), true)
        .field("Requested by", format!("<@{}>", track.requester), true)
        .color(COLOR_OK);

    if let Some(artwork) = &track.info.artwork_url {
        embed = embed.thumbnail(artwork);
    }

    CreateReply::default().embed(embed)
}

/// Create an embed for when tracks are added to the queue
pub fn added(
    tracks: &[Track],
    playlist: Option<&PlaylistRef>,
    position: usize,
    playing_now: bool,
    hint: Option<&str>,
) -> CreateReply {
    let mut embed = match (playlist, tracks) {
        (Some(playlist), _) => {
            let total: Duration = tracks.iter().filter_map(Track::duration).sum();
            CreateEmbed::new()
                .title("🎶 Playlist Added")
                .description(format!("[{}]({})", playlist.name, playlist.url))
                .field("Tracks", format!("`{}`", tracks.len()), true)
                .field("Total Length", format!("`{}`", format_duration(total)), true)
        }
        (None, [track, ..]) => CreateEmbed::new()
            .title(if playing_now { "🎵 Now Playing" } else { "🎵 Added to Queue" })
            .description(format!("{} {}", track.source_emoji(), track_link(track)))
            .field("Duration", format!("`{}`", duration_label(track)), true),
        (None, []) => CreateEmbed::new().title("🎵 Added to Queue"),
    };

    if !playing_now {
        embed = embed.field("Position", format!("`#{}`", position), true);
    }

    if let Some(hint) = hint {
        embed = embed.footer(CreateEmbedFooter::new(format!("💡 {}", hint)));
    }

    CreateReply::default().embed(embed.color(COLOR_OK))
}

/// Create an embed listing the upcoming tracks
pub fn queue(player: &Player) -> CreateReply {
    let mut description = String::new();

    match &player.current {
        Some(track) => description.push_str(&format!("**▶️ {}**\n\n", track_link(track))),
        None => description.push_str("**🔇 Nothing playing**\n\n"),
    }

    if player.queue.is_empty() {
        description.push_str("**📭 Queue is empty**");
    } else {
        for (index, track) in player.queue.iter().take(QUEUE_PREVIEW).enumerate() {
            description.push_str(&format!(
                "`{}.` {} `{}`\n",
                index + 1,
                track_link(track),
                duration_label(track)
            ));
        }
        if player.queue.len() > QUEUE_PREVIEW {
            description.push_str(&format!(
                "\n...and {} more",
                player.queue.len() - QUEUE_PREVIEW
            ));
        }
    }

    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title(format!("📋 Queue - {} tracks", player.queue.len()))
                .description(description)
                .color(COLOR_OK),
        )
        .ephemeral(true)
}

pub fn command_log(log: Option<&CommandLog>) -> CreateReply {
    let description = match log {
        Some(log) => format!("{} {}\n<t:{}:R>", log.emoji, log.text, log.at.timestamp()),
        None => "Nothing has been changed on this player yet.".to_string(),
    };
    success("📜 Command log", description)
}

pub fn dj_added(user: UserId) -> CreateReply {
    success("🎧 DJ added", format!("<@{}> can now control the player.", user))
}

pub fn dj_removed(user: UserId) -> CreateReply {
    success("🎧 DJ removed", format!("<@{}> was removed from the DJ list.", user))
}

pub fn nightcore(enabled: bool) -> CreateReply {
    success(
        "🇳 Nightcore",
        if enabled {
            "Nightcore effect enabled."
        } else {
            "Nightcore effect disabled."
        },
    )
}

/// Create an embed for when the bot stops playing music
pub fn stopped() -> CreateReply {
    success("⏹️ Stopped", "Playback stopped, queue cleared and voice channel left.")
}

pub fn queue_saved(count: usize) -> CreateReply {
    success(
        "💾 Queue saved",
        format!(
            "Saved {} tracks. Use `/play` without a query to load them back.",
            count
        ),
    )
    .ephemeral(true)
}

pub fn connected(channel: ChannelId, bot: UserId) -> CreateReply {
    success("🔊 Connected", format!("<@{}> joined <#{}>.", bot, channel))
}

/// Shows the current template and the placeholders that can be used in one
pub fn voice_status_help(current: Option<&str>) -> CreateReply {
    let placeholders = PLACEHOLDERS
        .iter()
        .map(|(placeholder, help)| format!("`{}` {}", placeholder, help))
        .collect::<Vec<_>>()
        .join("\n");

    let current = current
        .map(|template| format!("`{}`", template))
        .unwrap_or_else(|| "*not set*".to_string());

    CreateReply::default()
        .embed(
            CreateEmbed::new()
                .title("📢 Automatic voice status")
                .description(format!(
                    "Current template: {}\n\nSet one with `/set_voice_status template:<text>`, e.g. `{{track.author}} - {{track.title}}`. Pick `mode:Server default` to keep it for new players, or `mode:Off` to stop.\n\n**Placeholders**\n{}",
                    current, placeholders
                ))
                .color(COLOR_OK),
        )
        .ephemeral(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_progress_bar_bounds() {
        let total = Duration::from_secs(100);
        assert_eq!(format_progress_bar(Duration::ZERO, total), format!("🔘{}", "▬".repeat(15)));
        assert_eq!(format_progress_bar(total, total), format!("{}🔘", "▬".repeat(15)));
        // Positions past the end stay on the bar.
        assert_eq!(format_progress_bar(total * 2, total), format!("{}🔘", "▬".repeat(15)));
        assert_eq!(format_progress_bar(Duration::from_secs(5), Duration::ZERO), format!("🔘{}", "▬".repeat(15)));
    }
}
