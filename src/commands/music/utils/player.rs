//! Per-guild player state. The player is a plain state holder: the node does the
//! actual playback, this only remembers what is playing, what comes next and the
//! settings the commands toggle.

use chrono::{DateTime, Utc};
use serenity::all::{ChannelId, GuildId, MessageId, UserId};
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use crate::commands::music::audio_node::track::Track;
use super::stage_status::render_template;
use crate::utils::database::GuildSettings;

/// How many finished tracks are remembered.
pub const HISTORY_LIMIT: usize = 20;

/// The last settings change made on the player, shown by `command_log`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLog {
    pub text: String,
    pub emoji: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Player {
    pub guild_id: GuildId,
    /// The bot identity hosting this player.
    pub bot_id: UserId,
    pub text_channel: ChannelId,
    pub voice_channel: ChannelId,
    pub creator: UserId,
    pub dj_ids: HashSet<UserId>,
    pub current: Option<Track>,
    pub queue: VecDeque<Track>,
    pub history: VecDeque<Track>,
    pub volume: u16,
    pub paused: bool,
    pub nightcore: bool,
    pub keep_connected: bool,
    /// Song-request channel mode: the controller lives in a fixed channel.
    pub static_mode: bool,
    /// When set, only DJs (never a lone listener) may control the player.
    pub restrict_mode: bool,
    pub stage_title_event: bool,
    pub stage_title_template: Option<String>,
    pub start_time: DateTime<Utc>,
    pub command_log: Option<CommandLog>,
    pub controller: Option<(ChannelId, MessageId)>,
    position_ms: u64,
    position_at: Instant,
    /// The controller message is stale and should be redrawn.
    pub update: bool,
}

impl Player {
    pub fn new(
        guild_id: GuildId,
        bot_id: UserId,
        text_channel: ChannelId,
        voice_channel: ChannelId,
        creator: UserId,
    ) -> Self {
        Self {
            guild_id,
            bot_id,
            text_channel,
            voice_channel,
            creator,
            dj_ids: HashSet::new(),
            current: None,
            queue: VecDeque::new(),
            history: VecDeque::new(),
            volume: 100,
            paused: false,
            nightcore: false,
            keep_connected: false,
            static_mode: false,
            restrict_mode: false,
            stage_title_event: false,
            stage_title_template: None,
            start_time: Utc::now(),
            command_log: None,
            controller: None,
            position_ms: 0,
            position_at: Instant::now(),
            update: false,
        }
    }

    /// Inserts tracks at the given 0-based queue index (appends when `None` or past the end)
    /// and returns the 1-based queue position of the first inserted track.
    pub fn enqueue(&mut self, tracks: Vec<Track>, at: Option<usize>) -> usize {
        let index = at.map_or(self.queue.len(), |i| i.min(self.queue.len()));
        for (offset, track) in tracks.into_iter().enumerate() {
            self.queue.insert(index + offset, track);
        }
        self.update = true;
        index + 1
    }

    /// Moves the current track into history and takes the next one from the queue.
    pub fn advance(&mut self) -> Option<&Track> {
        if let Some(finished) = self.current.take() {
            self.history.push_front(finished);
            self.history.truncate(HISTORY_LIMIT);
        }
        self.current = self.queue.pop_front();
        self.paused = false;
        self.record_position(0);
        self.update = true;
        self.current.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }

    /// Current track plus queued tracks.
    pub fn total_tracks(&self) -> usize {
        usize::from(self.current.is_some()) + self.queue.len()
    }

    /// Current track followed by the queue, in play order.
    pub fn tracks(&self) -> Vec<Track> {
        self.current.iter().chain(self.queue.iter()).cloned().collect()
    }

    /// Takes over the guild's stored defaults. `command_channel` is where the player was requested from.
    pub fn apply_guild_settings(&mut self, settings: &GuildSettings, command_channel: ChannelId) {
        self.restrict_mode = settings.dj_restricted;
        if let Some(template) = &settings.stage_template {
            self.stage_title_template = Some(template.clone());
            self.stage_title_event = true;
        }
        if let Some(channel) = settings.player_controller_channel {
            self.text_channel = channel;
        }
        self.static_mode = settings.song_request_channel == Some(command_channel);
    }

    /// Status for the current track, `None` while the automatic status is off.
    pub fn voice_status(&self) -> Option<String> {
        let template = self.stage_title_template.as_deref().filter(|_| self.stage_title_event)?;
        Some(
            self.current
                .as_ref()
                .map(|track| render_template(template, track))
                .unwrap_or_default(),
        )
    }

    pub fn is_dj_listed(&self, user_id: UserId) -> bool {
        self.dj_ids.contains(&user_id)
    }

    pub fn set_command_log(&mut self, text: impl Into<String>, emoji: impl Into<String>) {
        self.command_log = Some(CommandLog {
            text: text.into(),
            emoji: emoji.into(),
            at: Utc::now(),
        });
        self.update = true;
    }

    /// Stores the position reported by the node.
    pub fn record_position(&mut self, position_ms: u64) {
        self.position_ms = position_ms;
        self.position_at = Instant::now();
    }

    /// Estimated playback position: the last reported position plus the time since,
    /// capped at the track length.
    pub fn position(&self) -> Duration {
        let reported = Duration::from_millis(self.position_ms);
        let estimate = if self.paused || self.current.is_none() {
            reported
        } else {
            reported + self.position_at.elapsed()
        };

        match self.current.as_ref().and_then(Track::duration) {
            Some(length) => estimate.min(length),
            None => estimate,
        }
    }
}
