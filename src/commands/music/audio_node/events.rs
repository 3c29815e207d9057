//! Player events reported by the node, reduced to what the players react to.

use serenity::all::GuildId;

/// An event for one guild's node-side player.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    TrackStart {
        guild_id: GuildId,
        title: String,
    },
    TrackEnd {
        guild_id: GuildId,
        title: String,
        reason: TrackEndReason,
    },
    TrackException {
        guild_id: GuildId,
        title: String,
        message: String,
    },
    TrackStuck {
        guild_id: GuildId,
        title: String,
        threshold_ms: u64,
    },
    WebSocketClosed {
        guild_id: GuildId,
        code: u16,
        reason: String,
        by_remote: bool,
    },
    /// Periodic playback position report.
    PlayerUpdate {
        guild_id: GuildId,
        position_ms: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEndReason {
    Finished,
    LoadFailed,
    Stopped,
    Replaced,
    Cleanup,
}

impl TrackEndReason {
    /// Stops and replacements are driven by us; only natural ends advance the queue.
    pub fn may_start_next(self) -> bool {
        matches!(self, Self::Finished | Self::LoadFailed)
    }
}

impl From<&lavalink_rs::model::events::TrackEndReason> for TrackEndReason {
    fn from(reason: &lavalink_rs::model::events::TrackEndReason) -> Self {
        use lavalink_rs::model::events::TrackEndReason as Lavalink;
        match reason {
            Lavalink::Finished => Self::Finished,
            Lavalink::LoadFailed => Self::LoadFailed,
            Lavalink::Stopped => Self::Stopped,
            Lavalink::Replaced => Self::Replaced,
            Lavalink::Cleanup => Self::Cleanup,
        }
    }
}

impl NodeEvent {
    pub fn guild_id(&self) -> GuildId {
        match self {
            Self::TrackStart { guild_id, .. }
            | Self::TrackEnd { guild_id, .. }
            | Self::TrackException { guild_id, .. }
            | Self::TrackStuck { guild_id, .. }
            | Self::WebSocketClosed { guild_id, .. }
            | Self::PlayerUpdate { guild_id, .. } => *guild_id,
        }
    }
}

/// Node payloads carry raw snowflakes; zero never names a guild.
pub fn guild_from_raw(raw: u64) -> Option<GuildId> {
    (raw != 0).then(|| GuildId::new(raw))
}
