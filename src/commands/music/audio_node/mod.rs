//! Client side of the external audio node (a Lavalink v4 server).
//! The node resolves queries into playable tracks and streams audio into the
//! voice connection that songbird negotiated on the gateway.

/// Track events forwarded from the node's websocket.
pub mod events;
/// [`AudioNode`] implementation backed by `lavalink-rs`.
pub mod lavalink;
/// Track types shared by the node, the player and saved queues.
pub mod track;

use serenity::all::GuildId;
use serenity::async_trait;
use thiserror::Error;

use track::NodeTrack;

/// Errors produced while talking to the audio node.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Audio node request failed: {0}")]
    Lavalink(#[from] lavalink_rs::error::LavalinkError),

    #[error("No audio node player exists for guild {0}")]
    NoPlayer(GuildId),

    #[error("Invalid audio node address: {0}")]
    Url(#[from] url::ParseError),

    #[error("Audio node configuration error: {0}")]
    Config(String),

    #[error("Track data could not be converted: {0}")]
    Track(#[from] serde_json::Error),
}

pub type NodeResult<T> = Result<T, NodeError>;

/// Outcome of resolving an identifier on the node.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult {
    Track(NodeTrack),
    Playlist { name: String, tracks: Vec<NodeTrack> },
    Search(Vec<NodeTrack>),
    Empty,
    /// The node could not load the identifier; carries its message.
    Error(String),
}

/// Operations the music commands need from an audio node.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioNode: Send + Sync {
    /// Resolves a URL or a `<prefix>search:<terms>` identifier into tracks.
    async fn load_tracks(&self, guild_id: GuildId, identifier: &str) -> NodeResult<LoadResult>;

    /// Creates the guild's node-side player on the voice server songbird negotiated.
    async fn connect(&self, guild_id: GuildId, connection: songbird::ConnectionInfo)
        -> NodeResult<()>;

    /// Replaces whatever is playing with `track`.
    async fn play(&self, guild_id: GuildId, track: &NodeTrack) -> NodeResult<()>;

    async fn stop(&self, guild_id: GuildId) -> NodeResult<()>;

    async fn set_paused(&self, guild_id: GuildId, paused: bool) -> NodeResult<()>;

    /// Switches the nightcore timescale on, or resets every filter.
    async fn set_nightcore(&self, guild_id: GuildId, enabled: bool) -> NodeResult<()>;

    /// Removes the guild's node-side player.
    async fn destroy_player(&self, guild_id: GuildId) -> NodeResult<()>;
}
