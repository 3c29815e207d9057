//! Mock implementations for external dependencies
//! This module contains mock objects used for testing

use async_trait::async_trait;
use cadenza::commands::music::audio_node::track::NodeTrack;
use cadenza::commands::music::audio_node::{AudioNode, LoadResult, NodeError, NodeResult};
use mockall::mock;
use serenity::all::GuildId;

mock! {
    pub Node {}

    #[async_trait]
    impl AudioNode for Node {
        async fn load_tracks(&self, guild_id: GuildId, identifier: &str) -> NodeResult<LoadResult>;
        async fn connect(&self, guild_id: GuildId, connection: songbird::ConnectionInfo) -> NodeResult<()>;
        async fn play(&self, guild_id: GuildId, track: &NodeTrack) -> NodeResult<()>;
        async fn stop(&self, guild_id: GuildId) -> NodeResult<()>;
        async fn set_paused(&self, guild_id: GuildId, paused: bool) -> NodeResult<()>;
        async fn set_nightcore(&self, guild_id: GuildId, enabled: bool) -> NodeResult<()>;
        async fn destroy_player(&self, guild_id: GuildId) -> NodeResult<()>;
    }
}

/// A node that plays and stops whatever it is asked to.
pub fn permissive_node() -> MockNode {
    let mut node = MockNode::new();
    node.expect_play().returning(|_, _| Ok(()));
    node.expect_stop().returning(|_| Ok(()));
    node
}

/// A node whose player is gone, as after a lost voice connection.
pub fn refusing_node() -> MockNode {
    let mut node = MockNode::new();
    node.expect_play()
        .returning(|guild, _| Err(NodeError::NoPlayer(guild)));
    node
}
