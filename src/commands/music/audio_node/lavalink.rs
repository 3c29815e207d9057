//! [`AudioNode`] on top of `lavalink-rs`. The library owns the websocket session
//! and reconnects; its event hooks are funnelled into one channel per bot.

use lavalink_rs::client::LavalinkClient;
use lavalink_rs::model::client::NodeDistributionStrategy;
use lavalink_rs::model::events::{
    Events, PlayerUpdate, Ready, TrackEnd, TrackException, TrackStart, TrackStuck,
    WebSocketClosed,
};
use lavalink_rs::model::player::{ConnectionInfo, Filters, Timescale};
use lavalink_rs::model::track::{TrackData, TrackLoadData};
use lavalink_rs::node::NodeBuilder;
use lavalink_rs::player_context::PlayerContext;
use serenity::all::{GuildId, UserId};
use serenity::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use url::Url;

use super::events::{NodeEvent, guild_from_raw};
use super::track::{NodeTrack, TrackInfo};
use super::{AudioNode, LoadResult, NodeError, NodeResult};

type EventSender = mpsc::UnboundedSender<NodeEvent>;

pub struct LavalinkNode {
    client: LavalinkClient,
}

impl LavalinkNode {
    /// Connects to the node as `user_id`. Events for this bot's players arrive on the
    /// returned receiver for as long as the client lives.
    pub async fn connect(
        address: &str,
        password: &str,
        user_id: UserId,
    ) -> NodeResult<(Self, mpsc::UnboundedReceiver<NodeEvent>)> {
        let (tx, rx) = mpsc::unbounded_channel::<NodeEvent>();
        let events = Events {
            ready: Some(ready),
            player_update: Some(player_update),
            track_start: Some(track_start),
            track_end: Some(track_end),
            track_exception: Some(track_exception),
            track_stuck: Some(track_stuck),
            websocket_closed: Some(websocket_closed),
            ..Default::default()
        };

        let client = LavalinkClient::new_with_data(
            events,
            vec![node_builder(address, password, user_id)?],
            NodeDistributionStrategy::round_robin(),
            Arc::new(tx),
        )
        .await;

        info!("Audio node client for bot {} created against {}", user_id, address);
        Ok((Self { client }, rx))
    }

    fn player(&self, guild_id: GuildId) -> NodeResult<PlayerContext> {
        self.client
            .get_player_context(lavalink_guild(guild_id))
            .ok_or(NodeError::NoPlayer(guild_id))
    }
}

fn lavalink_guild(guild_id: GuildId) -> lavalink_rs::model::GuildId {
    lavalink_rs::model::GuildId(guild_id.get())
}

/// Builds the node description from an `http(s)://host:port` address.
pub fn node_builder(address: &str, password: &str, user_id: UserId) -> NodeResult<NodeBuilder> {
    let url = Url::parse(address)?;
    let host = url
        .host_str()
        .ok_or_else(|| NodeError::Config(format!("{} has no host", address)))?;
    let port = url
        .port_or_known_default()
        .ok_or_else(|| NodeError::Config(format!("{} has no port", address)))?;

    Ok(NodeBuilder {
        hostname: format!("{}:{}", host, port),
        is_ssl: matches!(url.scheme(), "https" | "wss"),
        events: Events::default(),
        password: password.to_string(),
        user_id: lavalink_rs::model::UserId(user_id.get()),
        session_id: None,
    })
}

pub fn node_track(track: &TrackData) -> NodeTrack {
    let info = &track.info;
    NodeTrack {
        encoded: track.encoded.clone(),
        info: TrackInfo {
            identifier: info.identifier.clone(),
            is_seekable: info.is_seekable,
            author: info.author.clone(),
            length: info.length,
            is_stream: info.is_stream,
            position: info.position,
            title: info.title.clone(),
            uri: info.uri.clone(),
            artwork_url: info.artwork_url.clone(),
            isrc: info.isrc.clone(),
            source_name: info.source_name.clone(),
        },
    }
}

/// Both sides share the node's wire shape, so the queued copy converts back losslessly.
fn track_data(track: &NodeTrack) -> NodeResult<TrackData> {
    Ok(serde_json::from_value(serde_json::to_value(track)?)?)
}

pub fn load_result(data: Option<TrackLoadData>) -> LoadResult {
    match data {
        Some(TrackLoadData::Track(track)) => LoadResult::Track(node_track(&track)),
        Some(TrackLoadData::Playlist(playlist)) => LoadResult::Playlist {
            name: playlist.info.name,
            tracks: playlist.tracks.iter().map(node_track).collect(),
        },
        Some(TrackLoadData::Search(tracks)) => {
            LoadResult::Search(tracks.iter().map(node_track).collect())
        }
        Some(TrackLoadData::Error(error)) => LoadResult::Error(error.message),
        None => LoadResult::Empty,
    }
}

/// Sped up and pitched up playback, or no filters at all.
pub fn nightcore_filters(enabled: bool) -> Filters {
    if !enabled {
        return Filters::default();
    }
    Filters {
        timescale: Some(Timescale {
            speed: Some(1.1),
            pitch: Some(1.2),
            rate: Some(1.0),
        }),
        ..Default::default()
    }
}

#[async_trait]
impl AudioNode for LavalinkNode {
    async fn load_tracks(&self, guild_id: GuildId, identifier: &str) -> NodeResult<LoadResult> {
        debug!("Loading tracks for identifier: {}", identifier);
        let loaded = self
            .client
            .load_tracks(lavalink_guild(guild_id), identifier)
            .await?;
        Ok(load_result(loaded.data))
    }

    async fn connect(
        &self,
        guild_id: GuildId,
        connection: songbird::ConnectionInfo,
    ) -> NodeResult<()> {
        debug!("Creating node player for guild {}", guild_id);
        let connection = ConnectionInfo {
            endpoint: connection.endpoint,
            token: connection.token,
            session_id: connection.session_id,
        };
        self.client
            .create_player_context(lavalink_guild(guild_id), connection)
            .await?;
        Ok(())
    }

    async fn play(&self, guild_id: GuildId, track: &NodeTrack) -> NodeResult<()> {
        debug!("Playing {} in guild {}", track.info.title, guild_id);
        self.player(guild_id)?.play_now(&track_data(track)?).await?;
        Ok(())
    }

    async fn stop(&self, guild_id: GuildId) -> NodeResult<()> {
        self.player(guild_id)?.stop_now().await?;
        Ok(())
    }

    async fn set_paused(&self, guild_id: GuildId, paused: bool) -> NodeResult<()> {
        self.player(guild_id)?.set_pause(paused).await?;
        Ok(())
    }

    async fn set_nightcore(&self, guild_id: GuildId, enabled: bool) -> NodeResult<()> {
        self.player(guild_id)?
            .set_filters(nightcore_filters(enabled))
            .await?;
        Ok(())
    }

    async fn destroy_player(&self, guild_id: GuildId) -> NodeResult<()> {
        debug!("Destroying node player for guild {}", guild_id);
        self.client.delete_player(lavalink_guild(guild_id)).await?;
        Ok(())
    }
}

fn forward(client: &LavalinkClient, event: Option<NodeEvent>) {
    let Some(event) = event else {
        return;
    };
    match client.data::<EventSender>() {
        Ok(tx) => {
            if tx.send(event).is_err() {
                debug!("Node event receiver dropped");
            }
        }
        Err(e) => warn!("Audio node client carries no event channel: {}", e),
    }
}

#[lavalink_rs::hook]
async fn ready(_client: LavalinkClient, session_id: String, event: &Ready) {
    info!("Audio node session {} ready (resumed: {})", session_id, event.resumed);
}

#[lavalink_rs::hook]
async fn player_update(client: LavalinkClient, _session_id: String, event: &PlayerUpdate) {
    let event = guild_from_raw(event.guild_id.0).map(|guild_id| NodeEvent::PlayerUpdate {
        guild_id,
        position_ms: event.state.position,
    });
    forward(&client, event);
}

#[lavalink_rs::hook]
async fn track_start(client: LavalinkClient, _session_id: String, event: &TrackStart) {
    let event = guild_from_raw(event.guild_id.0).map(|guild_id| NodeEvent::TrackStart {
        guild_id,
        title: event.track.info.title.clone(),
    });
    forward(&client, event);
}

#[lavalink_rs::hook]
async fn track_end(client: LavalinkClient, _session_id: String, event: &TrackEnd) {
    let event = guild_from_raw(event.guild_id.0).map(|guild_id| NodeEvent::TrackEnd {
        guild_id,
        title: event.track.info.title.clone(),
        reason: (&event.reason).into(),
    });
    forward(&client, event);
}

#[lavalink_rs::hook]
async fn track_exception(client: LavalinkClient, _session_id: String, event: &TrackException) {
    let event = guild_from_raw(event.guild_id.0).map(|guild_id| NodeEvent::TrackException {
        guild_id,
        title: event.track.info.title.clone(),
        message: event.exception.message.clone(),
    });
    forward(&client, event);
}

#[lavalink_rs::hook]
async fn track_stuck(client: LavalinkClient, _session_id: String, event: &TrackStuck) {
    let event = guild_from_raw(event.guild_id.0).map(|guild_id| NodeEvent::TrackStuck {
        guild_id,
        title: event.track.info.title.clone(),
        threshold_ms: event.threshold_ms,
    });
    forward(&client, event);
}

#[lavalink_rs::hook]
async fn websocket_closed(client: LavalinkClient, _session_id: String, event: &WebSocketClosed) {
    let event = guild_from_raw(event.guild_id.0).map(|guild_id| NodeEvent::WebSocketClosed {
        guild_id,
        code: event.code,
        reason: event.reason.clone(),
        by_remote: event.by_remote,
    });
    forward(&client, event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn track_json(title: &str) -> serde_json::Value {
        json!({
            "encoded": format!("enc-{}", title),
            "info": {
                "identifier": title, "isSeekable": true, "author": "Artist", "length": 180000,
                "isStream": false, "position": 0, "title": title,
                "uri": format!("https://example.com/{}", title), "sourceName": "youtube"
            },
            "pluginInfo": {}
        })
    }

    #[test]
    fn test_node_builder_plain_address() {
        let builder = node_builder("http://127.0.0.1:2333", "pass", UserId::new(7)).unwrap();
        assert_eq!(builder.hostname, "127.0.0.1:2333");
        assert!(!builder.is_ssl);
        assert_eq!(builder.password, "pass");
    }

    #[test]
    fn test_node_builder_tls_uses_default_port() {
        let builder = node_builder("https://node.example.com", "pass", UserId::new(7)).unwrap();
        assert_eq!(builder.hostname, "node.example.com:443");
        assert!(builder.is_ssl);
    }

    #[test]
    fn test_node_builder_rejects_garbage() {
        assert_matches!(
            node_builder("not an address", "pass", UserId::new(7)),
            Err(NodeError::Url(_))
        );
    }

    #[test]
    fn test_search_results_are_converted() {
        let loaded: lavalink_rs::model::track::Track = serde_json::from_value(json!({
            "loadType": "search",
            "data": [track_json("first"), track_json("second")]
        }))
        .unwrap();

        match load_result(loaded.data) {
            LoadResult::Search(tracks) => {
                assert_eq!(tracks.len(), 2);
                assert_eq!(tracks[0].encoded, "enc-first");
                assert_eq!(tracks[1].info.title, "second");
            }
            other => panic!("Expected search result, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_data_is_empty() {
        assert_eq!(load_result(None), LoadResult::Empty);
    }

    #[test]
    fn test_queued_track_converts_back_to_node_data() {
        let data: TrackData = serde_json::from_value(track_json("song")).unwrap();
        let queued = node_track(&data);

        let back = track_data(&queued).unwrap();

        assert_eq!(back.encoded, "enc-song");
        assert_eq!(back.info.title, "song");
        assert_eq!(back.info.uri.as_deref(), Some("https://example.com/song"));
    }

    #[test]
    fn test_nightcore_filters() {
        let on = nightcore_filters(true).timescale.unwrap();
        assert_eq!((on.speed, on.pitch, on.rate), (Some(1.1), Some(1.2), Some(1.0)));
        assert!(nightcore_filters(false).timescale.is_none());
    }
}
