//! Drives the guild players from the node's events.

use serenity::all::{ChannelId, CreateMessage, GuildId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::embedded_messages;
use super::music_manager::{MusicManager, MusicResult, refresh_controller_logged};
use super::player::Player;
use super::pool::PoolBot;
use crate::commands::music::audio_node::AudioNode;
use crate::commands::music::audio_node::events::NodeEvent;

/// Voice websocket close codes meaning the bot is no longer in the channel.
const DISCONNECTED_CODES: [u16; 2] = [4006, 4014];

/// What has to happen outside the player lock once an event was applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Followup {
    Nothing,
    /// A new track started: redraw the controller and apply the voice status.
    TrackStarted,
    /// The queue ran out: show the idle controller.
    QueueEnded,
    /// Tell the text channel a track could not be played.
    Failed { channel: ChannelId, message: String },
    /// The voice connection is gone for good.
    Disconnected,
}

/// Applies one node event to the player it belongs to.
pub async fn apply_event(
    node: &dyn AudioNode,
    player: &mut Player,
    event: &NodeEvent,
) -> MusicResult<Followup> {
    match event {
        NodeEvent::TrackStart { title, .. } => {
            debug!("Track '{}' started in guild {}", title, player.guild_id);
            player.record_position(0);
            player.update = true;
            Ok(Followup::TrackStarted)
        }
        NodeEvent::TrackEnd { reason, .. } => {
            if !reason.may_start_next() {
                debug!("Track ended ({:?}) in guild {}, not advancing", reason, player.guild_id);
                return Ok(Followup::Nothing);
            }
            match MusicManager::start_next(node, player).await? {
                Some(_) => Ok(Followup::Nothing),
                None => Ok(Followup::QueueEnded),
            }
        }
        // The node follows up with a `loadFailed` end, which advances the queue.
        NodeEvent::TrackException { title, message, .. } => {
            warn!("Track '{}' failed in guild {}: {}", title, player.guild_id, message);
            Ok(Followup::Failed {
                channel: player.text_channel,
                message: format!("Could not play **{}**: {}", title, message),
            })
        }
        NodeEvent::TrackStuck { title, threshold_ms, .. } => {
            warn!(
                "Track '{}' stuck for {} ms in guild {}, skipping",
                title, threshold_ms, player.guild_id
            );
            match MusicManager::skip(node, player).await? {
                Some(_) => Ok(Followup::Nothing),
                None => Ok(Followup::QueueEnded),
            }
        }
        NodeEvent::WebSocketClosed {
            code,
            reason,
            by_remote,
            ..
        } => {
            warn!(
                "Voice websocket closed in guild {}: {} {} (by remote: {})",
                player.guild_id, code, reason, by_remote
            );
            if *by_remote && DISCONNECTED_CODES.contains(code) && !player.keep_connected {
                Ok(Followup::Disconnected)
            } else {
                Ok(Followup::Nothing)
            }
        }
        NodeEvent::PlayerUpdate { position_ms, .. } => {
            player.record_position(*position_ms);
            Ok(Followup::Nothing)
        }
    }
}

/// Consumes a bot's node events until its node client goes away.
pub async fn run_node_events(bot: Arc<PoolBot>, mut rx: mpsc::UnboundedReceiver<NodeEvent>) {
    info!("Listening to node events for {}", bot.name);

    while let Some(event) = rx.recv().await {
        handle_event(&bot, event.guild_id(), &event).await;
    }

    info!("Node event stream of {} closed", bot.name);
}

async fn handle_event(bot: &PoolBot, guild_id: GuildId, event: &NodeEvent) {
    let Some(handle) = bot.player(guild_id) else {
        debug!("Node event for guild {} without a player", guild_id);
        return;
    };

    let followup = {
        let mut player = handle.lock().await;
        apply_event(bot.node.as_ref(), &mut player, event).await
    };

    match followup {
        Ok(Followup::Nothing) => {}
        Ok(Followup::TrackStarted) => {
            refresh_controller_logged(bot, &handle).await;
            if let Err(e) = MusicManager::apply_voice_status(bot, &handle).await {
                warn!("Failed to update voice status in guild {}: {}", guild_id, e);
            }
        }
        Ok(Followup::QueueEnded) => {
            info!("Queue finished in guild {}", guild_id);
            refresh_controller_logged(bot, &handle).await;
        }
        Ok(Followup::Failed { channel, message }) => {
            let embed = embedded_messages::error(message);
            if let Err(e) = channel
                .send_message(&bot.http, CreateMessage::new().embed(embed))
                .await
            {
                warn!("Failed to report track error in {}: {}", channel, e);
            }
        }
        Ok(Followup::Disconnected) => MusicManager::destroy_player(bot, guild_id).await,
        Err(e) => error!("Error handling node event in guild {}: {}", guild_id, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::music::audio_node::events::TrackEndReason;
    use crate::commands::music::audio_node::track::{NodeTrack, TrackInfo};
    use crate::commands::music::audio_node::track::Track;
    use crate::commands::music::audio_node::{MockAudioNode, NodeError};
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use serenity::all::UserId;

    fn node_track(title: &str) -> NodeTrack {
        NodeTrack {
            encoded: format!("enc-{}", title),
            info: TrackInfo {
                title: title.to_string(),
                ..Default::default()
            },
        }
    }

    #[fixture]
    fn player() -> Player {
        let mut player = Player::new(
            GuildId::new(1),
            UserId::new(2),
            ChannelId::new(3),
            ChannelId::new(4),
            UserId::new(5),
        );
        player.current = Some(Track::new(node_track("playing"), UserId::new(5), None));
        player
    }

    fn end(reason: TrackEndReason) -> NodeEvent {
        NodeEvent::TrackEnd {
            guild_id: GuildId::new(1),
            title: "playing".into(),
            reason,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn test_finished_track_starts_next(mut player: Player) {
        player.enqueue(vec![Track::new(node_track("next"), UserId::new(5), None)], None);
        let mut node = MockAudioNode::new();
        node.expect_play()
            .withf(|_, track| track.encoded == "enc-next")
            .times(1)
            .returning(|_, _| Ok(()));

        let followup = apply_event(&node, &mut player, &end(TrackEndReason::Finished))
            .await
            .unwrap();

        assert_eq!(followup, Followup::Nothing);
        assert_eq!(player.current.as_ref().map(Track::title), Some("next"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_refused_next_track_stays_queued(mut player: Player) {
        player.enqueue(vec![Track::new(node_track("next"), UserId::new(5), None)], None);
        let mut node = MockAudioNode::new();
        node.expect_play()
            .times(1)
            .returning(|guild, _| Err(NodeError::NoPlayer(guild)));

        let result = apply_event(&node, &mut player, &end(TrackEndReason::Finished)).await;

        assert!(result.is_err());
        assert_eq!(player.current.as_ref().map(Track::title), Some("playing"));
        assert_eq!(player.queue.front().map(Track::title), Some("next"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_last_track_ends_queue(mut player: Player) {
        let mut node = MockAudioNode::new();
        node.expect_play().never();

        let followup = apply_event(&node, &mut player, &end(TrackEndReason::LoadFailed))
            .await
            .unwrap();

        assert_eq!(followup, Followup::QueueEnded);
        assert!(player.is_idle());
    }

    #[rstest]
    #[case(TrackEndReason::Replaced)]
    #[case(TrackEndReason::Stopped)]
    #[case(TrackEndReason::Cleanup)]
    #[tokio::test]
    async fn test_driven_ends_do_not_advance(mut player: Player, #[case] reason: TrackEndReason) {
        let mut node = MockAudioNode::new();
        node.expect_play().never();
        node.expect_stop().never();

        let followup = apply_event(&node, &mut player, &end(reason)).await.unwrap();

        assert_eq!(followup, Followup::Nothing);
        assert_eq!(player.current.as_ref().map(Track::title), Some("playing"));
    }

    #[rstest]
    #[tokio::test]
    async fn test_exception_reports_without_advancing(mut player: Player) {
        let node = MockAudioNode::new();
        let event = NodeEvent::TrackException {
            guild_id: GuildId::new(1),
            title: "playing".into(),
            message: "This video is unavailable".into(),
        };

        let followup = apply_event(&node, &mut player, &event).await.unwrap();

        assert_matches!(followup, Followup::Failed { channel, message }
            if channel == ChannelId::new(3) && message.contains("unavailable"));
        assert!(!player.is_idle());
    }

    #[rstest]
    #[tokio::test]
    async fn test_stuck_track_is_skipped(mut player: Player) {
        let mut node = MockAudioNode::new();
        node.expect_stop().times(1).returning(|_| Ok(()));
        let event = NodeEvent::TrackStuck {
            guild_id: GuildId::new(1),
            title: "playing".into(),
            threshold_ms: 10_000,
        };

        let followup = apply_event(&node, &mut player, &event).await.unwrap();

        assert_eq!(followup, Followup::QueueEnded);
        assert_eq!(player.history.front().map(Track::title), Some("playing"));
    }

    #[rstest]
    #[case(4014, true, false, Followup::Disconnected)]
    #[case(4014, true, true, Followup::Nothing)]
    #[case(4014, false, false, Followup::Nothing)]
    #[case(1000, true, false, Followup::Nothing)]
    #[tokio::test]
    async fn test_websocket_closed(
        mut player: Player,
        #[case] code: u16,
        #[case] by_remote: bool,
        #[case] keep_connected: bool,
        #[case] expected: Followup,
    ) {
        player.keep_connected = keep_connected;
        let node = MockAudioNode::new();
        let event = NodeEvent::WebSocketClosed {
            guild_id: GuildId::new(1),
            code,
            reason: "Disconnected.".into(),
            by_remote,
        };

        assert_eq!(apply_event(&node, &mut player, &event).await.unwrap(), expected);
    }

    #[rstest]
    #[tokio::test]
    async fn test_position_reports_are_recorded(mut player: Player) {
        if let Some(current) = player.current.as_mut() {
            current.info.length = 180_000;
        }
        player.paused = true;
        let node = MockAudioNode::new();
        let event = NodeEvent::PlayerUpdate {
            guild_id: GuildId::new(1),
            position_ms: 42_000,
        };

        let followup = apply_event(&node, &mut player, &event).await.unwrap();

        assert_eq!(followup, Followup::Nothing);
        assert_eq!(player.position(), std::time::Duration::from_secs(42));
    }
}
