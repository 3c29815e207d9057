use crate::common::fixtures::{self, GUILD};
use crate::common::mocks::{MockNode, permissive_node, refusing_node};
use crate::test_utils;
use assert_matches::assert_matches;
use cadenza::commands::music::audio_node::events::{NodeEvent, TrackEndReason};
use cadenza::commands::music::utils::event_handlers::{Followup, apply_event};
use cadenza::commands::music::utils::music_manager::{MusicError, MusicManager};
use cadenza::commands::music::utils::play_args::PlayRequest;
use mockall::Sequence;
use pretty_assertions::assert_eq;

fn track_end(encoded: &str, reason: TrackEndReason) -> NodeEvent {
    NodeEvent::TrackEnd {
        guild_id: GUILD,
        title: fixtures::node_track(encoded).info.title,
        reason,
    }
}

#[tokio::test]
async fn test_queue_plays_through_in_order() {
    test_utils::init();
    let mut node = MockNode::new();
    let mut seq = Sequence::new();
    for encoded in ["a", "b", "c"] {
        node.expect_play()
            .withf(move |guild, track| *guild == GUILD && track.encoded == encoded)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
    }

    let mut player = fixtures::player();
    let outcome = MusicManager::enqueue_request(
        &node,
        &mut player,
        fixtures::tracks(&["a", "b", "c"]),
        &PlayRequest::default(),
        1000,
    )
    .await
    .unwrap();
    assert!(outcome.playing_now);
    assert_eq!(player.queue.len(), 2);

    let followup = apply_event(&node, &mut player, &track_end("a", TrackEndReason::Finished))
        .await
        .unwrap();
    assert_matches!(followup, Followup::Nothing);
    assert_eq!(player.current.as_ref().map(|t| t.encoded.as_str()), Some("b"));

    apply_event(&node, &mut player, &track_end("b", TrackEndReason::LoadFailed))
        .await
        .unwrap();
    let followup = apply_event(&node, &mut player, &track_end("c", TrackEndReason::Finished))
        .await
        .unwrap();

    assert_matches!(followup, Followup::QueueEnded);
    assert!(player.is_idle());
    assert_eq!(player.history.len(), 3);
}

#[tokio::test]
async fn test_replaced_track_does_not_advance_twice() {
    let node = permissive_node();
    let mut player = fixtures::player();
    MusicManager::enqueue_request(
        &node,
        &mut player,
        fixtures::tracks(&["a", "b", "c"]),
        &PlayRequest::default(),
        1000,
    )
    .await
    .unwrap();

    MusicManager::skip(&node, &mut player).await.unwrap();
    let followup = apply_event(&node, &mut player, &track_end("a", TrackEndReason::Replaced))
        .await
        .unwrap();

    assert_matches!(followup, Followup::Nothing);
    assert_eq!(player.current.as_ref().map(|t| t.encoded.as_str()), Some("b"));
    assert_eq!(player.queue.len(), 1);
}

#[tokio::test]
async fn test_force_play_jumps_the_queue() {
    let node = permissive_node();
    let mut player = fixtures::player();
    let request = PlayRequest::default();
    MusicManager::enqueue_request(&node, &mut player, fixtures::tracks(&["a", "b"]), &request, 1000)
        .await
        .unwrap();

    let forced = PlayRequest {
        force_play: true,
        ..Default::default()
    };
    let outcome =
        MusicManager::enqueue_request(&node, &mut player, fixtures::tracks(&["x"]), &forced, 1000)
            .await
            .unwrap();

    assert!(outcome.playing_now);
    assert_eq!(player.current.as_ref().map(|t| t.encoded.as_str()), Some("x"));
    let queued: Vec<_> = player.queue.iter().map(|t| t.encoded.as_str()).collect();
    assert_eq!(queued, vec!["b"]);
}

#[tokio::test]
async fn test_full_queue_rejects_without_touching_the_node() {
    let node = MockNode::new();
    let mut player = fixtures::player();
    player.queue.extend(fixtures::tracks(&["a", "b"]));

    let result = MusicManager::enqueue_request(
        &node,
        &mut player,
        fixtures::tracks(&["c"]),
        &PlayRequest::default(),
        2,
    )
    .await;

    assert_matches!(result, Err(MusicError::Generic(_)));
    assert_eq!(player.queue.len(), 2);
}

#[tokio::test]
async fn test_lost_node_player_does_not_wedge_the_queue() {
    let mut player = fixtures::player();

    let refused = MusicManager::enqueue_request(
        &refusing_node(),
        &mut player,
        fixtures::tracks(&["a", "b"]),
        &PlayRequest::default(),
        1000,
    )
    .await;
    assert_matches!(refused, Err(MusicError::Node(_)));
    assert!(player.is_idle());
    assert!(player.queue.is_empty());

    let outcome = MusicManager::enqueue_request(
        &permissive_node(),
        &mut player,
        fixtures::tracks(&["c"]),
        &PlayRequest::default(),
        1000,
    )
    .await
    .unwrap();

    assert!(outcome.playing_now);
    assert_eq!(player.current.as_ref().map(|t| t.encoded.as_str()), Some("c"));
}
