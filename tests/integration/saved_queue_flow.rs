use crate::common::fixtures::{self, CREATOR, GUILD};
use crate::common::mocks::{permissive_node, refusing_node};
use crate::common::scratch_dir;
use assert_matches::assert_matches;
use cadenza::commands::music::utils::favorites::{FavoriteChoice, favorite_options};
use cadenza::commands::music::utils::music_manager::MusicManager;
use cadenza::commands::music::utils::play_args::PlayRequest;
use cadenza::commands::music::utils::saved_queue::{SavedQueue, SavedQueueError, SavedQueueStore};
use cadenza::utils::database::{Database, GuildSettings, Model, UserSettings};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn test_saved_queue_survives_until_it_is_queued() {
    let dir = scratch_dir("saved-queue-flow");
    let store = SavedQueueStore::new(&dir);
    let tracks = fixtures::tracks(&["a", "b", "c"]);

    store
        .save(CREATOR, &SavedQueue::new(tracks.clone(), GUILD).unwrap())
        .await
        .unwrap();
    assert!(store.exists(CREATOR).await);

    let entries = favorite_options(
        &UserSettings::default(),
        &GuildSettings::default(),
        store.exists(CREATOR).await,
    )
    .unwrap();
    assert_eq!(entries[0].1, FavoriteChoice::SavedQueue);

    let loaded = store.load(CREATOR).await.unwrap().unwrap();
    assert_eq!(loaded.tracks, tracks);

    // a failed enqueue must leave the saved queue in place
    let mut player = fixtures::player();
    let refused = MusicManager::enqueue_request(
        &refusing_node(),
        &mut player,
        loaded.tracks.clone(),
        &PlayRequest::default(),
        1000,
    )
    .await;
    assert!(refused.is_err());
    assert!(store.exists(CREATOR).await);

    MusicManager::enqueue_request(
        &permissive_node(),
        &mut player,
        loaded.tracks,
        &PlayRequest::default(),
        1000,
    )
    .await
    .unwrap();
    store.discard(CREATOR).await.unwrap();
    assert!(!store.exists(CREATOR).await);
    assert!(store.load(CREATOR).await.unwrap().is_none());

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[test]
fn test_short_queues_are_not_saved() {
    assert_matches!(
        SavedQueue::new(fixtures::tracks(&["a", "b"]), GUILD),
        Err(SavedQueueError::TooShort)
    );
}

#[test]
fn test_recent_tracks_survive_a_database_roundtrip() {
    let db = Database::open_in_memory().unwrap();
    let mut settings: UserSettings = db.get_data(CREATOR.get(), Model::Users).unwrap();
    settings.push_recent("First", "https://example.com/1");
    settings.push_recent("Second", "https://example.com/2");
    db.update_data(CREATOR.get(), Model::Users, &settings).unwrap();

    let stored: UserSettings = db.get_data(CREATOR.get(), Model::Users).unwrap();
    let entries = favorite_options(&stored, &GuildSettings::default(), false).unwrap();

    assert_eq!(
        entries.iter().map(|(_, choice)| choice.clone()).collect::<Vec<_>>(),
        vec![
            FavoriteChoice::Url("https://example.com/2".into()),
            FavoriteChoice::Url("https://example.com/1".into()),
        ]
    );
}
