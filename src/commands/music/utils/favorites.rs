//! The menu offered by `play` when it is used without a query.

use super::music_manager::{MusicError, MusicResult};
use super::selection::{MAX_OPTIONS, SelectOption};
use crate::utils::database::{GuildSettings, UserSettings};

/// What picking a menu entry loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteChoice {
    Url(String),
    SavedQueue,
}

/// Builds the menu entries from the user's and the guild's settings. Fails with
/// `EmptyFavIntegration` when there is nothing to offer.
pub fn favorite_options(
    user: &UserSettings,
    guild: &GuildSettings,
    has_saved_queue: bool,
) -> MusicResult<Vec<(SelectOption, FavoriteChoice)>> {
    let mut entries = Vec::new();

    if has_saved_queue {
        entries.push((
            SelectOption::new("💾 Saved queue", "0").description("Load the queue you saved earlier"),
            FavoriteChoice::SavedQueue,
        ));
    }

    let labelled = user
        .favorites
        .iter()
        .map(|(name, url)| ("⭐", "Favorite", name, url))
        .chain(user.integrations.iter().map(|(name, url)| ("🔗", "Integration", name, url)))
        .chain(guild.favorites.iter().map(|(name, url)| ("📌", "Server favorite", name, url)))
        .chain(
            user.recent_tracks
                .iter()
                .map(|track| ("🕘", "Recently played", &track.title, &track.url)),
        );

    for (emoji, kind, name, url) in labelled {
        entries.push((
            SelectOption::new(&format!("{} {}", emoji, name), entries.len().to_string()).description(kind),
            FavoriteChoice::Url(url.clone()),
        ));
    }

    if entries.is_empty() {
        return Err(MusicError::EmptyFavIntegration);
    }

    entries.truncate(MAX_OPTIONS);
    Ok(entries)
}
