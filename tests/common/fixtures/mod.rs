//! Sample tracks and players used across the test suite

use cadenza::commands::music::audio_node::track::{NodeTrack, Track, TrackInfo};
use cadenza::commands::music::utils::player::Player;
use fake::Fake;
use fake::faker::lorem::en::Words;
use fake::faker::name::en::Name;
use serenity::all::{ChannelId, GuildId, UserId};

pub const GUILD: GuildId = GuildId::new(100);
pub const BOT: UserId = UserId::new(200);
pub const TEXT_CHANNEL: ChannelId = ChannelId::new(300);
pub const VOICE_CHANNEL: ChannelId = ChannelId::new(400);
pub const CREATOR: UserId = UserId::new(500);

/// A node track with a random title and author.
pub fn node_track(encoded: &str) -> NodeTrack {
    let words: Vec<String> = Words(2..5).fake();
    NodeTrack {
        encoded: encoded.to_string(),
        info: TrackInfo {
            identifier: encoded.to_string(),
            author: Name().fake(),
            title: words.join(" "),
            length: (30_000..600_000).fake(),
            uri: Some(format!("https://example.com/{}", encoded)),
            source_name: "youtube".to_string(),
            ..Default::default()
        },
    }
}

pub fn tracks(encoded: &[&str]) -> Vec<Track> {
    encoded
        .iter()
        .map(|e| Track::new(node_track(e), CREATOR, None))
        .collect()
}

pub fn player() -> Player {
    Player::new(GUILD, BOT, TEXT_CHANNEL, VOICE_CHANNEL, CREATOR)
}
