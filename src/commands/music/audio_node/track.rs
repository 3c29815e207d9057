//! Defines the track types: `NodeTrack` as returned by the audio node, and `Track`,
//! a queued entry carrying who requested it and which playlist it came from.

use serde::{Deserialize, Serialize};
use serenity::all::UserId;
use std::time::Duration;

/// Track metadata reported by the node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub identifier: String,
    pub is_seekable: bool,
    pub author: String,
    /// Length in milliseconds.
    pub length: u64,
    pub is_stream: bool,
    #[serde(default)]
    pub position: u64,
    pub title: String,
    pub uri: Option<String>,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub isrc: Option<String>,
    pub source_name: String,
}

impl Default for TrackInfo {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            is_seekable: true,
            author: "Unknown Artist".to_string(),
            length: 0,
            is_stream: false,
            position: 0,
            title: "Unknown Track".to_string(),
            uri: None,
            artwork_url: None,
            isrc: None,
            source_name: "unknown".to_string(),
        }
    }
}

/// A track exactly as the node hands it out: an opaque encoded blob plus its info.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeTrack {
    pub encoded: String,
    pub info: TrackInfo,
}

/// Where a queued track was loaded from, when it came in as part of a playlist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaylistRef {
    pub name: String,
    pub url: String,
}

/// A track sitting in (or playing from) a guild player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub encoded: String,
    pub info: TrackInfo,
    pub requester: UserId,
    #[serde(default)]
    pub playlist: Option<PlaylistRef>,
}

impl Track {
    pub fn new(track: NodeTrack, requester: UserId, playlist: Option<PlaylistRef>) -> Self {
        Self {
            encoded: track.encoded,
            info: track.info,
            requester,
            playlist,
        }
    }

    /// The node-side view of this entry, for handing it back to the node.
    pub fn node_track(&self) -> NodeTrack {
        NodeTrack {
            encoded: self.encoded.clone(),
            info: self.info.clone(),
        }
    }

    pub fn title(&self) -> &str {
        &self.info.title
    }

    pub fn author(&self) -> &str {
        &self.info.author
    }

    /// The link to the track, or `#` when the source gave none.
    pub fn url(&self) -> &str {
        self.info.uri.as_deref().unwrap_or("#")
    }

    /// Streams report a meaningless length, so they have no duration.
    pub fn duration(&self) -> Option<Duration> {
        (!self.info.is_stream).then(|| Duration::from_millis(self.info.length))
    }

    pub fn source_emoji(&self) -> &'static str {
        match self.info.source_name.as_str() {
            "youtube" => "▶️",
            "soundcloud" => "☁️",
            "spotify" => "🟢",
            "deezer" => "🎧",
            "applemusic" => "🍎",
            "bandcamp" => "🏕️",
            "tidal" => "🌊",
            "http" | "local" => "📁",
            _ => "🎵",
        }
    }
}
