//! Per-user saved queues: zlib-compressed JSON files, one per user id.

use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};
use serenity::all::{GuildId, UserId};
use std::io::{Read, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

use crate::commands::music::audio_node::track::Track;

/// A queue shorter than this is not worth saving.
pub const MIN_SAVED_TRACKS: usize = 3;

#[derive(Error, Debug)]
pub enum SavedQueueError {
    #[error("You need at least {min} tracks in the player (current + queue) to save it", min = MIN_SAVED_TRACKS)]
    TooShort,

    #[error("Saved queue I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Saved queue is corrupted: {0}")]
    Format(#[from] serde_json::Error),
}

impl SavedQueueError {
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::TooShort)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedQueue {
    pub tracks: Vec<Track>,
    pub created_at: DateTime<Utc>,
    pub guild_id: GuildId,
}

impl SavedQueue {
    pub fn new(tracks: Vec<Track>, guild_id: GuildId) -> Result<Self, SavedQueueError> {
        if tracks.len() < MIN_SAVED_TRACKS {
            return Err(SavedQueueError::TooShort);
        }
        Ok(Self {
            tracks,
            created_at: Utc::now(),
            guild_id,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>, SavedQueueError> {
        let json = serde_json::to_vec(self)?;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        Ok(encoder.finish()?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SavedQueueError> {
        let mut json = Vec::new();
        ZlibDecoder::new(bytes).read_to_end(&mut json)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

/// Directory of saved queue files.
#[derive(Debug, Clone)]
pub struct SavedQueueStore {
    dir: PathBuf,
}

impl SavedQueueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, user_id: UserId) -> PathBuf {
        self.dir.join(format!("{}.bin", user_id))
    }

    pub async fn exists(&self, user_id: UserId) -> bool {
        tokio::fs::try_exists(self.path_for(user_id))
            .await
            .unwrap_or(false)
    }

    pub async fn save(&self, user_id: UserId, queue: &SavedQueue) -> Result<(), SavedQueueError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(user_id);
        tokio::fs::write(&path, queue.encode()?).await?;
        info!("Saved {} tracks for user {} to {}", queue.tracks.len(), user_id, path.display());
        Ok(())
    }

    pub async fn load(&self, user_id: UserId) -> Result<Option<SavedQueue>, SavedQueueError> {
        match tokio::fs::read(self.path_for(user_id)).await {
            Ok(bytes) => Ok(Some(SavedQueue::decode(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes the saved queue once it has been queued again. A missing file is fine.
    pub async fn discard(&self, user_id: UserId) -> Result<(), SavedQueueError> {
        match tokio::fs::remove_file(self.path_for(user_id)).await {
            Ok(()) => {
                debug!("Removed saved queue file of user {}", user_id);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
