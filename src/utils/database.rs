//! Provides the application's SQLite document store.
//! Every setting lives as a JSON document in a single `documents` table, keyed by
//! the model it belongs to (`guilds` or `users`) and the Discord id it describes.

use rusqlite::{Connection, OptionalExtension, params};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serenity::all::ChannelId;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// How many recently played tracks are remembered per user.
pub const RECENT_TRACKS_LIMIT: usize = 6;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid document: {0}")]
    Document(#[from] serde_json::Error),

    #[error("Database connection lock was poisoned")]
    Poisoned,
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// The document collections the bot stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Guilds,
    Users,
}

impl Model {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guilds => "guilds",
            Self::Users => "users",
        }
    }
}

/// Per-guild settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GuildSettings {
    /// Channel the player controller is always sent to.
    pub player_controller_channel: Option<ChannelId>,
    /// Song-request channel for static mode.
    pub song_request_channel: Option<ChannelId>,
    /// New players start in restrict mode.
    pub dj_restricted: bool,
    /// Voice status template applied to new players.
    pub stage_template: Option<String>,
    /// Guild-wide favorites, `name -> url`.
    pub favorites: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentTrack {
    pub title: String,
    pub url: String,
}

/// Per-user settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UserSettings {
    /// `name -> url`
    pub favorites: BTreeMap<String, String>,
    /// Linked profiles and playlists, `name -> url`
    pub integrations: BTreeMap<String, String>,
    /// Most recent first.
    pub recent_tracks: Vec<RecentTrack>,
}

impl UserSettings {
    /// Remembers a played track, most recent first, without duplicates.
    pub fn push_recent(&mut self, title: &str, url: &str) {
        self.recent_tracks.retain(|track| track.url != url);
        self.recent_tracks.insert(
            0,
            RecentTrack {
                title: title.to_string(),
                url: url.to_string(),
            },
        );
        self.recent_tracks.truncate(RECENT_TRACKS_LIMIT);
    }
}

/// A single SQLite connection shared by every command.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens (or creates) the database file and makes sure the tables exist.
    pub fn open(path: impl AsRef<Path>) -> DatabaseResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> DatabaseResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DatabaseResult<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                model TEXT NOT NULL,
                id INTEGER NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (model, id)
            )",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Reads the document stored for `id` in `model`.
    /// Returns the default document when nothing has been stored yet.
    pub fn get_data<T>(&self, id: u64, model: Model) -> DatabaseResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let conn = self.conn.lock().map_err(|_| DatabaseError::Poisoned)?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM documents WHERE model = ?1 AND id = ?2",
                params![model.as_str(), id as i64],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(data) => Ok(serde_json::from_str(&data)?),
            None => {
                debug!("No {} document for {}, using defaults", model.as_str(), id);
                Ok(T::default())
            }
        }
    }

    /// Inserts or replaces the document stored for `id` in `model`.
    pub fn update_data<T: Serialize>(&self, id: u64, model: Model, document: &T) -> DatabaseResult<()> {
        let data = serde_json::to_string(document)?;
        let conn = self.conn.lock().map_err(|_| DatabaseError::Poisoned)?;
        conn.execute(
            "INSERT OR REPLACE INTO documents (model, id, data) VALUES (?1, ?2, ?3)",
            params![model.as_str(), id as i64, data],
        )?;
        Ok(())
    }
}
