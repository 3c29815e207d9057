//! Cooldowns and max-concurrency limiters for the music commands.

use dashmap::DashMap;
use serenity::all::{GuildId, UserId};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::music_manager::{MusicError, MusicResult};

/// What a limiter counts against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Member(GuildId, UserId),
    Guild(GuildId),
}

/// Sliding window cooldown: at most `rate` uses per `per` for each bucket.
pub struct Cooldown {
    rate: usize,
    per: Duration,
    hits: DashMap<Bucket, VecDeque<Instant>>,
}

impl Cooldown {
    pub fn new(rate: usize, per: Duration) -> Self {
        Self {
            rate,
            per,
            hits: DashMap::new(),
        }
    }

    /// Records a use at `now`, or returns how long until the bucket frees up.
    pub fn hit_at(&self, bucket: Bucket, now: Instant) -> Result<(), Duration> {
        // Buckets whose last use left the window hold nothing worth keeping.
        self.hits.retain(|_, window| {
            window
                .back()
                .is_some_and(|last| now.saturating_duration_since(*last) < self.per)
        });

        let mut window = self.hits.entry(bucket).or_default();
        while window
            .front()
            .is_some_and(|first| now.saturating_duration_since(*first) >= self.per)
        {
            window.pop_front();
        }

        if window.len() >= self.rate {
            let oldest = window.front().copied().unwrap_or(now);
            return Err(self.per.saturating_sub(now.saturating_duration_since(oldest)));
        }

        window.push_back(now);
        Ok(())
    }

    pub fn check(&self, bucket: Bucket) -> MusicResult<()> {
        self.hit_at(bucket, Instant::now())
            .map_err(|retry_after| MusicError::Cooldown(retry_after.as_secs().max(1)))
    }
}

/// Allows `limit` simultaneous holders per bucket and rejects the rest (no waiting).
pub struct MaxConcurrency {
    active: Arc<DashMap<Bucket, usize>>,
    limit: usize,
}

/// Releases its slot when dropped.
#[derive(Debug)]
pub struct ConcurrencyPermit {
    active: Arc<DashMap<Bucket, usize>>,
    bucket: Bucket,
}

impl MaxConcurrency {
    pub fn new(limit: usize) -> Self {
        Self {
            active: Arc::new(DashMap::new()),
            limit,
        }
    }

    pub fn try_acquire(&self, bucket: Bucket) -> MusicResult<ConcurrencyPermit> {
        let mut count = self.active.entry(bucket).or_insert(0);
        if *count >= self.limit {
            return Err(MusicError::MaxConcurrency);
        }
        *count += 1;

        Ok(ConcurrencyPermit {
            active: Arc::clone(&self.active),
            bucket,
        })
    }
}

impl Drop for ConcurrencyPermit {
    fn drop(&mut self) {
        self.active.remove_if_mut(&self.bucket, |_, count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
    }
}

/// Every limiter the music commands use, shared by all bot clients.
pub struct Limits {
    pub song_request: MaxConcurrency,
    pub player_interaction: MaxConcurrency,
    pub music_settings: Cooldown,
    pub stage_cooldown: Cooldown,
    pub stage_concurrency: MaxConcurrency,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            song_request: MaxConcurrency::new(1),
            player_interaction: MaxConcurrency::new(1),
            music_settings: Cooldown::new(3, Duration::from_secs(15)),
            stage_cooldown: Cooldown::new(2, Duration::from_secs(45)),
            stage_concurrency: MaxConcurrency::new(1),
        }
    }
}
