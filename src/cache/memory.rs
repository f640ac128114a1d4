// src/cache/memory.rs

// In-memory response cache with lazy and periodic expiry
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task;
use tokio::time::{self, Instant};
use tracing::debug;

use crate::error::{ClientError, Result};

/// Entry in the response cache
#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }
}

type Entries = Arc<RwLock<HashMap<String, CacheEntry>>>;

/// Maps a cache key to a previously computed completion text
#[derive(Debug, Default)]
pub struct ResponseCache {
    data: Entries,
    sweeper: Mutex<Option<task::JoinHandle<()>>>,
}

fn poisoned<T>(_: T) -> ClientError {
    ClientError::Cache("cache lock poisoned".to_string())
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under `key`, unless it is absent or expired
    pub fn lookup(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        {
            let data = self.data.read().map_err(poisoned)?;
            match data.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop read lock and remove it
        let mut data = self.data.write().map_err(poisoned)?;
        if data.get(key).is_some_and(|entry| entry.is_expired(now)) {
            data.remove(key);
        }
        Ok(None)
    }

    /// Store `value` under `key`; last write wins
    pub fn store(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut data = self.data.write().map_err(poisoned)?;
        data.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                stored_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }

    /// Remove every entry
    pub fn flush(&self) -> Result<()> {
        self.data.write().map_err(poisoned)?.clear();
        Ok(())
    }

    /// Number of entries currently held, expired ones included until swept
    pub fn len(&self) -> usize {
        self.data.read().map(|data| data.len()).unwrap_or(0)
    }

    /// Number of entries that have not expired yet
    pub fn live_len(&self) -> usize {
        let now = Instant::now();
        self.data
            .read()
            .map(|data| data.values().filter(|entry| !entry.is_expired(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop expired entries, returning how many were removed
    pub fn purge_expired(&self) -> Result<usize> {
        Self::cleanup_expired_entries(&self.data)
    }

    fn cleanup_expired_entries(data: &Entries) -> Result<usize> {
        let now = Instant::now();
        let mut data = data.write().map_err(poisoned)?;
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired(now));
        Ok(before - data.len())
    }

    /// Start the periodic sweep. Calling it again replaces the running sweeper.
    pub fn start_sweeper(&self, interval: Duration) {
        let data = Arc::clone(&self.data);

        let handle = task::spawn(async move {
            let mut timer = time::interval(interval);
            // The first tick completes immediately
            timer.tick().await;
            loop {
                timer.tick().await;
                match Self::cleanup_expired_entries(&data) {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, "Swept expired cache entries"),
                    Err(e) => debug!("Cache sweep skipped: {}", e),
                }
            }
        });

        let mut sweeper = self.sweeper.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = sweeper.replace(handle) {
            previous.abort();
        }
    }

    pub fn stop_sweeper(&self) {
        let mut sweeper = self.sweeper.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = sweeper.take() {
            handle.abort();
            debug!("Cache sweeper stopped");
        }
    }
}

impl Drop for ResponseCache {
    fn drop(&mut self) {
        self.stop_sweeper();
    }
}
