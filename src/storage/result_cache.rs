// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory cache for computed per-session results.
//!
//! Keyed by session key with a capacity-bounded LRU and a TTL. Every
//! entry remembers which user it was produced for and when, so the
//! sweeper can evict results that belong to another session, another
//! account, or a login that has since been superseded.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lru::LruCache;

/// Default maximum number of cached results.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Default time-to-live for cached results.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// A computed result held on behalf of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    /// User the result was computed for.
    pub owner_user_id: String,

    /// Wall-clock time the result was produced (session timeline, not
    /// cache insertion time).
    pub produced_at: DateTime<Utc>,

    pub value: serde_json::Value,
}

struct CacheEntry {
    result: CachedResult,
    cached_at: Instant,
}

/// Thread-safe LRU cache of per-session results with TTL expiry.
pub struct ResultCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Get a cached result if present and not expired.
    pub fn get(&self, session_key: &str) -> Option<CachedResult> {
        let mut cache = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match cache.get(session_key) {
            Some(entry) if entry.cached_at.elapsed() < self.ttl => Some(entry.result.clone()),
            Some(_) => {
                // Expired, remove it
                cache.pop(session_key);
                None
            }
            None => None,
        }
    }

    /// Store a result for a session, replacing any previous one.
    pub fn put(&self, session_key: &str, result: CachedResult) {
        let mut cache = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        cache.put(
            session_key.to_string(),
            CacheEntry {
                result,
                cached_at: Instant::now(),
            },
        );
    }

    /// Drop a session's cached result, if any.
    pub fn invalidate(&self, session_key: &str) {
        let mut cache = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        cache.pop(session_key);
    }

    /// Evict every result the active session is not entitled to see:
    /// entries under other session keys, entries produced for another
    /// user, and entries produced before the active login began. When
    /// the active session has no login time nothing can be attributed,
    /// so everything goes. Returns the number of evicted entries.
    pub fn evict_stale(
        &self,
        active_key: &str,
        active_user_id: &str,
        active_login: Option<DateTime<Utc>>,
    ) -> usize {
        let mut cache = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let doomed: Vec<String> = cache
            .iter()
            .filter(|(key, entry)| {
                key.as_str() != active_key
                    || entry.result.owner_user_id != active_user_id
                    || match active_login {
                        Some(login) => entry.result.produced_at < login,
                        None => true,
                    }
            })
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            cache.pop(key);
        }
        doomed.len()
    }

    pub fn len(&self) -> usize {
        let cache = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL)
    }
}
