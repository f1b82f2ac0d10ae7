//! Memoization of provider responses within one run.

use crate::provider::{Payload, Provider, ProviderKind, ProviderResult};
use dashmap::DashMap;
use geo::Coord;
use log::debug;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// Coordinates are rounded to this many decimal places (roughly 11 m)
/// when keying the cache.
const KEY_PRECISION: f64 = 1e4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// How long an entry stays valid.
    pub ttl: Duration,

    /// Maximum number of entries. Zero disables caching.
    pub capacity: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: ProviderKind,
    lat: i64,
    lon: i64,
}

impl CacheKey {
    pub fn new(kind: ProviderKind, coord: Coord) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let round = |deg: f64| (deg * KEY_PRECISION).round() as i64;
        Self {
            kind,
            lat: round(coord.y),
            lon: round(coord.x),
        }
    }
}

#[derive(Debug)]
struct Entry {
    inserted: Instant,
    payload: Payload,
}

/// Successful provider responses keyed by provider and rounded
/// coordinate. Safe for concurrent reads and inserts.
#[derive(Debug)]
pub struct ResponseCache {
    policy: CachePolicy,
    entries: DashMap<CacheKey, Entry>,
}

impl ResponseCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            entries: DashMap::new(),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a live entry, dropping it if expired.
    pub fn get(&self, key: &CacheKey) -> Option<Payload> {
        let ttl = self.policy.ttl;
        {
            let entry = self.entries.get(key)?;
            if entry.inserted.elapsed() < ttl {
                return Some(entry.payload.clone());
            }
        }
        self.entries
            .remove_if(key, |_, entry| entry.inserted.elapsed() >= ttl);
        None
    }

    pub fn insert(&self, key: CacheKey, payload: Payload) {
        if self.policy.capacity == 0 {
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.policy.capacity {
            self.evict();
        }
        self.entries.insert(
            key,
            Entry {
                inserted: Instant::now(),
                payload,
            },
        );
    }

    /// Drops expired entries, then the oldest one if still full.
    fn evict(&self) {
        let ttl = self.policy.ttl;
        self.entries.retain(|_, entry| entry.inserted.elapsed() < ttl);
        if self.entries.len() < self.policy.capacity {
            return;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.inserted)
            .map(|entry| *entry.key());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

/// Wraps a [`Provider`], consulting `cache` before delegating.
/// Failures pass through uncached.
pub struct CachingProvider<P> {
    inner: P,
    cache: Arc<ResponseCache>,
}

impl<P: Provider> CachingProvider<P> {
    pub fn new(inner: P, cache: Arc<ResponseCache>) -> Self {
        Self { inner, cache }
    }
}

impl<P: Provider> Provider for CachingProvider<P> {
    fn kind(&self) -> ProviderKind {
        self.inner.kind()
    }

    fn fetch(&self, coord: Coord) -> ProviderResult {
        let key = CacheKey::new(self.kind(), coord);
        if let Some(payload) = self.cache.get(&key) {
            debug!("cache hit; provider: {}, coord: {coord:?}", self.kind());
            return Ok(payload);
        }
        debug!("cache miss; provider: {}, coord: {coord:?}", self.kind());
        let result = self.inner.fetch(coord);
        if let Ok(payload) = &result {
            self.cache.insert(key, payload.clone());
        }
        result
    }
}
