//! Entry snapshots and read results carrying staleness metadata.
//!
//! Reads never hide how old their data is: [`CacheRead`] records whether it
//! came from the cache and when the value was last written.

use std::time::Duration;

use lockerroom_core::LockerRoomError;
use tokio::time::Instant;

use crate::key::QueryKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    /// Never fetched, or reset.
    Idle,
    /// A fetch is in flight.
    Loading,
    /// The last fetch failed. Any previous value is still readable.
    Error,
    Success,
}

/// A consistent view of one cache entry at a single instant.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub key: QueryKey,
    pub value: Option<T>,
    pub status: FetchStatus,
    pub error: Option<LockerRoomError>,
    pub updated_at: Option<Instant>,
    /// Instant after which the value is eligible for background refetch.
    pub stale_after: Option<Instant>,
    /// The visible value is an optimistic prediction awaiting confirmation.
    pub is_optimistic: bool,
    pub invalidated: bool,
}

impl<T> CacheEntry<T> {
    pub fn is_stale(&self) -> bool {
        if self.invalidated || self.value.is_none() {
            return true;
        }
        match self.stale_after {
            Some(at) => Instant::now() >= at,
            None => true,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == FetchStatus::Loading
    }
}

/// Result of a cache-aware read.
#[derive(Debug, Clone)]
pub struct CacheRead<T> {
    value: T,
    updated_at: Instant,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// Create a new cache read from a cache hit.
    pub fn from_cache(value: T, updated_at: Instant) -> Self {
        Self {
            value,
            updated_at,
            was_cache_hit: true,
        }
    }

    /// Create a new cache read from a network fetch.
    pub fn from_fetch(value: T) -> Self {
        Self {
            value,
            updated_at: Instant::now(),
            was_cache_hit: false,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Time since the value was written to the cache.
    pub fn staleness(&self) -> Duration {
        Instant::now().saturating_duration_since(self.updated_at)
    }

    pub fn updated_at(&self) -> Instant {
        self.updated_at
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            updated_at: self.updated_at,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

impl<T> AsRef<T> for CacheRead<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(stale_after: Option<Instant>) -> CacheEntry<u32> {
        CacheEntry {
            key: QueryKey::new("test"),
            value: Some(1),
            status: FetchStatus::Success,
            error: None,
            updated_at: Some(Instant::now()),
            stale_after,
            is_optimistic: false,
            invalidated: false,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_goes_stale_after_window() {
        let e = entry(Some(Instant::now() + Duration::from_secs(10)));
        assert!(!e.is_stale());
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(e.is_stale());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidated_or_empty_is_stale() {
        let mut e = entry(Some(Instant::now() + Duration::from_secs(60)));
        e.invalidated = true;
        assert!(e.is_stale());

        let mut e = entry(Some(Instant::now() + Duration::from_secs(60)));
        e.value = None;
        assert!(e.is_stale());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_read_staleness_and_map() {
        let read = CacheRead::from_cache(41u32, Instant::now());
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(read.staleness() >= Duration::from_secs(5));
        assert!(read.was_cache_hit());

        let mapped = read.map(|v| v + 1);
        assert_eq!(mapped.into_value(), 42);
        assert!(CacheRead::from_fetch(()).was_cache_miss());
    }
}
