//! Subscriptions: typed, RAII handles on one cache entry.

use std::marker::PhantomData;

use lockerroom_core::{CacheError, LockerRoomResult};
use tokio::sync::watch;

use crate::client::QueryClient;
use crate::freshness::{CacheEntry, FetchStatus};
use crate::key::QueryKey;

/// A live interest in one key.
///
/// While at least one subscription exists for a key, the entry is exempt
/// from garbage collection and its polling (if any) keeps running. Dropping
/// the last one stops polling immediately.
pub struct Subscription<T> {
    client: QueryClient,
    key: QueryKey,
    id: u64,
    receiver: watch::Receiver<u64>,
    _value: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

impl<T> Subscription<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        client: QueryClient,
        key: QueryKey,
        id: u64,
        receiver: watch::Receiver<u64>,
    ) -> Self {
        Self {
            client,
            key,
            id,
            receiver,
            _value: PhantomData,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Snapshot of the entry right now.
    pub fn current(&self) -> LockerRoomResult<CacheEntry<T>> {
        match self.client.entry::<T>(&self.key)? {
            Some(entry) => Ok(entry),
            None => Ok(CacheEntry {
                key: self.key.clone(),
                value: None,
                status: FetchStatus::Idle,
                error: None,
                updated_at: None,
                stale_after: None,
                is_optimistic: false,
                invalidated: false,
            }),
        }
    }

    pub fn value(&self) -> LockerRoomResult<Option<T>> {
        self.client.get_query_data::<T>(&self.key)
    }

    /// Wait for the entry to change. Returns false once the entry has been
    /// removed from the cache and will never change again.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Wait until the entry holds a value. Fails with the fetch error if the
    /// entry settles into an error with nothing cached.
    pub async fn wait_for_value(&mut self) -> LockerRoomResult<T> {
        loop {
            let entry = self.current()?;
            if let Some(value) = entry.value {
                return Ok(value);
            }
            if entry.status == FetchStatus::Error {
                if let Some(err) = entry.error {
                    return Err(err);
                }
            }
            if !self.changed().await {
                return Err(CacheError::Removed {
                    key: self.key.to_string(),
                }
                .into());
            }
        }
    }

    pub async fn refetch(&self) -> LockerRoomResult<()> {
        self.client.refetch(&self.key).await
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.client.unsubscribe(&self.key, self.id);
    }
}
