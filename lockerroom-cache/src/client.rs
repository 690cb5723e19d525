//! The query client: one shared, keyed store of server-derived data.
//!
//! All state lives behind a single mutex that is never held across an
//! await. Network work happens outside the lock; results are applied
//! afterwards only if nothing newer landed in the meantime.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use lockerroom_core::{CacheError, LockerRoomResult};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::{CacheConfig, QueryOptions};
use crate::entry::{downcast, CachedValue, EntrySlot, Fetcher, Poller};
use crate::freshness::{CacheEntry, CacheRead, FetchStatus};
use crate::key::QueryKey;
use crate::stats::{CacheStats, Counters};
use crate::subscription::Subscription;

/// Smallest period accepted for polling and GC sweeps.
const MIN_TICK: Duration = Duration::from_millis(1);

pub(crate) struct Inner {
    entries: Mutex<HashMap<QueryKey, EntrySlot>>,
    config: CacheConfig,
    generation: AtomicU64,
    next_subscription: AtomicU64,
    counters: Counters,
}

/// Shared handle to the cache. Cloning is cheap; all clones see the same
/// entries.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("config", &self.inner.config)
            .field("entries", &self.lock().len())
            .finish()
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

/// Background garbage collector. Dropping the handle stops it.
#[derive(Debug)]
pub struct GcHandle {
    task: JoinHandle<()>,
}

impl Drop for GcHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Clears the in-flight marker if a fetch is cancelled before it resolves.
struct FetchGuard<'a> {
    client: &'a QueryClient,
    key: &'a QueryKey,
    generation: u64,
    armed: bool,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut entries = self.client.lock();
        if let Some(slot) = entries.get_mut(self.key) {
            if slot.fetching == Some(self.generation) {
                slot.fetching = None;
                slot.settle_status();
                slot.notify();
            }
        }
    }
}

fn erase<T, F, Fut>(fetcher: F) -> Fetcher
where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LockerRoomResult<T>> + Send + 'static,
{
    Arc::new(move || {
        let fut = fetcher();
        Box::pin(async move { fut.await.map(|value| Arc::new(value) as CachedValue) })
    })
}

impl QueryClient {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                config,
                generation: AtomicU64::new(0),
                next_subscription: AtomicU64::new(1),
                counters: Counters::default(),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, EntrySlot>> {
        // A panic while holding the lock leaves every slot in a consistent
        // state between statements, so the data is still usable.
        self.inner
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Next value of the client-wide write counter.
    pub(crate) fn next_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn counters(&self) -> &Counters {
        &self.inner.counters
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_weak(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn new_slot(&self, key: &QueryKey) -> EntrySlot {
        EntrySlot::new(key.clone(), self.inner.config.query_options())
    }

    // ------------------------------------------------------------------------
    // Direct reads and writes
    // ------------------------------------------------------------------------

    /// Current value for `key`, without fetching.
    pub fn get_query_data<T>(&self, key: &QueryKey) -> LockerRoomResult<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        match self.lock().get(key) {
            Some(slot) => slot.typed::<T>(),
            None => Ok(None),
        }
    }

    /// Full view of an entry, including status and freshness.
    pub fn entry<T>(&self, key: &QueryKey) -> LockerRoomResult<Option<CacheEntry<T>>>
    where
        T: Clone + Send + Sync + 'static,
    {
        match self.lock().get(key) {
            Some(slot) => slot.view::<T>().map(Some),
            None => Ok(None),
        }
    }

    /// Write an authoritative value. Supersedes every fetch and mutation
    /// started before this call.
    pub fn set_query_data<T>(&self, key: QueryKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        let generation = self.next_generation();
        let mut entries = self.lock();
        let slot = entries
            .entry(key.clone())
            .or_insert_with(|| self.new_slot(&key));
        slot.write(generation, Arc::new(value));
        slot.settle_status();
        slot.notify();
    }

    /// Rewrite the cached value in place. Returns false when nothing is
    /// cached for `key`.
    pub fn update_query_data<T, F>(&self, key: &QueryKey, update: F) -> LockerRoomResult<bool>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(&T) -> T,
    {
        let generation = self.next_generation();
        let mut entries = self.lock();
        let Some(slot) = entries.get_mut(key) else {
            return Ok(false);
        };
        let Some(current) = slot.typed::<T>()? else {
            return Ok(false);
        };
        slot.write(generation, Arc::new(update(&current)));
        slot.settle_status();
        slot.notify();
        Ok(true)
    }

    /// Drop an entry. Entries that still have subscribers are reset to
    /// empty and refetched instead.
    pub fn remove_query(&self, key: &QueryKey) -> bool {
        let generation = self.next_generation();
        let refetch = {
            let mut entries = self.lock();
            let Some(slot) = entries.get_mut(key) else {
                return false;
            };
            if slot.is_active() {
                slot.reset(generation);
                slot.notify();
                slot.fetching.is_none()
            } else {
                entries.remove(key);
                false
            }
        };
        if refetch {
            self.spawn_refetch(key.clone());
        }
        true
    }

    /// Forget everything, e.g. on logout. Polling stops and subscribers
    /// observe a closed entry.
    pub fn clear(&self) {
        let removed = {
            let mut entries = self.lock();
            let removed = entries.len();
            entries.clear();
            removed
        };
        tracing::info!(removed, "Query cache cleared");
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<_> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|slot| slot.fetching.is_some())
    }

    /// True while any mutation touching `key` is unresolved.
    pub fn has_pending_mutation(&self, key: &QueryKey) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|slot| !slot.pending.is_empty())
    }

    pub fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.lock()
            .get(key)
            .map_or(0, |slot| slot.subscribers.len())
    }

    /// Whether a polling task is currently running for `key`.
    pub fn is_polling(&self, key: &QueryKey) -> bool {
        self.lock()
            .get(key)
            .is_some_and(|slot| slot.poller.is_some())
    }

    pub fn stats(&self) -> CacheStats {
        let entry_count = self.lock().len() as u64;
        self.inner.counters.snapshot(entry_count)
    }

    // ------------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------------

    /// Read `key`, going to the network only if the cached value is stale.
    ///
    /// The fetcher is remembered so later refetches (polling, focus,
    /// invalidation) can reuse it.
    pub async fn fetch_query<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> LockerRoomResult<CacheRead<T>>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LockerRoomResult<T>> + Send + 'static,
    {
        {
            let mut entries = self.lock();
            let slot = entries
                .entry(key.clone())
                .or_insert_with(|| self.new_slot(&key));
            slot.fetcher = Some(erase(fetcher));
            slot.options = options;
            slot.touch();
            if !slot.is_stale() {
                if let (Some(value), Some(at)) = (slot.typed::<T>()?, slot.updated_at) {
                    Counters::bump(&self.inner.counters.hits);
                    return Ok(CacheRead::from_cache(value, at));
                }
            }
        }
        Counters::bump(&self.inner.counters.misses);

        let (value, applied) = self.run_fetch(&key).await?;
        let fetched = downcast::<T>(&key, &value)?;
        if applied {
            return Ok(CacheRead::from_fetch(fetched));
        }

        // A newer write won the race; report what the cache holds now.
        let entries = self.lock();
        match entries.get(&key) {
            Some(slot) => match (slot.typed::<T>()?, slot.updated_at) {
                (Some(current), Some(at)) => Ok(CacheRead::from_cache(current, at)),
                _ => Ok(CacheRead::from_fetch(fetched)),
            },
            None => Ok(CacheRead::from_fetch(fetched)),
        }
    }

    /// Refetch `key` with its remembered fetcher, regardless of staleness.
    pub async fn refetch(&self, key: &QueryKey) -> LockerRoomResult<()> {
        self.run_fetch(key).await.map(|_| ())
    }

    /// Returns the fetched value and whether it was written to the cache.
    async fn run_fetch(&self, key: &QueryKey) -> LockerRoomResult<(CachedValue, bool)> {
        let (fetcher, retry, generation) = {
            let mut entries = self.lock();
            let slot = entries.get_mut(key).ok_or_else(|| CacheError::NoFetcher {
                key: key.to_string(),
            })?;
            let fetcher = slot.fetcher.clone().ok_or_else(|| CacheError::NoFetcher {
                key: key.to_string(),
            })?;
            let generation = self.next_generation();
            slot.fetching = Some(generation);
            slot.status = FetchStatus::Loading;
            slot.notify();
            (fetcher, slot.options.retry.clone(), generation)
        };

        let mut guard = FetchGuard {
            client: self,
            key,
            generation,
            armed: true,
        };
        let label = key.to_string();
        let result = retry.run(&label, || fetcher()).await;
        guard.armed = false;

        let mut entries = self.lock();
        let Some(slot) = entries.get_mut(key) else {
            return result.map(|value| (value, false));
        };
        if slot.fetching == Some(generation) {
            slot.fetching = None;
        }
        let accepted = slot.accepts_fetch(generation);
        let outcome = match result {
            Ok(value) if accepted => {
                slot.write(generation, value.clone());
                Ok((value, true))
            }
            Ok(value) => {
                Counters::bump(&self.inner.counters.discarded_responses);
                tracing::debug!(
                    key = %key,
                    generation,
                    committed = slot.committed,
                    pending_mutations = slot.pending.len(),
                    "Discarding superseded fetch response"
                );
                Ok((value, false))
            }
            Err(err) => {
                if accepted {
                    slot.error = Some(err.clone());
                    slot.status = FetchStatus::Error;
                }
                if err.is_expected() {
                    tracing::debug!(key = %key, error = %err, "Query returned no data");
                } else {
                    tracing::warn!(key = %key, error = %err, "Query fetch failed");
                }
                Err(err)
            }
        };
        slot.settle_status();
        slot.notify();
        outcome
    }

    pub(crate) fn spawn_refetch(&self, key: QueryKey) {
        let Ok(handle) = Handle::try_current() else {
            tracing::debug!(key = %key, "No runtime available; skipping background refetch");
            return;
        };
        let client = self.clone();
        handle.spawn(async move {
            if let Err(err) = client.refetch(&key).await {
                tracing::debug!(key = %key, error = %err, "Background refetch failed");
            }
        });
    }

    // ------------------------------------------------------------------------
    // Subscriptions and polling
    // ------------------------------------------------------------------------

    /// Observe `key`. Fetches immediately if the cached value is stale and
    /// polls while any subscription asks for an interval. Dropping the
    /// returned handle unsubscribes.
    pub fn subscribe<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> Subscription<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LockerRoomResult<T>> + Send + 'static,
    {
        let id = self.inner.next_subscription.fetch_add(1, Ordering::Relaxed);
        let (receiver, should_fetch) = {
            let mut entries = self.lock();
            let slot = entries
                .entry(key.clone())
                .or_insert_with(|| self.new_slot(&key));
            slot.fetcher = Some(erase(fetcher));
            slot.subscribers.insert(id, options.refetch_interval);
            slot.options = options;
            slot.touch();
            self.reconcile_poller(slot);
            (slot.watch(), slot.is_stale() && slot.fetching.is_none())
        };
        tracing::debug!(key = %key, subscription = id, "Subscribed");
        if should_fetch {
            self.spawn_refetch(key.clone());
        }
        Subscription::new(self.clone(), key, id, receiver)
    }

    pub(crate) fn unsubscribe(&self, key: &QueryKey, id: u64) {
        let mut entries = self.lock();
        let Some(slot) = entries.get_mut(key) else {
            return;
        };
        slot.subscribers.remove(&id);
        slot.touch();
        self.reconcile_poller(slot);
        tracing::debug!(
            key = %key,
            subscription = id,
            remaining = slot.subscribers.len(),
            "Unsubscribed"
        );
    }

    /// Make the polling task match the shortest interval any live
    /// subscriber asked for, or stop it if none did.
    fn reconcile_poller(&self, slot: &mut EntrySlot) {
        let desired = slot.desired_poll_period();
        let current = slot.poller.as_ref().map(|poller| poller.period);
        if desired == current {
            return;
        }
        // Replacing the poller drops, and thereby aborts, the old task.
        slot.poller = desired.and_then(|period| self.spawn_poller(slot.key.clone(), period));
        if slot.poller.is_none() && current.is_some() {
            tracing::debug!(key = %slot.key, "Polling stopped");
        }
    }

    fn spawn_poller(&self, key: QueryKey, period: Duration) -> Option<Poller> {
        let handle = Handle::try_current().ok()?;
        let period = period.max(MIN_TICK);
        let weak = self.downgrade();
        tracing::debug!(key = %key, period_ms = period.as_millis() as u64, "Polling started");
        let task = handle.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(client) = QueryClient::from_weak(&weak) else {
                    break;
                };
                if let Err(err) = client.refetch(&key).await {
                    tracing::debug!(key = %key, error = %err, "Poll failed");
                }
            }
        });
        Some(Poller { period, task })
    }

    // ------------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------------

    /// Mark every entry under `prefix` stale and refetch the ones that are
    /// being observed. Returns the number of entries matched.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let (matched, refetch) = {
            let mut entries = self.lock();
            mark_invalidated(&mut entries, std::slice::from_ref(prefix))
        };
        tracing::debug!(prefix = %prefix, matched, refetching = refetch.len(), "Invalidated queries");
        for key in refetch {
            self.spawn_refetch(key);
        }
        matched
    }

    /// Refetch observed entries that went stale while the application was
    /// in the background. Returns the number of refetches started.
    pub fn on_focus(&self) -> usize {
        let refetch: Vec<QueryKey> = {
            let entries = self.lock();
            entries
                .values()
                .filter(|slot| {
                    slot.is_active()
                        && slot.options.refetch_on_focus
                        && slot.fetcher.is_some()
                        && slot.fetching.is_none()
                        && slot.is_stale()
                })
                .map(|slot| slot.key.clone())
                .collect()
        };
        let started = refetch.len();
        for key in refetch {
            self.spawn_refetch(key);
        }
        started
    }

    // ------------------------------------------------------------------------
    // Garbage collection
    // ------------------------------------------------------------------------

    /// Remove entries nobody has observed for `gc_time`. Entries with
    /// subscribers, in-flight fetches, or pending mutations are kept.
    pub fn evict_inactive(&self) -> usize {
        let gc_time = self.inner.config.gc_time;
        let now = Instant::now();
        let evicted = {
            let mut entries = self.lock();
            let before = entries.len();
            entries.retain(|key, slot| {
                let keep = slot.is_active()
                    || slot.fetching.is_some()
                    || !slot.pending.is_empty()
                    || now.saturating_duration_since(slot.last_active) < gc_time;
                if !keep {
                    tracing::trace!(key = %key, "Evicting inactive query");
                }
                keep
            });
            before - entries.len()
        };
        Counters::add(&self.inner.counters.evictions, evicted as u64);
        evicted
    }

    /// Start the periodic sweep.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn_gc(&self) -> GcHandle {
        let period = self.inner.config.gc_interval.max(MIN_TICK);
        let weak = self.downgrade();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(client) = QueryClient::from_weak(&weak) else {
                    break;
                };
                let evicted = client.evict_inactive();
                if evicted > 0 {
                    tracing::debug!(evicted, "Garbage collection sweep");
                }
            }
        });
        GcHandle { task }
    }
}

/// Flag every entry matching one of `prefixes`. Returns how many matched and
/// which observed ones should refetch.
pub(crate) fn mark_invalidated(
    entries: &mut HashMap<QueryKey, EntrySlot>,
    prefixes: &[QueryKey],
) -> (usize, Vec<QueryKey>) {
    let mut matched = 0;
    let mut refetch = Vec::new();
    for slot in entries.values_mut() {
        if !prefixes.iter().any(|prefix| slot.key.starts_with(prefix)) {
            continue;
        }
        matched += 1;
        slot.invalidated = true;
        slot.notify();
        if slot.is_active() && slot.fetcher.is_some() && slot.fetching.is_none() {
            refetch.push(slot.key.clone());
        }
    }
    (matched, refetch)
}
