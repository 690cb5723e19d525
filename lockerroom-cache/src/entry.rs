//! Internal per-key state.
//!
//! Every write to a slot carries a generation. Generations come from one
//! client-wide counter, so a larger number always means a later request.
//! A slot remembers the generation of the last write it accepted
//! (`committed`) and refuses anything older.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use lockerroom_core::{CacheError, LockerRoomError, LockerRoomResult};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::QueryOptions;
use crate::freshness::{CacheEntry, FetchStatus};
use crate::key::QueryKey;

pub(crate) type CachedValue = Arc<dyn Any + Send + Sync>;

pub(crate) type Fetcher =
    Arc<dyn Fn() -> BoxFuture<'static, LockerRoomResult<CachedValue>> + Send + Sync>;

/// Everything a rollback has to put back.
#[derive(Clone)]
pub(crate) struct Snapshot {
    value: Option<CachedValue>,
    status: FetchStatus,
    error: Option<LockerRoomError>,
    updated_at: Option<Instant>,
    invalidated: bool,
    optimistic_owner: Option<u64>,
}

/// Handle to a polling task. Dropping it stops the polling.
pub(crate) struct Poller {
    pub(crate) period: Duration,
    pub(crate) task: JoinHandle<()>,
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteOutcome {
    /// The write became the visible value.
    Applied,
    /// A newer optimistic write is visible; this write became its rollback base.
    Rebased,
    /// A newer write already committed.
    Superseded,
}

pub(crate) struct EntrySlot {
    pub(crate) key: QueryKey,
    pub(crate) value: Option<CachedValue>,
    pub(crate) status: FetchStatus,
    pub(crate) error: Option<LockerRoomError>,
    pub(crate) updated_at: Option<Instant>,
    pub(crate) invalidated: bool,
    pub(crate) options: QueryOptions,
    /// Generation of the last accepted write.
    pub(crate) committed: u64,
    /// Generation of the mutation whose prediction is currently visible.
    pub(crate) optimistic_owner: Option<u64>,
    /// Generation of the fetch currently in flight, if any.
    pub(crate) fetching: Option<u64>,
    /// A next-page load is in flight.
    pub(crate) fetching_page: bool,
    /// Snapshots taken by in-flight mutations, keyed by generation.
    pub(crate) pending: BTreeMap<u64, Snapshot>,
    /// Live subscriptions and the polling period each asked for.
    pub(crate) subscribers: BTreeMap<u64, Option<Duration>>,
    pub(crate) fetcher: Option<Fetcher>,
    pub(crate) poller: Option<Poller>,
    pub(crate) last_active: Instant,
    version: watch::Sender<u64>,
}

impl EntrySlot {
    pub(crate) fn new(key: QueryKey, options: QueryOptions) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            key,
            value: None,
            status: FetchStatus::Idle,
            error: None,
            updated_at: None,
            invalidated: false,
            options,
            committed: 0,
            optimistic_owner: None,
            fetching: None,
            fetching_page: false,
            pending: BTreeMap::new(),
            subscribers: BTreeMap::new(),
            fetcher: None,
            poller: None,
            last_active: Instant::now(),
            version,
        }
    }

    pub(crate) fn watch(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Wake every subscriber. Called once per logical change, after all
    /// fields of that change are written.
    pub(crate) fn notify(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    pub(crate) fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub(crate) fn is_active(&self) -> bool {
        !self.subscribers.is_empty()
    }

    pub(crate) fn stale_after(&self) -> Option<Instant> {
        self.updated_at.map(|at| at + self.options.stale_time)
    }

    pub(crate) fn is_stale(&self) -> bool {
        if self.invalidated || self.value.is_none() {
            return true;
        }
        match self.stale_after() {
            Some(at) => Instant::now() >= at,
            None => true,
        }
    }

    pub(crate) fn typed<T>(&self) -> LockerRoomResult<Option<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        match &self.value {
            None => Ok(None),
            Some(value) => downcast::<T>(&self.key, value).map(Some),
        }
    }

    pub(crate) fn view<T>(&self) -> LockerRoomResult<CacheEntry<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        Ok(CacheEntry {
            key: self.key.clone(),
            value: self.typed::<T>()?,
            status: self.status,
            error: self.error.clone(),
            updated_at: self.updated_at,
            stale_after: self.stale_after(),
            is_optimistic: self.optimistic_owner.is_some(),
            invalidated: self.invalidated,
        })
    }

    /// Unconditional authoritative write.
    pub(crate) fn write(&mut self, generation: u64, value: CachedValue) {
        self.value = Some(value);
        self.updated_at = Some(Instant::now());
        self.status = FetchStatus::Success;
        self.error = None;
        self.invalidated = false;
        self.optimistic_owner = None;
        self.committed = self.committed.max(generation);
        self.touch();
    }

    /// Status once no fetch is running anymore.
    pub(crate) fn settle_status(&mut self) {
        if self.fetching.is_some() {
            self.status = FetchStatus::Loading;
        } else if self.status == FetchStatus::Loading {
            self.status = if self.error.is_some() {
                FetchStatus::Error
            } else if self.value.is_some() {
                FetchStatus::Success
            } else {
                FetchStatus::Idle
            };
        }
    }

    /// Fetch results lose to anything committed after they were requested
    /// and to any mutation still in flight.
    pub(crate) fn accepts_fetch(&self, generation: u64) -> bool {
        generation > self.committed && self.pending.is_empty()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            value: self.value.clone(),
            status: self.status,
            error: self.error.clone(),
            updated_at: self.updated_at,
            invalidated: self.invalidated,
            optimistic_owner: self.optimistic_owner,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.value = snapshot.value;
        self.status = snapshot.status;
        self.error = snapshot.error;
        self.updated_at = snapshot.updated_at;
        self.invalidated = snapshot.invalidated;
        self.optimistic_owner = snapshot.optimistic_owner;
        self.settle_status();
    }

    fn next_pending_after(&mut self, generation: u64) -> Option<&mut Snapshot> {
        self.pending
            .range_mut(generation + 1..)
            .next()
            .map(|(_, snapshot)| snapshot)
    }

    /// Record the pre-mutation state and, if given, show the prediction.
    pub(crate) fn begin_mutation(&mut self, generation: u64, prediction: Option<CachedValue>) {
        let snapshot = self.snapshot();
        self.pending.insert(generation, snapshot);
        if let Some(value) = prediction {
            self.value = Some(value);
            self.optimistic_owner = Some(generation);
        }
        self.touch();
    }

    /// The value a mutation's authoritative result should be merged into:
    /// the state from just before its prediction.
    pub(crate) fn mutation_base(&self, generation: u64) -> Option<CachedValue> {
        match self.pending.get(&generation) {
            Some(snapshot) => snapshot.value.clone(),
            None => self.value.clone(),
        }
    }

    /// Reconcile a successful mutation. `server` is the authoritative value
    /// for this key, if the response carries one. The flag is true when the
    /// visible value was left as an unconfirmed guess and marked stale.
    pub(crate) fn commit_mutation(
        &mut self,
        generation: u64,
        server: Option<CachedValue>,
    ) -> (WriteOutcome, bool) {
        self.pending.remove(&generation);
        self.touch();
        if generation <= self.committed {
            return (WriteOutcome::Superseded, false);
        }

        if let Some(newer) = self.next_pending_after(generation) {
            match server {
                Some(value) => {
                    newer.value = Some(value);
                    newer.updated_at = Some(Instant::now());
                    newer.status = FetchStatus::Success;
                    newer.error = None;
                    newer.invalidated = false;
                    newer.optimistic_owner = None;
                }
                None => {
                    // The newer mutation's rollback base is our guess.
                    if newer.optimistic_owner.is_some() {
                        newer.invalidated = true;
                    }
                    newer.optimistic_owner = None;
                }
            }
            self.committed = generation;
            return (WriteOutcome::Rebased, false);
        }

        let mut invalidated = false;
        match server {
            Some(value) => self.write(generation, value),
            None => {
                // No authoritative value for this key: an optimistic guess
                // must not pass for server state.
                if self.optimistic_owner.is_some() {
                    self.invalidated = true;
                    invalidated = true;
                }
                self.optimistic_owner = None;
                self.committed = generation;
            }
        }
        (WriteOutcome::Applied, invalidated)
    }

    /// Undo a failed mutation. `Applied` means the visible value changed.
    pub(crate) fn rollback_mutation(&mut self, generation: u64) -> WriteOutcome {
        let Some(snapshot) = self.pending.remove(&generation) else {
            return WriteOutcome::Superseded;
        };
        self.touch();
        if generation <= self.committed {
            return WriteOutcome::Superseded;
        }
        if let Some(newer) = self.next_pending_after(generation) {
            // The newer mutation snapshotted our prediction; hand it the
            // state from before us instead.
            *newer = snapshot;
            return WriteOutcome::Rebased;
        }
        self.restore(snapshot);
        WriteOutcome::Applied
    }

    /// Rewrite the visible value and every pending rollback snapshot.
    /// `extend` returns `None` for values it should leave alone.
    pub(crate) fn extend_all<F>(&mut self, mut extend: F) -> bool
    where
        F: FnMut(&CachedValue) -> Option<CachedValue>,
    {
        let mut changed = false;
        if let Some(next) = self.value.as_ref().and_then(&mut extend) {
            self.value = Some(next);
            changed = true;
        }
        for snapshot in self.pending.values_mut() {
            if let Some(next) = snapshot.value.as_ref().and_then(&mut extend) {
                snapshot.value = Some(next);
            }
        }
        changed
    }

    /// Reset to an empty entry, keeping subscribers and their polling.
    pub(crate) fn reset(&mut self, generation: u64) {
        self.value = None;
        self.status = FetchStatus::Idle;
        self.error = None;
        self.updated_at = None;
        self.invalidated = false;
        self.optimistic_owner = None;
        self.pending.clear();
        self.committed = self.committed.max(generation);
        self.settle_status();
    }

    /// Shortest polling period any live subscriber asked for.
    pub(crate) fn desired_poll_period(&self) -> Option<Duration> {
        self.subscribers.values().flatten().min().copied()
    }
}

pub(crate) fn downcast<T>(key: &QueryKey, value: &CachedValue) -> LockerRoomResult<T>
where
    T: Clone + Send + Sync + 'static,
{
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| {
            CacheError::TypeMismatch {
                key: key.to_string(),
            }
            .into()
        })
}
