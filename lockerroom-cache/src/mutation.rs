//! Optimistic mutations.
//!
//! A mutation predicts its effect on one or more cached entries, shows the
//! prediction immediately, then either reconciles with the server response
//! or restores the exact prior state. Every entry a mutation touches is
//! updated under one lock acquisition, so observers never see half of a
//! multi-key change.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use lockerroom_core::{CacheError, LockerRoomResult};

use crate::client::{mark_invalidated, QueryClient};
use crate::entry::{CachedValue, WriteOutcome};
use crate::key::QueryKey;
use crate::stats::Counters;

type Predict = Box<dyn FnOnce(Option<&CachedValue>) -> LockerRoomResult<Option<CachedValue>> + Send>;
type Reconcile<R> =
    Box<dyn FnOnce(Option<&CachedValue>, &R) -> LockerRoomResult<Option<CachedValue>> + Send>;

/// How an in-flight mutation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    Pending,
    Committed,
    RolledBack,
}

/// Builder for one server write and its cache effects.
///
/// ```ignore
/// let post = client
///     .mutation::<MediaPost>("toggle_like")
///     .optimistic::<FeedData, _>(feed_key.clone(), move |feed| feed.map(|f| f.toggled(id)))
///     .reconcile_with::<FeedData, _>(feed_key, move |before, post| before.map(|f| f.with_post(post)))
///     .execute(api.toggle_like(id))
///     .await?;
/// ```
#[must_use = "a mutation does nothing until executed"]
pub struct Mutation<R> {
    client: QueryClient,
    label: String,
    predictions: Vec<(QueryKey, Predict)>,
    reconcilers: Vec<(QueryKey, Reconcile<R>)>,
    invalidates: Vec<QueryKey>,
}

impl QueryClient {
    /// Start describing a mutation whose server response has type `R`.
    pub fn mutation<R>(&self, label: impl Into<String>) -> Mutation<R>
    where
        R: Send + 'static,
    {
        Mutation {
            client: self.clone(),
            label: label.into(),
            predictions: Vec::new(),
            reconcilers: Vec::new(),
            invalidates: Vec::new(),
        }
    }
}

impl<R> Mutation<R>
where
    R: Send + 'static,
{
    /// Predict the new value of `key` from its current value. Returning
    /// `None` leaves the entry as it is.
    pub fn optimistic<T, F>(mut self, key: QueryKey, predict: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnOnce(Option<&T>) -> Option<T> + Send + 'static,
    {
        let name = key.to_string();
        let predict: Predict = Box::new(move |current| {
            let typed = match current {
                Some(value) => Some(
                    value
                        .downcast_ref::<T>()
                        .ok_or(CacheError::TypeMismatch { key: name })?,
                ),
                None => None,
            };
            Ok(predict(typed).map(|value| Arc::new(value) as CachedValue))
        });
        self.predictions.push((key, predict));
        self
    }

    /// Derive the authoritative value of `key` from the server response.
    /// Keys predicted but not reconciled are marked stale on success.
    pub fn reconcile<T, F>(self, key: QueryKey, derive: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnOnce(&R) -> Option<T> + Send + 'static,
    {
        self.reconcile_with::<T, _>(key, move |_, response| derive(response))
    }

    /// Like [`reconcile`](Self::reconcile), but also sees the value the
    /// entry held before this mutation's prediction. Use it to merge a
    /// single server record into a larger cached collection.
    pub fn reconcile_with<T, F>(mut self, key: QueryKey, derive: F) -> Self
    where
        T: Send + Sync + 'static,
        F: FnOnce(Option<&T>, &R) -> Option<T> + Send + 'static,
    {
        let name = key.to_string();
        let reconcile: Reconcile<R> = Box::new(move |base, response| {
            let typed = match base {
                Some(value) => Some(
                    value
                        .downcast_ref::<T>()
                        .ok_or(CacheError::TypeMismatch { key: name })?,
                ),
                None => None,
            };
            Ok(derive(typed, response).map(|value| Arc::new(value) as CachedValue))
        });
        self.reconcilers.push((key, reconcile));
        self
    }

    /// Mark every entry under `prefix` stale once the write succeeds.
    pub fn invalidates(mut self, prefix: QueryKey) -> Self {
        self.invalidates.push(prefix);
        self
    }

    /// Apply predictions, perform `write`, then commit or roll back.
    ///
    /// Writes are never retried. If the returned future is dropped before
    /// `write` resolves, the predictions are rolled back.
    pub async fn execute<Fut>(self, write: Fut) -> LockerRoomResult<R>
    where
        Fut: Future<Output = LockerRoomResult<R>>,
    {
        let Mutation {
            client,
            label,
            predictions,
            reconcilers,
            invalidates,
        } = self;

        let generation = client.next_generation();
        let mut targets: Vec<QueryKey> = Vec::new();
        {
            let mut entries = client.lock();

            // Evaluate every prediction before touching anything, so a type
            // error leaves the cache unchanged.
            let mut predicted: HashMap<QueryKey, CachedValue> = HashMap::new();
            for (key, predict) in predictions {
                let current = entries.get(&key).and_then(|slot| slot.value.as_ref());
                if let Some(value) = predict(current)? {
                    predicted.insert(key.clone(), value);
                }
                if !targets.contains(&key) {
                    targets.push(key);
                }
            }
            for (key, _) in &reconcilers {
                if !targets.contains(key) && entries.contains_key(key) {
                    targets.push(key.clone());
                }
            }

            for key in &targets {
                let prediction = predicted.remove(key);
                if prediction.is_none() && !entries.contains_key(key) {
                    continue;
                }
                let slot = entries
                    .entry(key.clone())
                    .or_insert_with(|| client.new_slot(key));
                slot.begin_mutation(generation, prediction);
                slot.notify();
            }
        }
        tracing::debug!(
            mutation = %label,
            generation,
            keys = targets.len(),
            "Mutation started"
        );

        let mut in_flight = InFlight {
            client: client.clone(),
            label,
            generation,
            targets,
            resolution: Resolution::Pending,
        };
        match write.await {
            Ok(response) => {
                in_flight.commit(&response, reconcilers, &invalidates);
                Ok(response)
            }
            Err(err) => {
                in_flight.rollback();
                tracing::warn!(
                    mutation = %in_flight.label,
                    error = %err,
                    "Mutation failed; optimistic changes rolled back"
                );
                Err(err)
            }
        }
    }
}

/// Tracks one executing mutation. Rolls back on drop if it never resolved.
struct InFlight {
    client: QueryClient,
    label: String,
    generation: u64,
    targets: Vec<QueryKey>,
    resolution: Resolution,
}

impl InFlight {
    fn commit<R>(
        &mut self,
        response: &R,
        reconcilers: Vec<(QueryKey, Reconcile<R>)>,
        invalidates: &[QueryKey],
    ) {
        let mut reconcilers: HashMap<QueryKey, Reconcile<R>> = reconcilers.into_iter().collect();

        let refetch = {
            let mut entries = self.client.lock();
            let mut unconfirmed = Vec::new();
            // Reconciled keys that were not cached when the mutation began.
            for key in reconcilers.keys() {
                if !entries.contains_key(key) {
                    entries.insert(key.clone(), self.client.new_slot(key));
                }
                if !self.targets.contains(key) {
                    self.targets.push(key.clone());
                }
            }

            for key in &self.targets {
                let Some(slot) = entries.get_mut(key) else {
                    continue;
                };
                let server = match reconcilers.remove(key) {
                    Some(derive) => {
                        let base = slot.mutation_base(self.generation);
                        derive(base.as_ref(), response).unwrap_or_else(|err| {
                            tracing::warn!(
                                mutation = %self.label,
                                key = %key,
                                error = %err,
                                "Could not reconcile mutation response"
                            );
                            None
                        })
                    }
                    None => None,
                };
                let (outcome, invalidated) = slot.commit_mutation(self.generation, server);
                if invalidated
                    && slot.is_active()
                    && slot.fetcher.is_some()
                    && slot.fetching.is_none()
                {
                    unconfirmed.push(key.clone());
                }
                if outcome == WriteOutcome::Superseded {
                    tracing::debug!(
                        mutation = %self.label,
                        key = %key,
                        "Mutation response superseded by a newer write"
                    );
                }
                slot.notify();
            }
            let (_, mut refetch) = mark_invalidated(&mut entries, invalidates);
            for key in unconfirmed {
                if !refetch.contains(&key) {
                    refetch.push(key);
                }
            }
            refetch
        };

        self.resolution = Resolution::Committed;
        Counters::bump(&self.client.counters().commits);
        tracing::debug!(mutation = %self.label, generation = self.generation, "Mutation committed");
        for key in refetch {
            self.client.spawn_refetch(key);
        }
    }

    fn rollback(&mut self) {
        {
            let mut entries = self.client.lock();
            for key in &self.targets {
                if let Some(slot) = entries.get_mut(key) {
                    if slot.rollback_mutation(self.generation) != WriteOutcome::Superseded {
                        slot.notify();
                    }
                }
            }
        }
        self.resolution = Resolution::RolledBack;
        Counters::bump(&self.client.counters().rollbacks);
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.resolution == Resolution::Pending {
            tracing::debug!(mutation = %self.label, "Mutation cancelled before completion");
            self.rollback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockerroom_core::LockerRoomError;

    #[tokio::test]
    async fn test_prediction_type_mismatch_leaves_cache_untouched() {
        let client = QueryClient::default();
        let key = QueryKey::new("count");
        client.set_query_data(key.clone(), 1u32);

        let result = client
            .mutation::<()>("bad")
            .optimistic::<String, _>(key.clone(), |_| Some("x".to_string()))
            .execute(async { Ok(()) })
            .await;
        assert!(matches!(
            result,
            Err(LockerRoomError::Cache(CacheError::TypeMismatch { .. }))
        ));
        assert_eq!(client.get_query_data::<u32>(&key).unwrap(), Some(1));
        assert!(!client.has_pending_mutation(&key));
    }

    #[tokio::test]
    async fn test_failed_write_restores_prior_value() {
        let client = QueryClient::default();
        let key = QueryKey::new("count");
        client.set_query_data(key.clone(), 1u32);

        let result = client
            .mutation::<u32>("increment")
            .optimistic::<u32, _>(key.clone(), |n| n.map(|n| n + 1))
            .reconcile::<u32, _>(key.clone(), |server| Some(*server))
            .execute(async { Err(LockerRoomError::transport("offline")) })
            .await;
        assert!(result.is_err());
        assert_eq!(client.get_query_data::<u32>(&key).unwrap(), Some(1));
        assert_eq!(client.stats().rollbacks, 1);
    }

    #[tokio::test]
    async fn test_reconcile_creates_missing_entry() {
        let client = QueryClient::default();
        let key = QueryKey::new("profile");
        client
            .mutation::<u32>("create")
            .reconcile::<u32, _>(key.clone(), |server| Some(*server))
            .execute(async { Ok(9) })
            .await
            .unwrap();
        assert_eq!(client.get_query_data::<u32>(&key).unwrap(), Some(9));
    }

    #[tokio::test]
    async fn test_cancelled_mutation_rolls_back() {
        let client = QueryClient::default();
        let key = QueryKey::new("count");
        client.set_query_data(key.clone(), 1u32);

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mutation = client
            .mutation::<u32>("slow")
            .optimistic::<u32, _>(key.clone(), |n| n.map(|n| n + 10))
            .execute(async move {
                let _ = rx.await;
                Ok(0)
            });

        // Poll once so predictions apply, then abandon the future.
        let outcome = tokio::time::timeout(std::time::Duration::from_millis(10), mutation).await;
        assert!(outcome.is_err());
        drop(tx);
        assert_eq!(client.get_query_data::<u32>(&key).unwrap(), Some(1));
        assert!(!client.has_pending_mutation(&key));
    }
}
