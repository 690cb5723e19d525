//! Scenario tests for subscriptions, polling, invalidation and GC.
//!
//! All tests run on a paused clock, so intervals elapse only when the test
//! advances time.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::poll;
use lockerroom_cache::{CacheConfig, FetchStatus, QueryClient, QueryKey, QueryOptions, RetryPolicy};
use lockerroom_core::{LockerRoomError, LockerRoomResult};
use std::task::Poll;
use tokio::sync::oneshot;

/// Let spawned tasks run to their next suspension point.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

async fn advance(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}

#[derive(Clone, Default)]
struct Counter(Arc<AtomicU32>);

impl Counter {
    fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    fn fetcher(
        &self,
    ) -> impl Fn() -> std::future::Ready<LockerRoomResult<u32>> + Send + Sync + 'static {
        let calls = self.0.clone();
        move || std::future::ready(Ok(calls.fetch_add(1, Ordering::SeqCst) + 1))
    }
}

fn polling(every: Duration) -> QueryOptions {
    QueryOptions::default()
        .with_refetch_interval(every)
        .with_retry(RetryPolicy::none())
}

#[tokio::test(start_paused = true)]
async fn test_subscribe_fetches_and_notifies() {
    let client = QueryClient::default();
    let counter = Counter::default();
    let mut sub = client.subscribe(
        QueryKey::new("profile").name("me"),
        QueryOptions::default(),
        counter.fetcher(),
    );

    assert_eq!(sub.wait_for_value().await.unwrap(), 1);
    let entry = sub.current().unwrap();
    assert_eq!(entry.status, FetchStatus::Success);
    assert!(!entry.is_optimistic);
}

#[tokio::test(start_paused = true)]
async fn test_polling_stops_when_last_subscriber_drops() {
    let client = QueryClient::default();
    let counter = Counter::default();
    let key = QueryKey::new("notifications").name("unread");

    let sub = client.subscribe(key.clone(), polling(Duration::from_secs(30)), counter.fetcher());
    settle().await;
    assert_eq!(counter.get(), 1);
    assert!(client.is_polling(&key));

    advance(Duration::from_secs(30)).await;
    assert_eq!(counter.get(), 2);
    advance(Duration::from_secs(30)).await;
    assert_eq!(counter.get(), 3);

    drop(sub);
    assert!(!client.is_polling(&key));
    assert_eq!(client.subscriber_count(&key), 0);

    advance(Duration::from_secs(300)).await;
    assert_eq!(counter.get(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_polling_follows_shortest_live_interval() {
    let client = QueryClient::default();
    let counter = Counter::default();
    let key = QueryKey::new("notifications").name("unread");

    let slow = client.subscribe(key.clone(), polling(Duration::from_secs(60)), counter.fetcher());
    let fast = client.subscribe(key.clone(), polling(Duration::from_secs(10)), counter.fetcher());
    settle().await;
    let start = counter.get();

    advance(Duration::from_secs(10)).await;
    assert_eq!(counter.get(), start + 1);

    drop(fast);
    assert!(client.is_polling(&key));
    advance(Duration::from_secs(30)).await;
    assert_eq!(counter.get(), start + 1);
    advance(Duration::from_secs(30)).await;
    assert_eq!(counter.get(), start + 2);

    drop(slow);
    assert!(!client.is_polling(&key));
}

#[tokio::test(start_paused = true)]
async fn test_invalidation_refetches_only_observed_entries() {
    let client = QueryClient::default();
    let observed = Counter::default();
    let unobserved = Counter::default();
    let watched_key = QueryKey::new("feed").name("home");
    let idle_key = QueryKey::new("feed").name("school");

    let _sub = client.subscribe(watched_key.clone(), QueryOptions::default(), observed.fetcher());
    client
        .fetch_query(idle_key.clone(), QueryOptions::default(), unobserved.fetcher())
        .await
        .unwrap();
    settle().await;
    assert_eq!(observed.get(), 1);
    assert_eq!(unobserved.get(), 1);

    assert_eq!(client.invalidate(&QueryKey::new("feed")), 2);
    settle().await;
    assert_eq!(observed.get(), 2);
    assert_eq!(unobserved.get(), 1);

    // The unobserved entry refetches on its next read.
    let entry = client.entry::<u32>(&idle_key).unwrap().unwrap();
    assert!(entry.invalidated);
    let read = client
        .fetch_query(idle_key, QueryOptions::default(), unobserved.fetcher())
        .await
        .unwrap();
    assert!(read.was_cache_miss());
    assert_eq!(unobserved.get(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unreconciled_prediction_refetches_observed_entry() {
    let client = QueryClient::default();
    let counter = Counter::default();
    let key = QueryKey::new("notifications").name("list");
    let options = QueryOptions::default().with_stale_time(Duration::from_secs(300));

    let _sub = client.subscribe(key.clone(), options, counter.fetcher());
    settle().await;
    assert_eq!(counter.get(), 1);

    client
        .mutation::<()>("mark_all_read")
        .optimistic::<u32, _>(key.clone(), |n| n.map(|n| n + 100))
        .execute(async { Ok(()) })
        .await
        .unwrap();
    settle().await;

    // The guess is replaced by the server's value, not kept until a poll.
    assert_eq!(counter.get(), 2);
    let entry = client.entry::<u32>(&key).unwrap().unwrap();
    assert_eq!(entry.value, Some(2));
    assert!(!entry.invalidated);
    assert!(!entry.is_optimistic);
}

#[tokio::test(start_paused = true)]
async fn test_unreconciled_prediction_on_idle_entry_waits_for_next_read() {
    let client = QueryClient::default();
    let counter = Counter::default();
    let key = QueryKey::new("notifications").name("list");
    let options = QueryOptions::default().with_stale_time(Duration::from_secs(300));

    client
        .fetch_query(key.clone(), options.clone(), counter.fetcher())
        .await
        .unwrap();
    client
        .mutation::<()>("mark_all_read")
        .optimistic::<u32, _>(key.clone(), |n| n.map(|n| n + 100))
        .execute(async { Ok(()) })
        .await
        .unwrap();
    settle().await;

    assert_eq!(counter.get(), 1);
    let entry = client.entry::<u32>(&key).unwrap().unwrap();
    assert_eq!(entry.value, Some(101));
    assert!(entry.invalidated);

    let read = client.fetch_query(key, options, counter.fetcher()).await.unwrap();
    assert!(read.was_cache_miss());
    assert_eq!(counter.get(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_focus_refetches_stale_observed_entries() {
    let client = QueryClient::default();
    let counter = Counter::default();
    let options = QueryOptions::default().with_stale_time(Duration::from_secs(60));
    let _sub = client.subscribe(QueryKey::new("analytics"), options, counter.fetcher());
    settle().await;
    assert_eq!(counter.get(), 1);

    assert_eq!(client.on_focus(), 0);
    advance(Duration::from_secs(61)).await;
    assert_eq!(client.on_focus(), 1);
    settle().await;
    assert_eq!(counter.get(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_gc_keeps_observed_entries() {
    let config = CacheConfig::new()
        .with_gc_time(Duration::from_secs(60))
        .with_gc_interval(Duration::from_secs(10));
    let client = QueryClient::new(config);
    let _gc = client.spawn_gc();
    let counter = Counter::default();

    let watched = QueryKey::new("profile").name("me");
    let sub = client.subscribe(watched.clone(), QueryOptions::default(), counter.fetcher());
    client.set_query_data(QueryKey::new("profile").name("other"), 7u32);
    settle().await;

    advance(Duration::from_secs(120)).await;
    assert!(client.contains(&watched));
    assert!(!client.contains(&QueryKey::new("profile").name("other")));

    drop(sub);
    advance(Duration::from_secs(70)).await;
    assert!(!client.contains(&watched));
    assert_eq!(client.stats().evictions, 2);
}

#[tokio::test(start_paused = true)]
async fn test_slow_response_does_not_overwrite_newer_write() {
    let client = QueryClient::default();
    let key = QueryKey::new("profile").name("me");
    let (tx, rx) = oneshot::channel::<u32>();
    let rx = Arc::new(tokio::sync::Mutex::new(Some(rx)));

    let fetch = client.fetch_query(key.clone(), polling(Duration::from_secs(3600)), move || {
        let rx = rx.clone();
        async move {
            let receiver = rx.lock().await.take();
            match receiver {
                Some(receiver) => receiver
                    .await
                    .map_err(|_| LockerRoomError::transport("closed")),
                None => Err(LockerRoomError::transport("already used")),
            }
        }
    });
    tokio::pin!(fetch);
    assert!(matches!(poll!(&mut fetch), Poll::Pending));
    assert!(client.is_fetching(&key));

    // A newer authoritative write lands while the fetch is in flight.
    client.set_query_data(key.clone(), 42u32);
    tx.send(1).unwrap();
    let read = fetch.await.unwrap();

    assert_eq!(read.into_value(), 42);
    assert_eq!(client.get_query_data::<u32>(&key).unwrap(), Some(42));
    assert_eq!(client.stats().discarded_responses, 1);
    assert!(!client.is_fetching(&key));
}

#[tokio::test(start_paused = true)]
async fn test_fetch_during_pending_mutation_is_discarded() {
    let client = QueryClient::default();
    let key = QueryKey::new("posts").name("mine");
    client.set_query_data(key.clone(), vec![1u32, 2]);

    let (tx, rx) = oneshot::channel::<LockerRoomResult<Vec<u32>>>();
    let mutation = client
        .mutation::<Vec<u32>>("append")
        .optimistic::<Vec<u32>, _>(key.clone(), |current| {
            current.map(|items| {
                let mut next = items.clone();
                next.push(3);
                next
            })
        })
        .reconcile::<Vec<u32>, _>(key.clone(), |server| Some(server.clone()))
        .execute(async move { rx.await.unwrap_or_else(|_| Err(LockerRoomError::transport("closed"))) });
    tokio::pin!(mutation);
    assert!(matches!(poll!(&mut mutation), Poll::Pending));

    // A poll returns pre-mutation data while the write is in flight.
    client
        .fetch_query(key.clone(), QueryOptions::default(), || async { Ok(vec![1u32, 2]) })
        .await
        .unwrap();
    assert_eq!(
        client.get_query_data::<Vec<u32>>(&key).unwrap(),
        Some(vec![1, 2, 3])
    );

    tx.send(Ok(vec![1, 2, 3, 4])).unwrap();
    mutation.await.unwrap();
    assert_eq!(
        client.get_query_data::<Vec<u32>>(&key).unwrap(),
        Some(vec![1, 2, 3, 4])
    );
}

#[tokio::test(start_paused = true)]
async fn test_multi_key_mutation_rolls_back_every_key() {
    let client = QueryClient::default();
    let list = QueryKey::new("notifications").name("list");
    let unread = QueryKey::new("notifications").name("unread");
    client.set_query_data(list.clone(), vec![false, false]);
    client.set_query_data(unread.clone(), 2u32);

    let result = client
        .mutation::<()>("mark_all_read")
        .optimistic::<Vec<bool>, _>(list.clone(), |items| {
            items.map(|items| items.iter().map(|_| true).collect())
        })
        .optimistic::<u32, _>(unread.clone(), |_| Some(0))
        .execute(async { Err(LockerRoomError::transport("offline")) })
        .await;

    assert!(result.is_err());
    assert_eq!(
        client.get_query_data::<Vec<bool>>(&list).unwrap(),
        Some(vec![false, false])
    );
    assert_eq!(client.get_query_data::<u32>(&unread).unwrap(), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_clear_closes_subscriptions() {
    let client = QueryClient::default();
    let counter = Counter::default();
    let mut sub = client.subscribe(QueryKey::new("feed"), QueryOptions::default(), counter.fetcher());
    settle().await;

    client.clear();
    assert!(client.keys().is_empty());
    // Drain changes seen before the clear; the stream then ends.
    while sub.changed().await {}
    assert_eq!(sub.value().unwrap(), None);
}
