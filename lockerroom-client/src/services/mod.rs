//! Resource services.
//!
//! Each service pairs API calls with the cache keys they read and write.
//! Reads go through the [`QueryClient`] so every view sharing a key shares
//! one value; writes go through optimistic mutations.

mod analytics;
mod evaluations;
mod feed;
mod notifications;
mod profile;
mod xen_watch;

pub use analytics::AnalyticsService;
pub use evaluations::{field_locations, EvaluationService};
pub use feed::{FeedData, FeedService};
pub use notifications::NotificationService;
pub use profile::ProfileService;
pub use xen_watch::XenWatchService;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use lockerroom_cache::QueryClient;
use lockerroom_core::{LockerRoomApi, Session};

/// Every service for one signed-in actor, sharing one cache.
#[derive(Clone)]
pub struct LockerRoom {
    client: QueryClient,
    pub profiles: ProfileService,
    pub feed: FeedService,
    pub notifications: NotificationService,
    pub evaluations: EvaluationService,
    pub analytics: AnalyticsService,
    pub xen_watch: XenWatchService,
}

impl LockerRoom {
    pub fn new(
        api: Arc<dyn LockerRoomApi>,
        client: QueryClient,
        session: &Session,
        notification_poll: Duration,
    ) -> Self {
        Self {
            profiles: ProfileService::new(api.clone(), client.clone(), session.user_id),
            feed: FeedService::new(api.clone(), client.clone()),
            notifications: NotificationService::new(api.clone(), client.clone(), notification_poll),
            evaluations: EvaluationService::new(api.clone(), client.clone()),
            analytics: AnalyticsService::new(api.clone(), client.clone()),
            xen_watch: XenWatchService::new(api, client.clone(), session.user_id),
            client,
        }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    /// The application regained focus: refetch stale observed data.
    pub fn on_focus(&self) -> usize {
        self.client.on_focus()
    }

    /// Sign-out: drop everything cached for this actor.
    pub fn sign_out(&self) {
        self.client.clear();
    }
}

/// Adapt an API call into a reusable cache fetcher.
pub(crate) fn from_api<F, Fut>(
    api: &Arc<dyn LockerRoomApi>,
    call: F,
) -> impl Fn() -> Fut + Send + Sync + 'static
where
    F: Fn(Arc<dyn LockerRoomApi>) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
{
    let api = api.clone();
    move || call(api.clone())
}
