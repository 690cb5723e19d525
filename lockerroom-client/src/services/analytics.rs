use std::sync::Arc;
use std::time::Duration;

use lockerroom_cache::{CacheRead, QueryClient, QueryOptions, Subscription};
use lockerroom_core::{AnalyticsDashboard, LockerRoomApi, LockerRoomResult, UserId};

use super::from_api;
use crate::keys;

/// Dashboards are aggregated server-side and change slowly.
const DASHBOARD_STALE_TIME: Duration = Duration::from_secs(5 * 60);

#[derive(Clone)]
pub struct AnalyticsService {
    api: Arc<dyn LockerRoomApi>,
    client: QueryClient,
}

impl AnalyticsService {
    pub fn new(api: Arc<dyn LockerRoomApi>, client: QueryClient) -> Self {
        Self { api, client }
    }

    fn options(&self) -> QueryOptions {
        let defaults = self.client.config().query_options();
        let stale_time = defaults.stale_time.max(DASHBOARD_STALE_TIME);
        defaults.with_stale_time(stale_time)
    }

    pub async fn dashboard(&self, user_id: UserId) -> LockerRoomResult<AnalyticsDashboard> {
        self.client
            .fetch_query(
                keys::analytics(user_id),
                self.options(),
                from_api(&self.api, move |api| async move { api.dashboard(user_id).await }),
            )
            .await
            .map(CacheRead::into_value)
    }

    pub fn watch_dashboard(&self, user_id: UserId) -> Subscription<AnalyticsDashboard> {
        self.client.subscribe(
            keys::analytics(user_id),
            self.options(),
            from_api(&self.api, move |api| async move { api.dashboard(user_id).await }),
        )
    }
}
