use std::sync::Arc;
use std::time::Duration;

use lockerroom_cache::{CacheRead, QueryClient, QueryOptions, Subscription};
use lockerroom_core::{
    LockerRoomApi, LockerRoomResult, Notification, NotificationId, Route, UnreadCount,
};

use super::from_api;
use crate::keys;

#[derive(Clone)]
pub struct NotificationService {
    api: Arc<dyn LockerRoomApi>,
    client: QueryClient,
    poll_interval: Duration,
}

impl NotificationService {
    pub fn new(api: Arc<dyn LockerRoomApi>, client: QueryClient, poll_interval: Duration) -> Self {
        Self {
            api,
            client,
            poll_interval,
        }
    }

    fn options(&self) -> QueryOptions {
        self.client.config().query_options()
    }

    pub async fn list(&self) -> LockerRoomResult<Vec<Notification>> {
        self.client
            .fetch_query(
                keys::notifications(),
                self.options(),
                from_api(&self.api, |api| async move { api.notifications().await }),
            )
            .await
            .map(CacheRead::into_value)
    }

    pub async fn unread_count(&self) -> LockerRoomResult<u32> {
        self.client
            .fetch_query(
                keys::unread_count(),
                self.options(),
                from_api(&self.api, |api| async move { api.unread_count().await }),
            )
            .await
            .map(|read| read.into_value().unread)
    }

    pub fn watch_list(&self) -> Subscription<Vec<Notification>> {
        self.client.subscribe(
            keys::notifications(),
            self.options(),
            from_api(&self.api, |api| async move { api.notifications().await }),
        )
    }

    /// The unread badge. Polls every configured interval until the
    /// returned subscription is dropped.
    pub fn watch_unread(&self) -> Subscription<UnreadCount> {
        self.client.subscribe(
            keys::unread_count(),
            self.options().with_refetch_interval(self.poll_interval),
            from_api(&self.api, |api| async move { api.unread_count().await }),
        )
    }

    pub async fn mark_read(&self, notification_id: NotificationId) -> LockerRoomResult<()> {
        let list = keys::notifications();
        let was_unread = self
            .client
            .get_query_data::<Vec<Notification>>(&list)?
            .is_some_and(|items| {
                items
                    .iter()
                    .any(|n| n.id == notification_id && !n.read)
            });

        self.client
            .mutation::<()>("mark_read")
            .optimistic::<Vec<Notification>, _>(list, move |items| {
                items.map(|items| {
                    items
                        .iter()
                        .map(|n| {
                            let mut n = n.clone();
                            if n.id == notification_id {
                                n.read = true;
                            }
                            n
                        })
                        .collect()
                })
            })
            .optimistic::<UnreadCount, _>(keys::unread_count(), move |count| {
                let count = count.filter(|_| was_unread)?;
                Some(UnreadCount {
                    unread: count.unread.saturating_sub(1),
                })
            })
            .execute(self.api.mark_read(notification_id))
            .await
    }

    pub async fn mark_all_read(&self) -> LockerRoomResult<()> {
        self.client
            .mutation::<()>("mark_all_read")
            .optimistic::<Vec<Notification>, _>(keys::notifications(), |items| {
                items.map(|items| {
                    items
                        .iter()
                        .map(|n| Notification {
                            read: true,
                            ..n.clone()
                        })
                        .collect()
                })
            })
            .optimistic::<UnreadCount, _>(keys::unread_count(), |_| {
                Some(UnreadCount { unread: 0 })
            })
            .execute(self.api.mark_all_read())
            .await
    }

    /// Follow a notification: mark it read and return where it points.
    pub async fn open(&self, notification: &Notification) -> LockerRoomResult<Route> {
        if !notification.read {
            self.mark_read(notification.id).await?;
        }
        Ok(notification.route())
    }
}
