use std::sync::Arc;

use lockerroom_cache::{CacheRead, QueryClient, QueryOptions, Subscription};
use lockerroom_core::{
    LockerRoomApi, LockerRoomError, LockerRoomResult, NewSubmission, SubmissionId, UserId,
    XenWatchReview, XenWatchSubmission,
};

use super::from_api;
use crate::keys;

/// Highlight submissions and the coach review queue.
#[derive(Clone)]
pub struct XenWatchService {
    api: Arc<dyn LockerRoomApi>,
    client: QueryClient,
    me: UserId,
}

impl XenWatchService {
    pub fn new(api: Arc<dyn LockerRoomApi>, client: QueryClient, me: UserId) -> Self {
        Self { api, client, me }
    }

    fn options(&self) -> QueryOptions {
        self.client.config().query_options()
    }

    pub async fn my_submissions(&self) -> LockerRoomResult<Vec<XenWatchSubmission>> {
        self.client
            .fetch_query(
                keys::my_submissions(),
                self.options(),
                from_api(&self.api, |api| async move { api.my_submissions().await }),
            )
            .await
            .map(CacheRead::into_value)
    }

    pub async fn review_queue(&self) -> LockerRoomResult<Vec<XenWatchSubmission>> {
        self.client
            .fetch_query(
                keys::review_queue(),
                self.options(),
                from_api(&self.api, |api| async move { api.review_queue().await }),
            )
            .await
            .map(CacheRead::into_value)
    }

    pub fn watch_review_queue(&self) -> Subscription<Vec<XenWatchSubmission>> {
        self.client.subscribe(
            keys::review_queue(),
            self.options(),
            from_api(&self.api, |api| async move { api.review_queue().await }),
        )
    }

    pub async fn submit(&self, submission: NewSubmission) -> LockerRoomResult<XenWatchSubmission> {
        submission.validate()?;
        let created = self
            .client
            .mutation::<XenWatchSubmission>("submit_highlight")
            .reconcile_with::<Vec<XenWatchSubmission>, _>(
                keys::my_submissions(),
                |before, created| {
                    before.map(|mine| {
                        let mut next = Vec::with_capacity(mine.len() + 1);
                        next.push(created.clone());
                        next.extend(mine.iter().filter(|s| s.id != created.id).cloned());
                        next
                    })
                },
            )
            .execute(self.api.submit_highlight(&submission))
            .await?;
        tracing::info!(submission_id = %created.id, "Submitted highlight");
        Ok(created)
    }

    /// Review a queued submission. The decision shows immediately and is
    /// rolled back if the server refuses it.
    pub async fn review(
        &self,
        submission_id: SubmissionId,
        review: XenWatchReview,
    ) -> LockerRoomResult<XenWatchSubmission> {
        let queue = keys::review_queue();
        let current = self
            .client
            .get_query_data::<Vec<XenWatchSubmission>>(&queue)?
            .and_then(|items| items.into_iter().find(|s| s.id == submission_id))
            .ok_or_else(|| LockerRoomError::not_found("submission"))?;
        let predicted = current.reviewed(self.me, &review)?;

        let reviewed = self
            .client
            .mutation::<XenWatchSubmission>("review_submission")
            .optimistic::<Vec<XenWatchSubmission>, _>(queue.clone(), move |items| {
                items.map(|items| replace(items, &predicted))
            })
            .reconcile_with::<Vec<XenWatchSubmission>, _>(queue, |before, server| {
                before.map(|items| replace(items, server))
            })
            .execute(self.api.review_submission(submission_id, &review))
            .await?;

        tracing::info!(
            submission_id = %reviewed.id,
            status = ?reviewed.status,
            "Reviewed highlight"
        );
        Ok(reviewed)
    }
}

fn replace(items: &[XenWatchSubmission], updated: &XenWatchSubmission) -> Vec<XenWatchSubmission> {
    items
        .iter()
        .map(|s| if s.id == updated.id { updated.clone() } else { s.clone() })
        .collect()
}
