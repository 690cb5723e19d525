//! The LockerRoom REST API as seen by the client.
//!
//! [`LockerRoomApi`] is the seam between resource services and the network.
//! The production implementation is `RestClient` in `lockerroom-client`;
//! tests use the scripted `MockApi` from `lockerroom-test-utils`.

use crate::analytics::AnalyticsDashboard;
use crate::entities::{FeedCursor, FeedPage, MediaPost, NewPost, Profile, ProfileUpdate};
use crate::error::LockerRoomResult;
use crate::form::{EvaluationSubmission, EvaluationTemplate, NewEvaluation, TemplateDraft};
use crate::identity::{EvaluationId, NotificationId, PostId, SubmissionId, TemplateId, UserId};
use crate::notification::{Notification, UnreadCount};
use crate::xen_watch::{NewSubmission, XenWatchReview, XenWatchSubmission};

/// Every call the client makes against the API.
///
/// Calls act on behalf of the authenticated actor; "my" calls resolve the
/// actor from the bearer token. Implementations map HTTP failures onto the
/// `LockerRoomError` taxonomy.
#[async_trait::async_trait]
pub trait LockerRoomApi: Send + Sync {
    // Profiles

    /// The actor's own profile. `NotFound` until one has been created.
    async fn my_profile(&self) -> LockerRoomResult<Profile>;

    async fn profile(&self, user_id: UserId) -> LockerRoomResult<Profile>;

    async fn update_profile(&self, update: &ProfileUpdate) -> LockerRoomResult<Profile>;

    // Feed

    /// One page of the media feed. `None` requests the newest page.
    async fn feed_page(&self, cursor: Option<&FeedCursor>) -> LockerRoomResult<FeedPage>;

    async fn create_post(&self, post: &NewPost) -> LockerRoomResult<MediaPost>;

    /// Flip the actor's like on a post and return the updated post.
    async fn toggle_like(&self, post_id: PostId) -> LockerRoomResult<MediaPost>;

    async fn delete_post(&self, post_id: PostId) -> LockerRoomResult<()>;

    // Notifications

    async fn notifications(&self) -> LockerRoomResult<Vec<Notification>>;

    async fn unread_count(&self) -> LockerRoomResult<UnreadCount>;

    async fn mark_read(&self, notification_id: NotificationId) -> LockerRoomResult<()>;

    async fn mark_all_read(&self) -> LockerRoomResult<()>;

    // Evaluations

    async fn templates(&self) -> LockerRoomResult<Vec<EvaluationTemplate>>;

    async fn template(&self, template_id: TemplateId) -> LockerRoomResult<EvaluationTemplate>;

    async fn create_template(&self, draft: &TemplateDraft) -> LockerRoomResult<EvaluationTemplate>;

    async fn update_template(
        &self,
        template_id: TemplateId,
        draft: &TemplateDraft,
    ) -> LockerRoomResult<EvaluationTemplate>;

    async fn delete_template(&self, template_id: TemplateId) -> LockerRoomResult<()>;

    /// Evaluations about the actor (students) or written by them (staff).
    async fn my_evaluations(&self) -> LockerRoomResult<Vec<EvaluationSubmission>>;

    async fn evaluation(&self, evaluation_id: EvaluationId)
        -> LockerRoomResult<EvaluationSubmission>;

    async fn submit_evaluation(
        &self,
        evaluation: &NewEvaluation,
    ) -> LockerRoomResult<EvaluationSubmission>;

    // Analytics

    async fn dashboard(&self, user_id: UserId) -> LockerRoomResult<AnalyticsDashboard>;

    // Xen Watch

    async fn my_submissions(&self) -> LockerRoomResult<Vec<XenWatchSubmission>>;

    /// Submissions awaiting review, for scouts and system admins.
    async fn review_queue(&self) -> LockerRoomResult<Vec<XenWatchSubmission>>;

    async fn submit_highlight(&self, submission: &NewSubmission)
        -> LockerRoomResult<XenWatchSubmission>;

    async fn review_submission(
        &self,
        submission_id: SubmissionId,
        review: &XenWatchReview,
    ) -> LockerRoomResult<XenWatchSubmission>;
}
