//! Notifications and their kind-specific presentation.
//!
//! Each [`NotificationKind`] maps to an icon and a target route through an
//! exhaustive `match`, so adding a kind is a compile error until both are
//! decided. Unknown kinds coming from the API fail to decode; the client
//! drops those entries at the boundary instead of guessing a default.

use crate::access::Route;
use crate::identity::{
    EntityIdType, EvaluationId, NotificationId, PostId, SubmissionId, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    ProfileView,
    EvaluationAssigned,
    EvaluationCompleted,
    XenWatchSubmitted,
    XenWatchReviewed,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Icon {
    Heart,
    Speech,
    Person,
    Eye,
    Clipboard,
    Check,
    Binoculars,
    Star,
    Bell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default)]
    pub read: bool,
    /// The entity the notification is about: a post, a user, an evaluation
    /// or a submission depending on `kind`.
    #[serde(default)]
    pub subject_id: Option<Uuid>,
    pub actor_id: Option<UserId>,
    pub created_at: Timestamp,
}

impl NotificationKind {
    pub fn icon(&self) -> Icon {
        match self {
            NotificationKind::Like => Icon::Heart,
            NotificationKind::Comment => Icon::Speech,
            NotificationKind::Follow => Icon::Person,
            NotificationKind::ProfileView => Icon::Eye,
            NotificationKind::EvaluationAssigned => Icon::Clipboard,
            NotificationKind::EvaluationCompleted => Icon::Check,
            NotificationKind::XenWatchSubmitted => Icon::Binoculars,
            NotificationKind::XenWatchReviewed => Icon::Star,
            NotificationKind::System => Icon::Bell,
        }
    }
}

impl Notification {
    /// Where activating the notification navigates.
    pub fn route(&self) -> Route {
        let subject = self.subject_id;
        match self.kind {
            NotificationKind::Like | NotificationKind::Comment => Route::Feed,
            NotificationKind::Follow | NotificationKind::ProfileView => {
                match self.actor_id.or_else(|| subject.map(UserId::new)) {
                    Some(user_id) => Route::Profile { user_id },
                    None => Route::Notifications,
                }
            }
            NotificationKind::EvaluationAssigned | NotificationKind::EvaluationCompleted => {
                match subject {
                    Some(id) => Route::Evaluation {
                        evaluation_id: EvaluationId::new(id),
                    },
                    None => Route::MyEvaluations,
                }
            }
            NotificationKind::XenWatchSubmitted => match subject {
                Some(id) => Route::XenWatchReview {
                    submission_id: SubmissionId::new(id),
                },
                None => Route::XenWatchQueue,
            },
            NotificationKind::XenWatchReviewed => Route::XenWatchMine,
            NotificationKind::System => Route::Notifications,
        }
    }

    /// The post this notification refers to, for like/comment kinds.
    pub fn post_id(&self) -> Option<PostId> {
        match self.kind {
            NotificationKind::Like | NotificationKind::Comment => {
                self.subject_id.map(PostId::new)
            }
            _ => None,
        }
    }
}

/// Unread badge count as served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    pub unread: u32,
}
