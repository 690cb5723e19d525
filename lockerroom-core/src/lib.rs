//! LockerRoom Core - Domain Types
//!
//! Plain data shared by every other crate: identifiers, roles and routes,
//! API entities, and the error taxonomy. The [`LockerRoomApi`] trait also
//! lives here so services and test doubles agree on one seam; no I/O does.

pub mod access;
pub mod api;
pub mod analytics;
pub mod entities;
pub mod error;
pub mod form;
pub mod identity;
pub mod notification;
pub mod options;
pub mod paging;
pub mod xen_watch;

pub use access::{Role, Route, Session};
pub use api::LockerRoomApi;
pub use analytics::{AnalyticsDashboard, FieldAverage, SeriesPoint};
pub use entities::{
    FeedCursor, FeedPage, MediaItem, MediaKind, MediaPost, NewPost, Profile, ProfileUpdate,
};
pub use error::{
    CacheError, ConfigError, ErrorKind, FieldError, LockerRoomError, LockerRoomResult,
};
pub use form::{
    AnswerValue, EvaluationSubmission, EvaluationTemplate, FieldAnswer, FieldKind, FormField,
    NewEvaluation, TemplateDraft,
};
pub use identity::{
    CommentId, EntityIdType, EvaluationId, FieldId, NotificationId, PostId, SchoolId,
    SubmissionId, TemplateId, Timestamp, UserId,
};
pub use notification::{Icon, Notification, NotificationKind, UnreadCount};
pub use options::ChoiceOptions;
pub use paging::Paginated;
pub use xen_watch::{
    NewSubmission, ReviewDecision, SubmissionStatus, XenWatchReview, XenWatchSubmission,
};
