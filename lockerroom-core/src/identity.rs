//! Identity types for LockerRoom entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common behaviour for strongly-typed entity identifiers.
///
/// Every identifier wraps a UUIDv7 so IDs sort by creation time.
pub trait EntityIdType: Copy + Eq + std::hash::Hash + fmt::Display {
    /// Short lowercase name used in query keys and log fields.
    const KIND: &'static str;

    fn new(uuid: Uuid) -> Self;

    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh timestamp-sortable identifier.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    fn nil() -> Self {
        Self::new(Uuid::nil())
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            const KIND: &'static str = $kind;

            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

entity_id!(
    /// Account identifier shared by every role.
    UserId,
    "user"
);
entity_id!(SchoolId, "school");
entity_id!(PostId, "post");
entity_id!(CommentId, "comment");
entity_id!(NotificationId, "notification");
entity_id!(
    /// Evaluation template identifier.
    TemplateId,
    "template"
);
entity_id!(
    /// Stable identity of a form field. Survives reordering.
    FieldId,
    "field"
);
entity_id!(EvaluationId, "evaluation");
entity_id!(
    /// Xen Watch scouting submission identifier.
    SubmissionId,
    "submission"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_uuid() {
        let id = PostId::now_v7();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));

        let back: PostId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(UserId::KIND, "user");
        assert_eq!(SubmissionId::KIND, "submission");
        assert_eq!(FieldId::nil().as_uuid(), Uuid::nil());
    }
}
