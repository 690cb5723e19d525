//! Query keys for every cached resource.
//!
//! Keys share a first part per resource family so one prefix invalidates
//! the whole family, e.g. [`all_notifications`] reaches both the list and
//! the unread badge.

use lockerroom_cache::QueryKey;
use lockerroom_core::{EvaluationId, TemplateId, UserId};

pub fn profile(user_id: UserId) -> QueryKey {
    QueryKey::new("profile").id(user_id)
}

pub fn feed() -> QueryKey {
    QueryKey::new("feed")
}

pub fn all_notifications() -> QueryKey {
    QueryKey::new("notifications")
}

pub fn notifications() -> QueryKey {
    all_notifications().name("list")
}

pub fn unread_count() -> QueryKey {
    all_notifications().name("unread")
}

pub fn templates() -> QueryKey {
    QueryKey::new("templates").name("list")
}

pub fn template(template_id: TemplateId) -> QueryKey {
    QueryKey::new("templates").id(template_id)
}

pub fn my_evaluations() -> QueryKey {
    QueryKey::new("evaluations").name("mine")
}

pub fn evaluation(evaluation_id: EvaluationId) -> QueryKey {
    QueryKey::new("evaluations").id(evaluation_id)
}

pub fn analytics(user_id: UserId) -> QueryKey {
    QueryKey::new("analytics").id(user_id)
}

pub fn all_xen_watch() -> QueryKey {
    QueryKey::new("xen_watch")
}

pub fn my_submissions() -> QueryKey {
    all_xen_watch().name("mine")
}

pub fn review_queue() -> QueryKey {
    all_xen_watch().name("queue")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockerroom_core::EntityIdType;

    #[test]
    fn test_family_prefixes() {
        assert!(notifications().starts_with(&all_notifications()));
        assert!(unread_count().starts_with(&all_notifications()));
        assert!(review_queue().starts_with(&all_xen_watch()));
        assert!(!templates().starts_with(&my_evaluations()));
    }

    #[test]
    fn test_ids_distinguish_keys() {
        let a = UserId::now_v7();
        let b = UserId::now_v7();
        assert_ne!(profile(a), profile(b));
        assert_eq!(analytics(a), analytics(a));
    }
}
