//! LockerRoom Test Utilities
//!
//! Shared test infrastructure for the LockerRoom workspace:
//! - [`MockApi`], an in-memory API with call counting and scripted failures
//! - Proptest generators for domain types
//! - Fixtures for common scenarios
//! - Assertions over the error taxonomy

mod mock;

pub use mock::{MockApi, MockState};

// Re-export core types for convenience
pub use lockerroom_core::{
    AnalyticsDashboard, AnswerValue, ChoiceOptions, EntityIdType, ErrorKind, EvaluationId,
    EvaluationSubmission, EvaluationTemplate, FeedCursor, FeedPage, FieldAnswer, FieldId,
    FieldKind, FormField, LockerRoomApi, LockerRoomError, LockerRoomResult, MediaPost,
    NewEvaluation, NewPost, NewSubmission, Notification, NotificationId, NotificationKind, PostId,
    Profile, ProfileUpdate, Role, Route, Session, SubmissionId, SubmissionStatus, TemplateId,
    Timestamp, UnreadCount, UserId, XenWatchReview, XenWatchSubmission,
};

use chrono::Utc;
use uuid::Uuid;

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for LockerRoom domain types.

    use super::*;
    use proptest::prelude::*;

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        arb_uuid().prop_map(UserId::new)
    }

    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    /// Any route, including the parameterized ones.
    pub fn arb_route() -> impl Strategy<Value = Route> {
        prop_oneof![
            Just(Route::Login),
            Just(Route::Feed),
            Just(Route::MyProfile),
            Just(Route::EditProfile),
            arb_user_id().prop_map(|user_id| Route::Profile { user_id }),
            Just(Route::Notifications),
            Just(Route::MyEvaluations),
            arb_uuid().prop_map(|id| Route::Evaluation {
                evaluation_id: EvaluationId::new(id)
            }),
            proptest::option::of(arb_uuid()).prop_map(|id| Route::TemplateBuilder {
                template_id: id.map(TemplateId::new)
            }),
            Just(Route::TemplateList),
            arb_user_id().prop_map(|user_id| Route::Analytics { user_id }),
            Just(Route::XenWatchSubmit),
            Just(Route::XenWatchMine),
            arb_uuid().prop_map(|id| Route::XenWatchReview {
                submission_id: SubmissionId::new(id)
            }),
            Just(Route::XenWatchQueue),
            Just(Route::SchoolDashboard),
            Just(Route::ScoutDashboard),
            Just(Route::AdminDashboard),
            Just(Route::AdminUsers),
        ]
    }

    pub fn arb_session() -> impl Strategy<Value = Session> {
        (arb_user_id(), arb_role(), "[a-z0-9]{16}")
            .prop_map(|(user_id, role, token)| Session::new(user_id, role, token))
    }

    pub fn arb_notification_kind() -> impl Strategy<Value = NotificationKind> {
        prop_oneof![
            Just(NotificationKind::Like),
            Just(NotificationKind::Comment),
            Just(NotificationKind::Follow),
            Just(NotificationKind::ProfileView),
            Just(NotificationKind::EvaluationAssigned),
            Just(NotificationKind::EvaluationCompleted),
            Just(NotificationKind::XenWatchSubmitted),
            Just(NotificationKind::XenWatchReviewed),
            Just(NotificationKind::System),
        ]
    }

    pub fn arb_notification() -> impl Strategy<Value = Notification> {
        (
            arb_notification_kind(),
            any::<bool>(),
            proptest::option::of(arb_uuid()),
        )
            .prop_map(|(kind, read, subject_id)| Notification {
                id: NotificationId::now_v7(),
                kind,
                message: "Something happened".to_string(),
                read,
                subject_id,
                actor_id: None,
                created_at: Utc::now(),
            })
    }

    /// Non-empty, distinct option lists.
    pub fn arb_options() -> impl Strategy<Value = ChoiceOptions> {
        prop::collection::btree_set("[A-Z][a-z]{2,8}", 1..6)
            .prop_map(|set| ChoiceOptions::new(set.into_iter().collect()))
    }

    /// Field kinds that pass save-time validation.
    pub fn arb_field_kind() -> impl Strategy<Value = FieldKind> {
        prop_oneof![
            Just(FieldKind::text()),
            (2u8..=10).prop_map(FieldKind::rating),
            arb_options().prop_map(FieldKind::single_choice),
            arb_options().prop_map(FieldKind::multi_choice),
            arb_options().prop_map(FieldKind::dropdown),
            Just(FieldKind::numeric()),
            Just(FieldKind::Date),
        ]
    }

    pub fn arb_form_field(order_index: u32) -> impl Strategy<Value = FormField> {
        ("[A-Z][a-z]{2,12}", any::<bool>(), arb_field_kind()).prop_map(
            move |(label, required, kind)| FormField {
                id: FieldId::now_v7(),
                order_index,
                label,
                required,
                help_text: None,
                kind,
            },
        )
    }

    pub fn arb_profile_update() -> impl Strategy<Value = ProfileUpdate> {
        (
            proptest::option::of("[A-Z][a-z]{2,10} [A-Z][a-z]{2,10}"),
            proptest::option::of("[a-z]{4,10}"),
            proptest::option::of(2000u16..2040),
            proptest::option::of("[a-z ]{0,40}"),
        )
            .prop_map(|(display_name, sport, graduation_year, bio)| ProfileUpdate {
                display_name,
                sport,
                graduation_year,
                bio,
                ..ProfileUpdate::default()
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built entities for common test scenarios.

    use super::*;
    use std::collections::BTreeMap;

    pub fn session(role: Role) -> Session {
        Session::new(UserId::now_v7(), role, "test-token")
    }

    pub fn profile(user_id: UserId, role: Role, display_name: &str) -> Profile {
        Profile {
            user_id,
            role,
            display_name: display_name.to_string(),
            sport: Some("basketball".to_string()),
            position: None,
            graduation_year: Some(2027),
            school_id: None,
            bio: None,
            avatar_url: None,
            stats: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn post(author_id: UserId, caption: &str, like_count: u32) -> MediaPost {
        MediaPost {
            id: PostId::now_v7(),
            author_id,
            author_name: "Jordan".to_string(),
            caption: caption.to_string(),
            media: Vec::new(),
            like_count,
            liked_by_me: false,
            comment_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn notification(kind: NotificationKind, read: bool) -> Notification {
        Notification {
            id: NotificationId::now_v7(),
            kind,
            message: "Something happened".to_string(),
            read,
            subject_id: None,
            actor_id: None,
            created_at: Utc::now(),
        }
    }

    /// A two-field template: a required 1..=5 rating and an optional note.
    pub fn template(created_by: UserId) -> EvaluationTemplate {
        EvaluationTemplate {
            id: TemplateId::now_v7(),
            title: "Tryout".to_string(),
            description: None,
            school_id: None,
            fields: vec![
                FormField {
                    id: FieldId::now_v7(),
                    order_index: 0,
                    label: "Speed".to_string(),
                    required: true,
                    help_text: None,
                    kind: FieldKind::rating(5),
                },
                FormField {
                    id: FieldId::now_v7(),
                    order_index: 1,
                    label: "Notes".to_string(),
                    required: false,
                    help_text: None,
                    kind: FieldKind::text(),
                },
            ],
            created_by,
            updated_at: Utc::now(),
        }
    }

    pub fn pending_submission(student_id: UserId, title: &str) -> XenWatchSubmission {
        XenWatchSubmission {
            id: SubmissionId::now_v7(),
            student_id,
            title: title.to_string(),
            media_url: "https://cdn.lockerroom.app/clip.mp4".to_string(),
            notes: None,
            status: SubmissionStatus::Pending,
            feedback: None,
            reviewed_by: None,
            submitted_at: Utc::now(),
            reviewed_at: None,
        }
    }

    /// A mock server where `me` already has a profile.
    pub fn api_with_profile(role: Role) -> MockApi {
        let me = UserId::now_v7();
        let api = MockApi::new(me);
        api.state().profiles.insert(me, profile(me, role, "Jordan Reyes"));
        api
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over `LockerRoomResult`.

    use super::*;

    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &LockerRoomResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    #[track_caller]
    pub fn assert_kind<T: std::fmt::Debug>(result: &LockerRoomResult<T>, kind: ErrorKind) {
        match result {
            Err(err) => assert_eq!(err.kind(), kind, "Wrong error kind for {:?}", err),
            Ok(value) => panic!("Expected {:?} error, got Ok({:?})", kind, value),
        }
    }

    /// Assert a validation error that names `field`.
    #[track_caller]
    pub fn assert_field_error<T: std::fmt::Debug>(result: &LockerRoomResult<T>, field: &str) {
        match result {
            Err(err) => assert!(
                err.field_errors().iter().any(|e| e.field == field),
                "Expected a field error for {field}, got {:?}",
                err
            ),
            Ok(value) => panic!("Expected validation error, got Ok({:?})", value),
        }
    }
}
