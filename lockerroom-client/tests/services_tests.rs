//! End-to-end service scenarios against the in-memory API.
//!
//! Every test runs on a paused clock; `MockApi::set_delay` keeps a write in
//! flight long enough to observe the optimistic state.

use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

use futures_util::poll;
use lockerroom_cache::{CacheConfig, PageOutcome, QueryClient, RetryPolicy};
use lockerroom_client::{field_locations, Access, LockerRoom};
use lockerroom_forms::FormBuilder;
use lockerroom_test_utils::assertions::{assert_field_error, assert_kind};
use lockerroom_test_utils::fixtures;
use lockerroom_test_utils::{
    AnswerValue, ChoiceOptions, EntityIdType, ErrorKind, FieldAnswer, FieldKind, LockerRoomApi,
    LockerRoomError, MockApi, NewEvaluation, NotificationKind, Role, Session, SubmissionStatus,
    UserId, XenWatchReview,
};

const POLL: Duration = Duration::from_secs(30);

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

async fn advance(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}

fn connect(api: &Arc<MockApi>, role: Role) -> LockerRoom {
    let session = Session::new(api.me(), role, "test-token");
    let config = CacheConfig::new()
        .with_stale_time(Duration::from_secs(60))
        .with_retry(RetryPolicy::none());
    let client = QueryClient::new(config);
    let dyn_api: Arc<dyn LockerRoomApi> = api.clone();
    LockerRoom::new(dyn_api, client, &session, POLL)
}

fn seeded_feed(role: Role, posts: usize) -> Arc<MockApi> {
    let api = fixtures::api_with_profile(role).with_page_size(2);
    let me = api.me();
    {
        let mut state = api.state();
        for i in 0..posts {
            state
                .posts
                .push(fixtures::post(me, &format!("clip {i}"), 5));
        }
    }
    Arc::new(api)
}

// ============================================================================
// Feed
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_failed_like_rolls_back() {
    let api = seeded_feed(Role::Student, 3);
    let app = connect(&api, Role::Student);
    let feed = app.feed.load_first_page().await.unwrap();
    let post_id = feed.pages[0].posts[0].id;

    api.set_delay(Some(Duration::from_secs(1)));
    api.fail_next("toggle_like", LockerRoomError::transport("offline"));

    let toggle = app.feed.toggle_like(post_id);
    tokio::pin!(toggle);
    assert!(matches!(poll!(&mut toggle), Poll::Pending));

    let predicted = app.feed.cached_post(post_id).unwrap().unwrap();
    assert!(predicted.liked_by_me);
    assert_eq!(predicted.like_count, 6);

    assert!(toggle.await.is_err());
    let restored = app.feed.cached_post(post_id).unwrap().unwrap();
    assert!(!restored.liked_by_me);
    assert_eq!(restored.like_count, 5);
}

#[tokio::test(start_paused = true)]
async fn test_server_like_count_wins() {
    let api = seeded_feed(Role::Student, 2);
    let app = connect(&api, Role::Student);
    let feed = app.feed.load_first_page().await.unwrap();
    let post_id = feed.pages[0].posts[0].id;

    // Others liked the post since the page loaded.
    api.state().posts[0].like_count = 9;

    let server = app.feed.toggle_like(post_id).await.unwrap();
    assert_eq!(server.like_count, 10);
    let cached = app.feed.cached_post(post_id).unwrap().unwrap();
    assert_eq!(cached, server);
}

#[tokio::test(start_paused = true)]
async fn test_feed_pages_until_exhausted() {
    let api = seeded_feed(Role::Student, 5);
    let app = connect(&api, Role::Student);
    app.feed.load_first_page().await.unwrap();

    assert_eq!(app.feed.load_next_page().await.unwrap(), PageOutcome::Appended);
    assert_eq!(app.feed.load_next_page().await.unwrap(), PageOutcome::Appended);
    assert_eq!(app.feed.load_next_page().await.unwrap(), PageOutcome::Exhausted);

    let feed = app.feed.load_first_page().await.unwrap();
    assert_eq!(feed.page_count(), 3);
    let captions: Vec<_> = feed
        .pages
        .iter()
        .flat_map(|p| p.posts.iter().map(|post| post.caption.clone()))
        .collect();
    assert_eq!(captions, ["clip 0", "clip 1", "clip 2", "clip 3", "clip 4"]);
}

#[tokio::test(start_paused = true)]
async fn test_empty_post_is_rejected_locally() {
    let api = seeded_feed(Role::Student, 0);
    let app = connect(&api, Role::Student);
    let result = app
        .feed
        .create_post(lockerroom_test_utils::NewPost {
            caption: "   ".to_string(),
            media: Vec::new(),
        })
        .await;
    assert_field_error(&result, "caption");
    assert_eq!(api.calls("create_post"), 0);
}

// ============================================================================
// Profiles
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_missing_profile_is_an_empty_state() {
    let api = Arc::new(MockApi::new(UserId::now_v7()));
    let app = connect(&api, Role::Student);
    assert_eq!(app.profiles.my_profile().await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn test_profile_update_shows_immediately() {
    let api = Arc::new(fixtures::api_with_profile(Role::Student));
    let app = connect(&api, Role::Student);
    app.profiles.my_profile().await.unwrap();

    api.set_delay(Some(Duration::from_secs(1)));
    let update = lockerroom_test_utils::ProfileUpdate {
        display_name: Some("J. Reyes".to_string()),
        ..Default::default()
    };
    let save = app.profiles.update_profile(update);
    tokio::pin!(save);
    assert!(matches!(poll!(&mut save), Poll::Pending));

    let shown = app.profiles.profile(api.me()).await.unwrap();
    assert_eq!(shown.display_name, "J. Reyes");

    let saved = save.await.unwrap();
    assert_eq!(saved.display_name, "J. Reyes");
    assert_eq!(api.calls("update_profile"), 1);
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unread_polling_stops_on_drop() {
    let api = Arc::new(fixtures::api_with_profile(Role::Student));
    api.state().notifications = vec![
        fixtures::notification(NotificationKind::Like, false),
        fixtures::notification(NotificationKind::Follow, false),
    ];
    let app = connect(&api, Role::Student);

    let mut unread = app.notifications.watch_unread();
    assert_eq!(unread.wait_for_value().await.unwrap().unread, 2);
    assert_eq!(api.calls("unread_count"), 1);

    api.state().notifications[0].read = true;
    advance(POLL).await;
    assert_eq!(api.calls("unread_count"), 2);
    assert_eq!(unread.value().unwrap().map(|c| c.unread), Some(1));

    drop(unread);
    advance(POLL * 10).await;
    assert_eq!(api.calls("unread_count"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_mark_read_only_decrements_for_unread_items() {
    let api = Arc::new(fixtures::api_with_profile(Role::Student));
    let unread_item = fixtures::notification(NotificationKind::Comment, false);
    let read_item = fixtures::notification(NotificationKind::Like, true);
    api.state().notifications = vec![unread_item.clone(), read_item.clone()];
    let app = connect(&api, Role::Student);
    app.notifications.list().await.unwrap();
    assert_eq!(app.notifications.unread_count().await.unwrap(), 1);

    app.notifications.mark_read(read_item.id).await.unwrap();
    let count = app
        .client()
        .get_query_data::<lockerroom_test_utils::UnreadCount>(&lockerroom_client::keys::unread_count())
        .unwrap();
    assert_eq!(count.map(|c| c.unread), Some(1));

    let route = app.notifications.open(&unread_item).await.unwrap();
    assert_eq!(route, unread_item.route());
    let count = app
        .client()
        .get_query_data::<lockerroom_test_utils::UnreadCount>(&lockerroom_client::keys::unread_count())
        .unwrap();
    assert_eq!(count.map(|c| c.unread), Some(0));
    assert!(api.state().notifications.iter().all(|n| n.read));
}

// ============================================================================
// Evaluations
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_empty_dropdown_is_never_sent() {
    let api = Arc::new(fixtures::api_with_profile(Role::SchoolAdmin));
    let app = connect(&api, Role::SchoolAdmin);

    let mut builder = FormBuilder::new("Combine");
    builder.add_field("Speed", FieldKind::rating(5));
    builder.add_field("Position", FieldKind::dropdown(ChoiceOptions::default()));

    let result = app.evaluations.save_template(None, &builder).await;
    assert_kind(&result, ErrorKind::Validation);
    assert_eq!(api.total_calls(), 0);

    let err = result.unwrap_err();
    let locations = field_locations(&err);
    assert_eq!(locations[0].0.field_index, 1);
}

#[tokio::test(start_paused = true)]
async fn test_saved_template_joins_cached_list() {
    let api = Arc::new(fixtures::api_with_profile(Role::SchoolAdmin));
    let app = connect(&api, Role::SchoolAdmin);
    assert!(app.evaluations.templates().await.unwrap().is_empty());

    let mut builder = FormBuilder::new("Combine");
    builder.add_field("Speed", FieldKind::rating(5));
    let saved = app.evaluations.save_template(None, &builder).await.unwrap();

    let listed = app.evaluations.templates().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, saved.id);
    assert_eq!(api.calls("templates"), 1);

    let mut editor = app.evaluations.builder_for(saved.id).await.unwrap();
    assert_eq!(api.calls("template"), 0);
    editor.set_title("Spring combine");
    let renamed = app
        .evaluations
        .save_template(Some(saved.id), &editor)
        .await
        .unwrap();
    assert_eq!(renamed.title, "Spring combine");
    assert_eq!(app.evaluations.templates().await.unwrap()[0].title, "Spring combine");
}

#[tokio::test(start_paused = true)]
async fn test_submission_is_checked_against_template() {
    let api = Arc::new(fixtures::api_with_profile(Role::SchoolAdmin));
    let template = fixtures::template(api.me());
    api.state().templates.push(template.clone());
    let app = connect(&api, Role::SchoolAdmin);
    let student = UserId::now_v7();

    let missing = NewEvaluation {
        template_id: template.id,
        student_id: student,
        answers: Vec::new(),
    };
    let result = app.evaluations.submit_evaluation(missing).await;
    assert_field_error(&result, &template.fields[0].id.to_string());
    assert_eq!(api.calls("submit_evaluation"), 0);

    app.evaluations.my_evaluations().await.unwrap();
    let complete = NewEvaluation {
        template_id: template.id,
        student_id: student,
        answers: vec![FieldAnswer {
            field_id: template.fields[0].id,
            value: AnswerValue::Rating(4),
        }],
    };
    let submitted = app.evaluations.submit_evaluation(complete).await.unwrap();
    let mine = app.evaluations.my_evaluations().await.unwrap();
    assert_eq!(mine.iter().map(|e| e.id).collect::<Vec<_>>(), [submitted.id]);
}

// ============================================================================
// Xen Watch
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_refused_review_restores_queue() {
    let api = Arc::new(fixtures::api_with_profile(Role::Scout));
    let submission = fixtures::pending_submission(UserId::now_v7(), "Buzzer beater");
    api.state().submissions.push(submission.clone());
    let app = connect(&api, Role::Scout);
    app.xen_watch.review_queue().await.unwrap();

    api.set_delay(Some(Duration::from_secs(1)));
    api.fail_next(
        "review_submission",
        LockerRoomError::Conflict {
            message: "Already reviewed".to_string(),
        },
    );
    let review = app
        .xen_watch
        .review(submission.id, XenWatchReview::approve(None));
    tokio::pin!(review);
    assert!(matches!(poll!(&mut review), Poll::Pending));
    let shown = app.xen_watch.review_queue().await.unwrap();
    assert_eq!(shown[0].status, SubmissionStatus::Approved);

    assert_kind(&review.await, ErrorKind::Conflict);
    let restored = app.xen_watch.review_queue().await.unwrap();
    assert_eq!(restored[0].status, SubmissionStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn test_rejection_requires_feedback_before_dispatch() {
    let api = Arc::new(fixtures::api_with_profile(Role::Scout));
    let submission = fixtures::pending_submission(UserId::now_v7(), "Block");
    api.state().submissions.push(submission.clone());
    let app = connect(&api, Role::Scout);
    app.xen_watch.review_queue().await.unwrap();

    let result = app
        .xen_watch
        .review(submission.id, XenWatchReview::reject("  "))
        .await;
    assert_field_error(&result, "feedback");
    assert_eq!(api.calls("review_submission"), 0);
}

// ============================================================================
// Session
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_expired_session_redirects_and_sign_out_clears() {
    let api = Arc::new(fixtures::api_with_profile(Role::Student));
    let app = connect(&api, Role::Student);
    app.profiles.my_profile().await.unwrap();
    assert!(!app.client().keys().is_empty());

    api.fail_next("notifications", LockerRoomError::Unauthorized);
    let err = app.notifications.list().await.unwrap_err();
    assert_eq!(Access::for_error(&err), Some(Access::RedirectToLogin));

    app.sign_out();
    assert!(app.client().keys().is_empty());
}
