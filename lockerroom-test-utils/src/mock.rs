//! In-memory API double.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use lockerroom_core::{
    AnalyticsDashboard, EntityIdType, EvaluationId, EvaluationSubmission, EvaluationTemplate,
    FeedCursor, FeedPage, LockerRoomApi, LockerRoomError, LockerRoomResult, MediaPost, NewEvaluation,
    NewPost, NewSubmission, Notification, NotificationId, PostId, Profile, ProfileUpdate,
    SubmissionId, SubmissionStatus, TemplateDraft, TemplateId, UnreadCount, UserId,
    XenWatchReview, XenWatchSubmission,
};

/// Server-side state behind [`MockApi`]. Tests seed and inspect it directly.
#[derive(Debug, Default)]
pub struct MockState {
    pub profiles: HashMap<UserId, Profile>,
    /// Newest first, as the feed endpoint returns them.
    pub posts: Vec<MediaPost>,
    pub notifications: Vec<Notification>,
    pub templates: Vec<EvaluationTemplate>,
    pub evaluations: Vec<EvaluationSubmission>,
    pub submissions: Vec<XenWatchSubmission>,
    pub dashboards: HashMap<UserId, AnalyticsDashboard>,
}

/// A [`LockerRoomApi`] backed by [`MockState`].
///
/// Every call is counted by method name. [`fail_next`](Self::fail_next)
/// scripts failures and [`set_delay`](Self::set_delay) makes every call
/// sleep first, so tests on a paused clock can observe in-flight state.
#[derive(Debug)]
pub struct MockApi {
    me: UserId,
    page_size: usize,
    state: Mutex<MockState>,
    calls: Mutex<HashMap<&'static str, u32>>,
    failures: Mutex<HashMap<&'static str, VecDeque<LockerRoomError>>>,
    delay: Mutex<Option<Duration>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockApi {
    /// A server where `me` is the authenticated actor.
    pub fn new(me: UserId) -> Self {
        Self {
            me,
            page_size: 10,
            state: Mutex::new(MockState::default()),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            delay: Mutex::new(None),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn me(&self) -> UserId {
        self.me
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    /// Number of times `method` has been called.
    pub fn calls(&self, method: &str) -> u32 {
        lock(&self.calls).get(method).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        lock(&self.calls).values().sum()
    }

    /// Make the next call to `method` fail with `error`. Queues if called
    /// repeatedly.
    pub fn fail_next(&self, method: &'static str, error: LockerRoomError) {
        lock(&self.failures).entry(method).or_default().push_back(error);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *lock(&self.delay) = delay;
    }

    async fn enter(&self, method: &'static str) -> LockerRoomResult<()> {
        *lock(&self.calls).entry(method).or_insert(0) += 1;
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = lock(&self.failures)
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LockerRoomApi for MockApi {
    async fn my_profile(&self) -> LockerRoomResult<Profile> {
        self.enter("my_profile").await?;
        self.state()
            .profiles
            .get(&self.me)
            .cloned()
            .ok_or_else(|| LockerRoomError::not_found("profile"))
    }

    async fn profile(&self, user_id: UserId) -> LockerRoomResult<Profile> {
        self.enter("profile").await?;
        self.state()
            .profiles
            .get(&user_id)
            .cloned()
            .ok_or_else(|| LockerRoomError::not_found("profile"))
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> LockerRoomResult<Profile> {
        self.enter("update_profile").await?;
        let mut state = self.state();
        let profile = state
            .profiles
            .get_mut(&self.me)
            .ok_or_else(|| LockerRoomError::not_found("profile"))?;
        let mut next = update.applied_to(profile);
        next.updated_at = Utc::now();
        *profile = next.clone();
        Ok(next)
    }

    async fn feed_page(&self, cursor: Option<&FeedCursor>) -> LockerRoomResult<FeedPage> {
        self.enter("feed_page").await?;
        let start = match cursor {
            Some(FeedCursor(raw)) => raw.parse::<usize>().map_err(|_| {
                LockerRoomError::validation("Invalid cursor", Vec::new())
            })?,
            None => 0,
        };
        let state = self.state();
        let end = (start + self.page_size).min(state.posts.len());
        let posts = state.posts.get(start..end).unwrap_or_default().to_vec();
        let next_cursor = (end < state.posts.len()).then(|| FeedCursor(end.to_string()));
        Ok(FeedPage { posts, next_cursor })
    }

    async fn create_post(&self, post: &NewPost) -> LockerRoomResult<MediaPost> {
        self.enter("create_post").await?;
        let mut state = self.state();
        let author_name = state
            .profiles
            .get(&self.me)
            .map(|p| p.display_name.clone())
            .unwrap_or_default();
        let created = MediaPost {
            id: PostId::now_v7(),
            author_id: self.me,
            author_name,
            caption: post.caption.clone(),
            media: post.media.clone(),
            like_count: 0,
            liked_by_me: false,
            comment_count: 0,
            created_at: Utc::now(),
        };
        state.posts.insert(0, created.clone());
        Ok(created)
    }

    async fn toggle_like(&self, post_id: PostId) -> LockerRoomResult<MediaPost> {
        self.enter("toggle_like").await?;
        let mut state = self.state();
        let post = state
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| LockerRoomError::not_found("post"))?;
        *post = post.with_like_toggled();
        Ok(post.clone())
    }

    async fn delete_post(&self, post_id: PostId) -> LockerRoomResult<()> {
        self.enter("delete_post").await?;
        let mut state = self.state();
        let before = state.posts.len();
        state.posts.retain(|p| p.id != post_id);
        if state.posts.len() == before {
            return Err(LockerRoomError::not_found("post"));
        }
        Ok(())
    }

    async fn notifications(&self) -> LockerRoomResult<Vec<Notification>> {
        self.enter("notifications").await?;
        Ok(self.state().notifications.clone())
    }

    async fn unread_count(&self) -> LockerRoomResult<UnreadCount> {
        self.enter("unread_count").await?;
        let unread = self.state().notifications.iter().filter(|n| !n.read).count();
        Ok(UnreadCount {
            unread: unread as u32,
        })
    }

    async fn mark_read(&self, notification_id: NotificationId) -> LockerRoomResult<()> {
        self.enter("mark_read").await?;
        let mut state = self.state();
        let notification = state
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or_else(|| LockerRoomError::not_found("notification"))?;
        notification.read = true;
        Ok(())
    }

    async fn mark_all_read(&self) -> LockerRoomResult<()> {
        self.enter("mark_all_read").await?;
        for notification in self.state().notifications.iter_mut() {
            notification.read = true;
        }
        Ok(())
    }

    async fn templates(&self) -> LockerRoomResult<Vec<EvaluationTemplate>> {
        self.enter("templates").await?;
        Ok(self.state().templates.clone())
    }

    async fn template(&self, template_id: TemplateId) -> LockerRoomResult<EvaluationTemplate> {
        self.enter("template").await?;
        self.state()
            .templates
            .iter()
            .find(|t| t.id == template_id)
            .cloned()
            .ok_or_else(|| LockerRoomError::not_found("template"))
    }

    async fn create_template(&self, draft: &TemplateDraft) -> LockerRoomResult<EvaluationTemplate> {
        self.enter("create_template").await?;
        let template = EvaluationTemplate {
            id: TemplateId::now_v7(),
            title: draft.title.clone(),
            description: draft.description.clone(),
            school_id: None,
            fields: draft.fields.clone(),
            created_by: self.me,
            updated_at: Utc::now(),
        };
        self.state().templates.push(template.clone());
        Ok(template)
    }

    async fn update_template(
        &self,
        template_id: TemplateId,
        draft: &TemplateDraft,
    ) -> LockerRoomResult<EvaluationTemplate> {
        self.enter("update_template").await?;
        let mut state = self.state();
        let template = state
            .templates
            .iter_mut()
            .find(|t| t.id == template_id)
            .ok_or_else(|| LockerRoomError::not_found("template"))?;
        template.title = draft.title.clone();
        template.description = draft.description.clone();
        template.fields = draft.fields.clone();
        template.updated_at = Utc::now();
        Ok(template.clone())
    }

    async fn delete_template(&self, template_id: TemplateId) -> LockerRoomResult<()> {
        self.enter("delete_template").await?;
        let mut state = self.state();
        let before = state.templates.len();
        state.templates.retain(|t| t.id != template_id);
        if state.templates.len() == before {
            return Err(LockerRoomError::not_found("template"));
        }
        Ok(())
    }

    async fn my_evaluations(&self) -> LockerRoomResult<Vec<EvaluationSubmission>> {
        self.enter("my_evaluations").await?;
        Ok(self
            .state()
            .evaluations
            .iter()
            .filter(|e| e.student_id == self.me || e.evaluator_id == self.me)
            .cloned()
            .collect())
    }

    async fn evaluation(&self, evaluation_id: EvaluationId) -> LockerRoomResult<EvaluationSubmission> {
        self.enter("evaluation").await?;
        self.state()
            .evaluations
            .iter()
            .find(|e| e.id == evaluation_id)
            .cloned()
            .ok_or_else(|| LockerRoomError::not_found("evaluation"))
    }

    async fn submit_evaluation(
        &self,
        evaluation: &NewEvaluation,
    ) -> LockerRoomResult<EvaluationSubmission> {
        self.enter("submit_evaluation").await?;
        let submission = EvaluationSubmission {
            id: EvaluationId::now_v7(),
            template_id: evaluation.template_id,
            student_id: evaluation.student_id,
            evaluator_id: self.me,
            answers: evaluation.answers.clone(),
            submitted_at: Utc::now(),
        };
        self.state().evaluations.push(submission.clone());
        Ok(submission)
    }

    async fn dashboard(&self, user_id: UserId) -> LockerRoomResult<AnalyticsDashboard> {
        self.enter("dashboard").await?;
        Ok(self
            .state()
            .dashboards
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| AnalyticsDashboard {
                user_id,
                profile_views: 0,
                engagement: Vec::new(),
                evaluation_averages: Vec::new(),
                generated_at: Utc::now(),
            }))
    }

    async fn my_submissions(&self) -> LockerRoomResult<Vec<XenWatchSubmission>> {
        self.enter("my_submissions").await?;
        Ok(self
            .state()
            .submissions
            .iter()
            .filter(|s| s.student_id == self.me)
            .cloned()
            .collect())
    }

    async fn review_queue(&self) -> LockerRoomResult<Vec<XenWatchSubmission>> {
        self.enter("review_queue").await?;
        Ok(self
            .state()
            .submissions
            .iter()
            .filter(|s| s.status == SubmissionStatus::Pending)
            .cloned()
            .collect())
    }

    async fn submit_highlight(
        &self,
        submission: &NewSubmission,
    ) -> LockerRoomResult<XenWatchSubmission> {
        self.enter("submit_highlight").await?;
        submission.validate()?;
        let created = XenWatchSubmission {
            id: SubmissionId::now_v7(),
            student_id: self.me,
            title: submission.title.trim().to_string(),
            media_url: submission.media_url.trim().to_string(),
            notes: submission.notes.clone(),
            status: SubmissionStatus::Pending,
            feedback: None,
            reviewed_by: None,
            submitted_at: Utc::now(),
            reviewed_at: None,
        };
        self.state().submissions.insert(0, created.clone());
        Ok(created)
    }

    async fn review_submission(
        &self,
        submission_id: SubmissionId,
        review: &XenWatchReview,
    ) -> LockerRoomResult<XenWatchSubmission> {
        self.enter("review_submission").await?;
        let mut state = self.state();
        let submission = state
            .submissions
            .iter_mut()
            .find(|s| s.id == submission_id)
            .ok_or_else(|| LockerRoomError::not_found("submission"))?;
        let reviewed = submission.reviewed(self.me, review)?;
        *submission = reviewed.clone();
        Ok(reviewed)
    }
}
