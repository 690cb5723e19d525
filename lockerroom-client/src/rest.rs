//! REST implementation of [`LockerRoomApi`].

use async_trait::async_trait;
use lockerroom_core::{
    AnalyticsDashboard, EntityIdType, EvaluationId, EvaluationSubmission, EvaluationTemplate,
    FeedCursor, FeedPage, LockerRoomApi, LockerRoomResult, MediaPost,
    NewEvaluation, NewPost, NewSubmission, Notification, NotificationId, PostId, Profile,
    ProfileUpdate, SubmissionId, TemplateDraft, TemplateId, UnreadCount, UserId, XenWatchReview,
    XenWatchSubmission,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::{status_error, ClientError};

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    auth_header: HeaderMap,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Self::with_client(client, &config.api_base_url, &config.auth.bearer_token)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        bearer_token: &str,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: build_auth_headers(bearer_token)?,
        })
    }

    /// Same connection pool, different actor.
    pub fn with_token(&self, bearer_token: &str) -> Result<Self, ClientError> {
        Ok(Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            auth_header: build_auth_headers(bearer_token)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> LockerRoomResult<T> {
        self.send::<T, ()>(Method::GET, path, &[], None).await
    }

    async fn send<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> LockerRoomResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.request(method, path, query, body).await?;
        let value = response.json::<T>().await.map_err(ClientError::from)?;
        Ok(value)
    }

    /// For endpoints that answer with no body.
    async fn send_empty(&self, method: Method, path: &str) -> LockerRoomResult<()> {
        self.request::<()>(method, path, &[], None).await.map(|_| ())
    }

    /// Issue the request and map any non-success status. Returns the
    /// successful response unread.
    async fn request<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> LockerRoomResult<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .client
            .request(method.clone(), url)
            .headers(self.auth_header.clone());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(ClientError::from)?;
        let status = response.status();
        if status.is_success() {
            tracing::trace!(%method, path, status = status.as_u16(), "Request succeeded");
            return Ok(response);
        }

        let text = response.text().await.map_err(ClientError::from)?;
        let err = status_error(status.as_u16(), resource_name(path), &text);
        if err.is_expected() || err.requires_reauth() {
            tracing::debug!(%method, path, status = status.as_u16(), "Request rejected");
        } else {
            tracing::warn!(%method, path, status = status.as_u16(), error = %err, "Request failed");
        }
        Err(err)
    }
}

fn build_auth_headers(bearer_token: &str) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    let value = format!("Bearer {}", bearer_token);
    let mut value =
        HeaderValue::from_str(&value).map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
    value.set_sensitive(true);
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}

/// Human name of what `path` refers to, for not-found messages.
fn resource_name(path: &str) -> &'static str {
    if path.starts_with("/api/profiles") {
        "Profile"
    } else if path.starts_with("/api/posts") {
        "Post"
    } else if path.starts_with("/api/notifications") {
        "Notification"
    } else if path.starts_with("/api/evaluation-templates") {
        "Evaluation template"
    } else if path.starts_with("/api/evaluations") {
        "Evaluation"
    } else if path.starts_with("/api/analytics") {
        "Analytics"
    } else if path.starts_with("/api/xen-watch") {
        "Submission"
    } else {
        "Resource"
    }
}

/// Decode a notification list item by item. Items of a kind this client
/// does not know are dropped rather than failing the whole list.
pub fn decode_notifications(items: Vec<serde_json::Value>) -> Vec<Notification> {
    let total = items.len();
    let decoded: Vec<Notification> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Notification>(item) {
            Ok(notification) => Some(notification),
            Err(err) => {
                tracing::warn!(error = %err, "Dropping undecodable notification");
                None
            }
        })
        .collect();
    if decoded.len() < total {
        tracing::debug!(total, kept = decoded.len(), "Filtered notification list");
    }
    decoded
}

#[async_trait]
impl LockerRoomApi for RestClient {
    async fn my_profile(&self) -> LockerRoomResult<Profile> {
        self.get_json("/api/profiles/me").await
    }

    async fn profile(&self, user_id: UserId) -> LockerRoomResult<Profile> {
        let path = format!("/api/profiles/{}", user_id.as_uuid());
        self.get_json(&path).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> LockerRoomResult<Profile> {
        self.send(Method::PATCH, "/api/profiles/me", &[], Some(update))
            .await
    }

    async fn feed_page(&self, cursor: Option<&FeedCursor>) -> LockerRoomResult<FeedPage> {
        let query: Vec<(&str, &str)> = cursor
            .map(|cursor| ("cursor", cursor.0.as_str()))
            .into_iter()
            .collect();
        self.send::<_, ()>(Method::GET, "/api/posts", &query, None)
            .await
    }

    async fn create_post(&self, post: &NewPost) -> LockerRoomResult<MediaPost> {
        self.send(Method::POST, "/api/posts", &[], Some(post)).await
    }

    async fn toggle_like(&self, post_id: PostId) -> LockerRoomResult<MediaPost> {
        let path = format!("/api/posts/{}/like", post_id.as_uuid());
        self.send::<_, ()>(Method::POST, &path, &[], None).await
    }

    async fn delete_post(&self, post_id: PostId) -> LockerRoomResult<()> {
        let path = format!("/api/posts/{}", post_id.as_uuid());
        self.send_empty(Method::DELETE, &path).await
    }

    async fn notifications(&self) -> LockerRoomResult<Vec<Notification>> {
        let items: Vec<serde_json::Value> =
            self.get_json("/api/notifications").await?;
        Ok(decode_notifications(items))
    }

    async fn unread_count(&self) -> LockerRoomResult<UnreadCount> {
        self.get_json("/api/notifications/unread-count").await
    }

    async fn mark_read(&self, notification_id: NotificationId) -> LockerRoomResult<()> {
        let path = format!("/api/notifications/{}/read", notification_id.as_uuid());
        self.send_empty(Method::PATCH, &path).await
    }

    async fn mark_all_read(&self) -> LockerRoomResult<()> {
        self.send_empty(Method::POST, "/api/notifications/read-all")
            .await
    }

    async fn templates(&self) -> LockerRoomResult<Vec<EvaluationTemplate>> {
        self.get_json("/api/evaluation-templates").await
    }

    async fn template(&self, template_id: TemplateId) -> LockerRoomResult<EvaluationTemplate> {
        let path = format!("/api/evaluation-templates/{}", template_id.as_uuid());
        self.get_json(&path).await
    }

    async fn create_template(&self, draft: &TemplateDraft) -> LockerRoomResult<EvaluationTemplate> {
        self.send(Method::POST, "/api/evaluation-templates", &[], Some(draft))
            .await
    }

    async fn update_template(
        &self,
        template_id: TemplateId,
        draft: &TemplateDraft,
    ) -> LockerRoomResult<EvaluationTemplate> {
        let path = format!("/api/evaluation-templates/{}", template_id.as_uuid());
        self.send(Method::PUT, &path, &[], Some(draft)).await
    }

    async fn delete_template(&self, template_id: TemplateId) -> LockerRoomResult<()> {
        let path = format!("/api/evaluation-templates/{}", template_id.as_uuid());
        self.send_empty(Method::DELETE, &path).await
    }

    async fn my_evaluations(&self) -> LockerRoomResult<Vec<EvaluationSubmission>> {
        self.get_json("/api/evaluations").await
    }

    async fn evaluation(
        &self,
        evaluation_id: EvaluationId,
    ) -> LockerRoomResult<EvaluationSubmission> {
        let path = format!("/api/evaluations/{}", evaluation_id.as_uuid());
        self.get_json(&path).await
    }

    async fn submit_evaluation(
        &self,
        evaluation: &NewEvaluation,
    ) -> LockerRoomResult<EvaluationSubmission> {
        self.send(Method::POST, "/api/evaluations", &[], Some(evaluation))
            .await
    }

    async fn dashboard(&self, user_id: UserId) -> LockerRoomResult<AnalyticsDashboard> {
        let path = format!("/api/analytics/{}", user_id.as_uuid());
        self.get_json(&path).await
    }

    async fn my_submissions(&self) -> LockerRoomResult<Vec<XenWatchSubmission>> {
        self.get_json("/api/xen-watch/submissions/mine").await
    }

    async fn review_queue(&self) -> LockerRoomResult<Vec<XenWatchSubmission>> {
        self.send::<_, ()>(
            Method::GET,
            "/api/xen-watch/submissions",
            &[("status", "pending")],
            None,
        )
        .await
    }

    async fn submit_highlight(
        &self,
        submission: &NewSubmission,
    ) -> LockerRoomResult<XenWatchSubmission> {
        self.send(Method::POST, "/api/xen-watch/submissions", &[], Some(submission))
            .await
    }

    async fn review_submission(
        &self,
        submission_id: SubmissionId,
        review: &XenWatchReview,
    ) -> LockerRoomResult<XenWatchSubmission> {
        let path = format!("/api/xen-watch/submissions/{}/review", submission_id.as_uuid());
        self.send(Method::POST, &path, &[], Some(review)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockerroom_core::NotificationKind;
    use serde_json::json;

    #[test]
    fn test_unknown_notification_kinds_are_dropped() {
        let id = NotificationId::now_v7();
        let items = vec![
            json!({
                "id": id,
                "kind": "like",
                "message": "Sam liked your post",
                "actor_id": null,
                "created_at": "2026-03-01T12:00:00Z"
            }),
            json!({
                "id": NotificationId::now_v7(),
                "kind": "birthday",
                "message": "?",
                "actor_id": null,
                "created_at": "2026-03-01T12:00:00Z"
            }),
        ];
        let decoded = decode_notifications(items);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].id, id);
        assert_eq!(decoded[0].kind, NotificationKind::Like);
        assert!(!decoded[0].read);
    }

    #[test]
    fn test_resource_names() {
        assert_eq!(resource_name("/api/profiles/me"), "Profile");
        assert_eq!(resource_name("/api/evaluation-templates/1"), "Evaluation template");
        assert_eq!(resource_name("/api/evaluations/1"), "Evaluation");
        assert_eq!(resource_name("/health"), "Resource");
    }

    #[test]
    fn test_base_url_is_normalized() {
        let rest =
            RestClient::with_client(reqwest::Client::new(), "https://api.lockerroom.app/", "t")
                .unwrap();
        assert_eq!(rest.base_url(), "https://api.lockerroom.app");
        assert!(RestClient::with_client(reqwest::Client::new(), "x", "bad\ntoken").is_err());
    }
}
