//! Xen Watch scouting submissions.
//!
//! Students submit highlight media for scout review. A submission is
//! decided exactly once; a rejection must carry feedback.

use crate::error::{FieldError, LockerRoomError, LockerRoomResult};
use crate::identity::{SubmissionId, Timestamp, UserId};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn is_decided(&self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XenWatchSubmission {
    pub id: SubmissionId,
    pub student_id: UserId,
    pub title: String,
    pub media_url: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<UserId>,
    pub submitted_at: Timestamp,
    #[serde(default)]
    pub reviewed_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubmission {
    pub title: String,
    pub media_url: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewSubmission {
    pub fn validate(&self) -> LockerRoomResult<()> {
        let mut fields = Vec::new();
        if self.title.trim().is_empty() {
            fields.push(FieldError::new("title", "Title is required"));
        }
        if self.media_url.trim().is_empty() {
            fields.push(FieldError::new("media_url", "A highlight video is required"));
        } else if !(self.media_url.starts_with("https://") || self.media_url.starts_with("http://"))
        {
            fields.push(FieldError::new("media_url", "Media must be a web link"));
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(LockerRoomError::validation("Submission is incomplete", fields))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XenWatchReview {
    pub decision: ReviewDecision,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl XenWatchReview {
    pub fn approve(feedback: Option<String>) -> Self {
        Self {
            decision: ReviewDecision::Approve,
            feedback,
        }
    }

    pub fn reject(feedback: impl Into<String>) -> Self {
        Self {
            decision: ReviewDecision::Reject,
            feedback: Some(feedback.into()),
        }
    }
}

impl XenWatchSubmission {
    /// Apply a review locally, enforcing the decision rules. Returns the
    /// predicted post-review submission.
    pub fn reviewed(
        &self,
        reviewer: UserId,
        review: &XenWatchReview,
    ) -> LockerRoomResult<XenWatchSubmission> {
        if self.status.is_decided() {
            return Err(LockerRoomError::Conflict {
                message: "This submission has already been reviewed".to_string(),
            });
        }
        let feedback = review
            .feedback
            .as_ref()
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        if review.decision == ReviewDecision::Reject && feedback.is_none() {
            return Err(LockerRoomError::validation(
                "Feedback is required when rejecting a submission",
                vec![FieldError::new("feedback", "Feedback is required")],
            ));
        }

        let mut next = self.clone();
        next.status = match review.decision {
            ReviewDecision::Approve => SubmissionStatus::Approved,
            ReviewDecision::Reject => SubmissionStatus::Rejected,
        };
        next.feedback = feedback;
        next.reviewed_by = Some(reviewer);
        next.reviewed_at = Some(Utc::now());
        Ok(next)
    }
}
