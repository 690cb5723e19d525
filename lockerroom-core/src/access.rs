//! Roles, application routes, and sessions.
//!
//! Routes declare the roles allowed to reach them. The decision itself
//! (allow, redirect to login, redirect to landing) lives in the client's
//! role gate; this module only carries the data.

use crate::identity::{EvaluationId, SubmissionId, TemplateId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Actor role as issued by the authentication service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    SchoolAdmin,
    SystemAdmin,
    Scout,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Student,
        Role::SchoolAdmin,
        Role::SystemAdmin,
        Role::Scout,
        Role::Viewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::SchoolAdmin => "school_admin",
            Role::SystemAdmin => "system_admin",
            Role::Scout => "scout",
            Role::Viewer => "viewer",
        }
    }

    /// Surface an actor with this role lands on after login or after
    /// being turned away from a route they cannot access.
    pub fn landing(&self) -> Route {
        match self {
            Role::Student | Role::Viewer => Route::Feed,
            Role::SchoolAdmin => Route::SchoolDashboard,
            Role::SystemAdmin => Route::AdminDashboard,
            Role::Scout => Route::ScoutDashboard,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated session. Token issuance happens elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub role: Role,
    pub bearer_token: String,
}

impl Session {
    pub fn new(user_id: UserId, role: Role, bearer_token: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            bearer_token: bearer_token.into(),
        }
    }
}

/// Application surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Route {
    Login,
    Feed,
    MyProfile,
    EditProfile,
    Profile { user_id: UserId },
    Notifications,
    MyEvaluations,
    Evaluation { evaluation_id: EvaluationId },
    TemplateBuilder { template_id: Option<TemplateId> },
    TemplateList,
    Analytics { user_id: UserId },
    XenWatchSubmit,
    XenWatchMine,
    XenWatchReview { submission_id: SubmissionId },
    XenWatchQueue,
    SchoolDashboard,
    ScoutDashboard,
    AdminDashboard,
    AdminUsers,
}

const EVERYONE: &[Role] = &Role::ALL;
const STAFF: &[Role] = &[Role::SchoolAdmin, Role::SystemAdmin];
const REVIEWERS: &[Role] = &[Role::Scout, Role::SystemAdmin];

impl Route {
    /// Whether the route can be reached without a session.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login)
    }

    /// Roles allowed on this route. Empty for public routes.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Route::Login => &[],
            Route::Feed | Route::Profile { .. } | Route::Notifications => EVERYONE,
            Route::MyProfile | Route::EditProfile => {
                &[Role::Student, Role::SchoolAdmin, Role::SystemAdmin, Role::Scout]
            }
            Route::MyEvaluations | Route::XenWatchSubmit | Route::XenWatchMine => {
                &[Role::Student]
            }
            Route::Evaluation { .. } => &[Role::Student, Role::SchoolAdmin, Role::SystemAdmin],
            Route::TemplateBuilder { .. } | Route::TemplateList => STAFF,
            Route::Analytics { .. } => &[
                Role::Student,
                Role::SchoolAdmin,
                Role::SystemAdmin,
                Role::Scout,
            ],
            Route::XenWatchReview { .. } | Route::XenWatchQueue => REVIEWERS,
            Route::SchoolDashboard => &[Role::SchoolAdmin],
            Route::ScoutDashboard => &[Role::Scout],
            Route::AdminDashboard | Route::AdminUsers => &[Role::SystemAdmin],
        }
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::Feed => "/feed".to_string(),
            Route::MyProfile => "/profile".to_string(),
            Route::EditProfile => "/profile/edit".to_string(),
            Route::Profile { user_id } => format!("/profile/{}", user_id),
            Route::Notifications => "/notifications".to_string(),
            Route::MyEvaluations => "/evaluations".to_string(),
            Route::Evaluation { evaluation_id } => format!("/evaluations/{}", evaluation_id),
            Route::TemplateBuilder { template_id: None } => "/templates/new".to_string(),
            Route::TemplateBuilder {
                template_id: Some(id),
            } => format!("/templates/{}/edit", id),
            Route::TemplateList => "/templates".to_string(),
            Route::Analytics { user_id } => format!("/analytics/{}", user_id),
            Route::XenWatchSubmit => "/xen-watch/submit".to_string(),
            Route::XenWatchMine => "/xen-watch".to_string(),
            Route::XenWatchReview { submission_id } => {
                format!("/xen-watch/review/{}", submission_id)
            }
            Route::XenWatchQueue => "/xen-watch/review".to_string(),
            Route::SchoolDashboard => "/school".to_string(),
            Route::ScoutDashboard => "/scout".to_string(),
            Route::AdminDashboard => "/admin".to_string(),
            Route::AdminUsers => "/admin/users".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::EntityIdType;

    #[test]
    fn test_role_serde_names() {
        let json = serde_json::to_string(&Role::SchoolAdmin).unwrap();
        assert_eq!(json, "\"school_admin\"");
        let role: Role = serde_json::from_str("\"system_admin\"").unwrap();
        assert_eq!(role, Role::SystemAdmin);
    }

    #[test]
    fn test_every_landing_admits_its_role() {
        for role in Role::ALL {
            assert!(
                role.landing().allows(role),
                "{} cannot reach its own landing",
                role
            );
        }
    }

    #[test]
    fn test_login_is_public_and_roleless() {
        assert!(Route::Login.is_public());
        assert!(Route::Login.allowed_roles().is_empty());
        assert!(!Route::Feed.is_public());
    }

    #[test]
    fn test_paths() {
        let id = UserId::nil();
        assert_eq!(
            Route::Profile { user_id: id }.path(),
            "/profile/00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            Route::TemplateBuilder { template_id: None }.path(),
            "/templates/new"
        );
    }
}
