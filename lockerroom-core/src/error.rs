//! Error types for LockerRoom operations
//!
//! Every failure a view can observe is a [`LockerRoomError`]. The
//! [`ErrorKind`] classification drives retry, re-authentication, and
//! "expected empty state" handling without matching on variants.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A validation failure attached to one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Cache layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cached value for {key} has a different type than requested")]
    TypeMismatch { key: String },

    #[error("No fetcher registered for {key}")]
    NoFetcher { key: String },

    #[error("Entry {key} was removed from the cache")]
    Removed { key: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Master error type for all LockerRoom client errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockerRoomError {
    #[error("Network error: {message}")]
    Transport { message: String },

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("Authentication required")]
    Unauthorized,

    #[error("Access forbidden: {message}")]
    Forbidden { message: String },

    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Failed to decode response: {message}")]
    Decode { message: String },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Coarse error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Validation,
    Authorization,
    NotFound,
    Conflict,
    Server,
    Internal,
}

const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

impl LockerRoomError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>, fields: Vec<FieldError>) -> Self {
        Self::Validation {
            message: message.into(),
            fields,
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Unauthorized | Self::Forbidden { .. } => ErrorKind::Authorization,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Server { .. } => ErrorKind::Server,
            Self::Decode { .. } | Self::Config(_) | Self::Cache(_) => ErrorKind::Internal,
        }
    }

    /// Transient failures that a read may retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// 401/403: the actor must be routed back to authentication.
    pub fn requires_reauth(&self) -> bool {
        self.kind() == ErrorKind::Authorization
    }

    /// 404 is an expected state (e.g. "create your profile"), not a fault.
    pub fn is_expected(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Field-level errors for mapping back onto form inputs.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation { fields, .. } => fields,
            _ => &[],
        }
    }

    /// Text safe to show to the actor. Internal and server faults collapse
    /// into a generic message; callers log the full error separately.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { .. } => {
                "Unable to reach LockerRoom. Check your connection.".to_string()
            }
            Self::Validation { message, .. } => message.clone(),
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            Self::Forbidden { .. } => "You do not have access to this page.".to_string(),
            Self::NotFound { resource } => format!("{} could not be found.", resource),
            Self::Conflict { message } => message.clone(),
            Self::Server { .. } | Self::Decode { .. } | Self::Config(_) | Self::Cache(_) => {
                GENERIC_MESSAGE.to_string()
            }
        }
    }
}

/// Result type alias for LockerRoom operations.
pub type LockerRoomResult<T> = Result<T, LockerRoomError>;

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(LockerRoomError::transport("reset").is_retryable());
        assert!(LockerRoomError::Server {
            status: 503,
            message: "down".to_string()
        }
        .is_retryable());
        assert!(!LockerRoomError::Server {
            status: 409,
            message: "nope".to_string()
        }
        .is_retryable());
        assert!(!LockerRoomError::Unauthorized.is_retryable());
        assert!(!LockerRoomError::not_found("Profile").is_retryable());
    }

    #[test]
    fn test_auth_errors_require_reauth() {
        assert!(LockerRoomError::Unauthorized.requires_reauth());
        assert!(LockerRoomError::Forbidden {
            message: "role".to_string()
        }
        .requires_reauth());
        assert!(!LockerRoomError::transport("x").requires_reauth());
    }

    #[test]
    fn test_not_found_is_expected() {
        let err = LockerRoomError::not_found("Profile");
        assert!(err.is_expected());
        assert_eq!(err.user_message(), "Profile could not be found.");
    }

    #[test]
    fn test_internal_errors_use_generic_message() {
        let err = LockerRoomError::Decode {
            message: "expected `,` at line 1".to_string(),
        };
        assert_eq!(err.user_message(), GENERIC_MESSAGE);
        assert!(!err.user_message().contains("line 1"));

        let err = LockerRoomError::from(CacheError::NoFetcher {
            key: "feed".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_field_errors_exposed_for_validation() {
        let err = LockerRoomError::validation(
            "Invalid profile",
            vec![FieldError::new("graduation_year", "must be in the future")],
        );
        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.field_errors()[0].field, "graduation_year");
        assert!(LockerRoomError::Unauthorized.field_errors().is_empty());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "api_base_url".to_string(),
            reason: "must not be empty".to_string(),
        };
        let msg = format!("{}", LockerRoomError::from(err));
        assert!(msg.contains("api_base_url"));
        assert!(msg.contains("must not be empty"));
    }
}
