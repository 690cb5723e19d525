//! Error types for the client crate.
//!
//! [`ClientError`] covers the plumbing (HTTP, JSON, config files). Services
//! only ever return `LockerRoomError`; the conversion below is the boundary.

use lockerroom_core::{ConfigError, FieldError, LockerRoomError};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Missing configuration file path (use --config or LOCKERROOM_CONFIG)")]
    MissingConfigPath,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),
    #[error("Failed to initialize logging: {0}")]
    Telemetry(String),
}

impl From<ClientError> for LockerRoomError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(err) if err.is_decode() => LockerRoomError::Decode {
                message: err.to_string(),
            },
            ClientError::Http(err) => LockerRoomError::transport(err.to_string()),
            ClientError::Serde(err) => LockerRoomError::Decode {
                message: err.to_string(),
            },
            ClientError::Config(err) => LockerRoomError::Config(err),
            ClientError::MissingConfigPath => LockerRoomError::Config(ConfigError::MissingRequired {
                field: "config".to_string(),
            }),
            other => LockerRoomError::Config(ConfigError::InvalidValue {
                field: "config".to_string(),
                reason: other.to_string(),
            }),
        }
    }
}

/// Error body returned by the API. Every field is optional; older
/// endpoints send only `error`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

/// Map a non-success HTTP status and its body onto the error taxonomy.
/// `resource` names what was requested, for not-found messages.
pub fn status_error(status: u16, resource: &str, body: &str) -> LockerRoomError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status));

    match status {
        401 => LockerRoomError::Unauthorized,
        403 => LockerRoomError::Forbidden { message },
        404 => LockerRoomError::not_found(resource),
        400 | 422 => LockerRoomError::validation(message, parsed.errors),
        409 => LockerRoomError::Conflict { message },
        _ => LockerRoomError::Server { status, message },
    }
}
