//! LockerRoom client.
//!
//! Wires the cache and form crates to the HTTP API:
//!
//! ```text
//! views ──► services ──► QueryClient (lockerroom-cache)
//!              │                │ fetchers
//!              ▼                ▼
//!        lockerroom-forms   LockerRoomApi ◄── RestClient (reqwest)
//! ```
//!
//! Navigation goes through [`gate::authorize`] before a view mounts.

pub mod config;
pub mod error;
pub mod gate;
pub mod keys;
pub mod rest;
pub mod services;
pub mod telemetry;

pub use config::ClientConfig;
pub use error::{status_error, ClientError};
pub use gate::{authorize, Access};
pub use rest::RestClient;
pub use services::{
    field_locations, AnalyticsService, EvaluationService, FeedData, FeedService, LockerRoom,
    NotificationService, ProfileService, XenWatchService,
};
