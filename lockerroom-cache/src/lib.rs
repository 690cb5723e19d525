//! LockerRoom Cache - Keyed Resource Cache
//!
//! One shared store of server-derived data, keyed by [`QueryKey`]. Every
//! view that reads the same key sees the same entry.
//!
//! # Consistency
//!
//! Each write (fetch result, mutation, explicit set) is stamped with a
//! generation from one client-wide counter. An entry only accepts a write
//! newer than the last one it accepted, and fetch results never overwrite an
//! entry that has a mutation in flight. Slow responses therefore cannot
//! clobber newer state.
//!
//! # Mutations
//!
//! [`Mutation`] shows a predicted value immediately. On success the entry
//! holds the server's answer (or is marked stale when the response carries
//! none); on failure the exact prior value is restored.
//!
//! # Example
//!
//! ```ignore
//! let client = QueryClient::new(CacheConfig::default());
//! let unread = client.subscribe(
//!     QueryKey::new("notifications").name("unread"),
//!     QueryOptions::default().with_refetch_interval(Duration::from_secs(30)),
//!     move || { let api = api.clone(); async move { api.unread_count().await } },
//! );
//! // Polling stops when `unread` is dropped.
//! ```

pub mod client;
pub mod config;
mod entry;
pub mod freshness;
pub mod infinite;
pub mod key;
pub mod mutation;
pub mod retry;
pub mod stats;
pub mod subscription;

pub use client::{GcHandle, QueryClient};
pub use config::{CacheConfig, QueryOptions};
pub use freshness::{CacheEntry, CacheRead, FetchStatus};
pub use infinite::{InfiniteData, PageOutcome};
pub use lockerroom_core::Paginated;
pub use key::{KeyPart, QueryKey};
pub use mutation::Mutation;
pub use retry::RetryPolicy;
pub use stats::CacheStats;
pub use subscription::Subscription;
