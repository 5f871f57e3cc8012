// src/lib.rs
//! Incremental sync over a remote intelligence feed.
//!
//! A cheap head probe answers "did anything change?", a session-scoped cursor
//! store remembers what was last confirmed per feed, and a changed feed's
//! bucketed diff is classified, filtered and rendered.

pub mod api;
pub mod change_detector;
pub mod classify;
pub mod config;
pub mod cursor_store;
pub mod error;
pub mod feed;
pub mod filter;
pub mod metrics;
pub mod render;
pub mod sync;
pub mod transport;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::{FeedConfig, MetadataFailurePolicy};
pub use crate::cursor_store::CursorStore;
pub use crate::error::FetchError;
pub use crate::sync::{FeedSync, HeadStatus, PollReport, PollRequest};
pub use crate::transport::{FeedTransport, HttpTransport};
