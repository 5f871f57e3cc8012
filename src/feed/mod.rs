// src/feed/mod.rs
pub mod client;
pub mod item;
pub mod types;

pub use client::FeedClient;
pub use item::{Evidence, Item, Risk};
pub use types::{
    Bucket, BucketCounts, Buckets, Cursor, FeedDocument, FeedKey, HeadSnapshot, HealthReport,
    SourceDescriptor, SourceStatus,
};
