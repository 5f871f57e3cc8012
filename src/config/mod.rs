pub mod feed;

pub use feed::{FeedConfig, MetadataFailurePolicy};
