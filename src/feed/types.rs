// src/feed/types.rs
//! Wire shapes for the feed service's JSON documents.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::feed::item::Item;

/// Reads an explicit `null` the same as a missing key.
pub(crate) fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

/// Logical feed: the global feed or one source's feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeedKey {
    Global,
    Source(String),
}

impl FeedKey {
    /// `None` or a blank id means the global feed.
    pub fn from_source(source: Option<&str>) -> Self {
        match source.map(str::trim) {
            Some(s) if !s.is_empty() => FeedKey::Source(s.to_string()),
            _ => FeedKey::Global,
        }
    }

    pub fn source_id(&self) -> Option<&str> {
        match self {
            FeedKey::Global => None,
            FeedKey::Source(s) => Some(s),
        }
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKey::Global => f.write_str("global"),
            FeedKey::Source(s) => write!(f, "source:{s}"),
        }
    }
}

impl Serialize for FeedKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Opaque feed version token. Only equality is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Cursor {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Flagged,
    New,
    Updated,
    Removed,
}

impl Bucket {
    /// Iteration order for presentation: flagged first.
    pub const PRIORITY_ORDER: [Bucket; 4] =
        [Bucket::Flagged, Bucket::New, Bucket::Updated, Bucket::Removed];

    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Flagged => "flagged",
            Bucket::New => "new",
            Bucket::Updated => "updated",
            Bucket::Removed => "removed",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketCounts {
    #[serde(default, deserialize_with = "null_as_default")]
    pub new: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub removed: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flagged: u64,
}

impl BucketCounts {
    pub fn total(&self) -> u64 {
        self.new + self.updated + self.removed + self.flagged
    }
}

/// `head.json`: feed state without item payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadSnapshot {
    #[serde(default)]
    pub cursor: Option<Cursor>,
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub ttl_sec: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub counts: BucketCounts,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources_checked: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources_ok: u64,
    #[serde(default)]
    pub all_clear: Option<bool>,
    #[serde(default)]
    pub all_clear_confidence: Option<f64>,
    /// Older heads name the all-clear confidence plainly `confidence`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness: Option<Value>,
}

impl HeadSnapshot {
    pub fn all_clear_confidence(&self) -> Option<f64> {
        self.all_clear_confidence.or(self.confidence)
    }

    /// The head cursor, ignoring blank tokens.
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref().filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Buckets {
    #[serde(default, deserialize_with = "null_as_default")]
    pub new: Vec<Item>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated: Vec<Item>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub removed: Vec<Item>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub flagged: Vec<Item>,
}

impl Buckets {
    pub fn get(&self, bucket: Bucket) -> &[Item] {
        match bucket {
            Bucket::New => &self.new,
            Bucket::Updated => &self.updated,
            Bucket::Removed => &self.removed,
            Bucket::Flagged => &self.flagged,
        }
    }

    pub fn total(&self) -> usize {
        self.new.len() + self.updated.len() + self.removed.len() + self.flagged.len()
    }
}

/// `latest.json`: the bucketed diff for one feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedDocument {
    #[serde(default)]
    pub cursor: Option<Cursor>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub buckets: Buckets,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_narrative: Option<String>,
}

impl FeedDocument {
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref().filter(|c| !c.is_empty())
    }

    pub fn narrative(&self) -> Option<&str> {
        self.batch_narrative
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceStatus {
    Ok,
    Degraded,
    Other(String),
}

impl From<String> for SourceStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "ok" => SourceStatus::Ok,
            "degraded" => SourceStatus::Degraded,
            _ => SourceStatus::Other(s),
        }
    }
}

impl From<SourceStatus> for String {
    fn from(s: SourceStatus) -> Self {
        match s {
            SourceStatus::Ok => "ok".to_string(),
            SourceStatus::Degraded => "degraded".to_string(),
            SourceStatus::Other(s) => s,
        }
    }
}

impl Default for SourceStatus {
    fn default() -> Self {
        SourceStatus::Other("unknown".to_string())
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceStatus::Ok => f.write_str("ok"),
            SourceStatus::Degraded => f.write_str("degraded"),
            SourceStatus::Other(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    #[serde(alias = "id")]
    pub source_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: BTreeSet<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: SourceStatus,
    #[serde(default)]
    pub description: Option<String>,
}

/// `sources.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcesDocument {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<SourceDescriptor>,
}

/// `healthz.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub ok: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources_checked: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sources_ok: u64,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub engine_version: Option<String>,
}
