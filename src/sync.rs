//! Session facade: the operations a caller invokes.
//!
//! Each call runs to completion. Fetches inside one call are sequential
//! because each step depends on the previous result (head, then full feed,
//! then source metadata for tag filtering).

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::change_detector::{ChangeDetector, HeadCheck, PollOutcome};
use crate::config::{FeedConfig, MetadataFailurePolicy};
use crate::cursor_store::CursorStore;
use crate::error::FetchError;
use crate::feed::{BucketCounts, Cursor, FeedClient, FeedDocument, FeedKey, HealthReport};
use crate::filter::{self, FilterSpec, TagIndex};
use crate::render;
use crate::transport::{FeedTransport, HttpTransport};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollRequest {
    /// Source feed to poll; absent = global feed.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub include_removed: bool,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl PollRequest {
    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec::new(self.include_removed, self.sources.clone(), self.tags.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PollReport {
    pub feed_key: FeedKey,
    pub changed: bool,
    /// Head cursor for unchanged polls, document cursor otherwise.
    pub cursor: Option<Cursor>,
    pub shown: usize,
    pub tag_filter_skipped: bool,
    pub text: String,
}

/// Structured head-check result.
#[derive(Debug, Clone, Serialize)]
pub struct HeadStatus {
    pub feed_key: FeedKey,
    pub changed: bool,
    pub cursor: Option<Cursor>,
    pub previous_cursor: Option<Cursor>,
    pub generated_at: Option<String>,
    pub ttl_sec: Option<u64>,
    pub counts: BucketCounts,
    pub sources_checked: u64,
    pub sources_ok: u64,
    pub all_clear: Option<bool>,
    pub all_clear_confidence: Option<f64>,
    /// `generated_at + ttl_sec` is in the past; `None` if either is missing or unparseable.
    pub stale: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freshness: Option<Value>,
}

impl From<HeadCheck> for HeadStatus {
    fn from(h: HeadCheck) -> Self {
        let confidence = h.snapshot.all_clear_confidence();
        let cursor = h.snapshot.cursor().cloned();
        let stale = is_stale(h.snapshot.generated_at.as_deref(), h.snapshot.ttl_sec, Utc::now());
        Self {
            feed_key: h.key,
            changed: h.changed,
            cursor,
            previous_cursor: h.previous,
            generated_at: h.snapshot.generated_at,
            ttl_sec: h.snapshot.ttl_sec,
            counts: h.snapshot.counts,
            sources_checked: h.snapshot.sources_checked,
            sources_ok: h.snapshot.sources_ok,
            all_clear: h.snapshot.all_clear,
            all_clear_confidence: confidence,
            stale,
            freshness: h.snapshot.freshness,
        }
    }
}

/// RFC 3339 `generated_at` plus `ttl_sec`, compared with `now`. A ttl past
/// the representable range is `None`, not a panic.
pub fn is_stale(generated_at: Option<&str>, ttl_sec: Option<u64>, now: DateTime<Utc>) -> Option<bool> {
    let generated = DateTime::parse_from_rfc3339(generated_at?).ok()?;
    let ttl = TimeDelta::try_seconds(i64::try_from(ttl_sec?).ok()?)?;
    let expires = generated.with_timezone(&Utc).checked_add_signed(ttl)?;
    Some(expires < now)
}

pub struct FeedSync {
    client: FeedClient,
    detector: ChangeDetector,
    policy: MetadataFailurePolicy,
}

impl FeedSync {
    pub fn new(
        transport: Arc<dyn FeedTransport>,
        root: &str,
        store: Arc<CursorStore>,
        policy: MetadataFailurePolicy,
    ) -> anyhow::Result<Self> {
        let client = FeedClient::new(transport, root)?;
        let detector = ChangeDetector::new(client.clone(), store);
        Ok(Self {
            client,
            detector,
            policy,
        })
    }

    /// Real HTTP transport and a fresh, empty cursor store.
    pub fn from_config(cfg: &FeedConfig) -> anyhow::Result<Self> {
        let transport = Arc::new(HttpTransport::new(cfg)?);
        info!(
            "feed sync configured: root={}, timeout={}s, api_key={}, metadata_failure={:?}",
            cfg.base_url,
            cfg.timeout_secs,
            cfg.api_key.is_some(),
            cfg.metadata_failure
        );
        Self::new(transport, &cfg.base_url, Arc::new(CursorStore::new()), cfg.metadata_failure)
    }

    pub fn policy(&self) -> MetadataFailurePolicy {
        self.policy
    }

    pub async fn check_head(&self, source: Option<&str>) -> Result<HeadStatus, FetchError> {
        let key = FeedKey::from_source(source);
        Ok(self.detector.check_head(&key).await?.into())
    }

    pub async fn poll(&self, req: &PollRequest) -> Result<PollReport, FetchError> {
        let key = FeedKey::from_source(req.source.as_deref());
        let (head, document) = match self.detector.poll_full(&key).await? {
            PollOutcome::Unchanged(head) => {
                let cursor = head.snapshot.cursor().cloned();
                return Ok(PollReport {
                    feed_key: key,
                    changed: false,
                    text: render::render_unchanged(cursor.as_ref()),
                    cursor,
                    shown: 0,
                    tag_filter_skipped: false,
                });
            }
            PollOutcome::Changed { head, document, .. } => (head, document),
        };

        let spec = req.filter_spec();
        let index = if spec.wants_tags() {
            self.tag_index().await?
        } else {
            None
        };

        let selection = filter::apply(&document.buckets, &spec, index.as_ref());
        let text = render::render_selection(&selection, document.narrative());

        Ok(PollReport {
            feed_key: head.key,
            changed: true,
            cursor: document.cursor().cloned(),
            shown: selection.items.len(),
            tag_filter_skipped: selection.tag_filter_skipped,
            text,
        })
    }

    /// Source metadata for the tag filter. Under `Degrade`, a failed lookup
    /// yields `None` and the tag filter is skipped.
    async fn tag_index(&self) -> Result<Option<TagIndex>, FetchError> {
        match self.client.sources().await {
            Ok(sources) => Ok(Some(TagIndex::from_sources(&sources))),
            Err(e) => match self.policy {
                MetadataFailurePolicy::Degrade => {
                    warn!(error = %e, "source metadata unavailable; skipping tag filter");
                    counter!("feed_tag_filter_degraded_total").increment(1);
                    Ok(None)
                }
                MetadataFailurePolicy::Fail => Err(e),
            },
        }
    }

    /// Rendered source list, optionally only sources carrying `tag`.
    pub async fn list_sources(&self, tag: Option<&str>) -> Result<String, FetchError> {
        let mut sources = self.client.sources().await?;
        if let Some(tag) = tag.map(str::trim).filter(|t| !t.is_empty()) {
            sources.retain(|s| s.tags.contains(tag));
        }
        Ok(render::render_sources(&sources))
    }

    pub async fn health(&self) -> Result<HealthReport, FetchError> {
        self.client.health().await
    }

    /// Full document as a read-only resource; the cursor store is untouched.
    pub async fn latest_document(&self, source: Option<&str>) -> Result<FeedDocument, FetchError> {
        self.client.latest(&FeedKey::from_source(source)).await
    }

    pub fn cursors(&self) -> Vec<(FeedKey, Cursor)> {
        self.detector.store().snapshot()
    }
}
