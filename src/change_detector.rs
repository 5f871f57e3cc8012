use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use crate::cursor_store::CursorStore;
use crate::error::FetchError;
use crate::feed::{Cursor, FeedClient, FeedDocument, FeedKey, HeadSnapshot};
use crate::metrics::ensure_metrics_described;

/// Result of a read-only head probe.
#[derive(Debug, Clone)]
pub struct HeadCheck {
    pub key: FeedKey,
    pub changed: bool,
    /// Cursor stored for `key` when the probe ran.
    pub previous: Option<Cursor>,
    pub snapshot: HeadSnapshot,
}

#[derive(Debug, Clone)]
pub enum PollOutcome {
    Unchanged(HeadCheck),
    Changed {
        head: HeadCheck,
        document: FeedDocument,
        /// Whether this poll wrote the document cursor to the store.
        committed: bool,
    },
}

impl PollOutcome {
    pub fn head(&self) -> &HeadCheck {
        match self {
            PollOutcome::Unchanged(h) => h,
            PollOutcome::Changed { head, .. } => head,
        }
    }
}

/// Unknown (no stored cursor) always counts as changed, as does a head
/// without a usable cursor.
pub fn has_changed(stored: Option<&Cursor>, head: Option<&Cursor>) -> bool {
    match (stored, head) {
        (Some(s), Some(h)) => s != h,
        _ => true,
    }
}

/// Head-probe / confirm-and-advance over one [`CursorStore`].
#[derive(Clone)]
pub struct ChangeDetector {
    client: FeedClient,
    store: Arc<CursorStore>,
}

impl ChangeDetector {
    pub fn new(client: FeedClient, store: Arc<CursorStore>) -> Self {
        Self { client, store }
    }

    pub fn store(&self) -> &Arc<CursorStore> {
        &self.store
    }

    /// Fetch the head and compare with the stored cursor. Never writes.
    pub async fn check_head(&self, key: &FeedKey) -> Result<HeadCheck, FetchError> {
        let snapshot = self.client.head(key).await?;
        let previous = self.store.get(key);
        let changed = has_changed(previous.as_ref(), snapshot.cursor());
        Ok(HeadCheck {
            key: key.clone(),
            changed,
            previous,
            snapshot,
        })
    }

    /// Head probe, then the full document only if the head moved. The stored
    /// cursor advances only after the document fetch succeeds.
    pub async fn poll_full(&self, key: &FeedKey) -> Result<PollOutcome, FetchError> {
        ensure_metrics_described();

        let head = self.check_head(key).await?;
        if !head.changed {
            debug!(feed = %key, cursor = ?head.previous, "head unchanged, skipping full fetch");
            counter!("feed_poll_unchanged_total").increment(1);
            return Ok(PollOutcome::Unchanged(head));
        }

        let document = self.client.latest(key).await?;
        counter!("feed_poll_changed_total").increment(1);

        let committed = match document.cursor() {
            Some(c) => {
                let ok = self.store.advance(key, head.previous.as_ref(), c.clone());
                if ok {
                    debug!(feed = %key, from = ?head.previous, to = %c, "cursor advanced");
                } else {
                    debug!(feed = %key, "cursor moved by a concurrent poll; keeping it");
                }
                ok
            }
            None => {
                debug!(feed = %key, "document has no cursor; state left unchanged");
                false
            }
        };

        Ok(PollOutcome::Changed {
            head,
            document,
            committed,
        })
    }
}
