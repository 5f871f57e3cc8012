//! cursor_store.rs: per-session map from feed key to the last confirmed cursor.
//!
//! One store per session, shared behind an `Arc`. Nothing is persisted.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::feed::{Cursor, FeedKey};

#[derive(Debug, Default)]
pub struct CursorStore {
    inner: RwLock<HashMap<FeedKey, Cursor>>,
}

impl CursorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &FeedKey) -> Option<Cursor> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(key).cloned()
    }

    pub fn set(&self, key: FeedKey, cursor: Cursor) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(key, cursor);
    }

    /// Compare-and-set: store `new` only if the entry still equals `expected`
    /// (`None` = no entry). Returns whether the write happened.
    pub fn advance(&self, key: &FeedKey, expected: Option<&Cursor>, new: Cursor) -> bool {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if map.get(key) != expected {
            return false;
        }
        map.insert(key.clone(), new);
        true
    }

    /// Sorted copy of all entries, for diagnostics.
    pub fn snapshot(&self) -> Vec<(FeedKey, Cursor)> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<_> = map.iter().map(|(k, c)| (k.clone(), c.clone())).collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
