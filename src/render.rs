//! Text rendering for poll results and source listings. Display only.

use std::fmt::Write as _;

use crate::classify::classify;
use crate::feed::{Bucket, Cursor, Item, SourceDescriptor};
use crate::filter::Selection;

pub const NO_MATCHING_ITEMS: &str = "No items match the requested filters.";
pub const EMPTY_FEED: &str = "Feed changed but contains no items.";
pub const NO_SOURCES: &str = "No sources found.";

/// Short-circuit message when the head cursor has not moved.
pub fn render_unchanged(cursor: Option<&Cursor>) -> String {
    match cursor {
        Some(c) => format!("No changes since last check (cursor {c})."),
        None => "No changes since last check.".to_string(),
    }
}

/// One item block:
///
/// ```text
/// [FLAGGED] nvd: CVE-2026-0001 in libfoo
///   risk:9.8/10 | severity:critical(9.8) | ⚠ EXPLOITED
///   action: patch_immediately
///   <excerpt, at most 200 chars>
///   https://...
/// ```
pub fn render_item(item: &Item, bucket: Bucket) -> String {
    let signals = classify(item);
    let mut out = format!(
        "[{}] {}: {}",
        bucket.as_str().to_ascii_uppercase(),
        item.source_id,
        item.headline
    );

    let mut parts = Vec::with_capacity(signals.tags.len() + 1);
    if let Some(risk) = &signals.risk {
        parts.push(format!("risk:{risk}"));
    }
    parts.extend(signals.tags);
    if !parts.is_empty() {
        let _ = write!(out, "\n  {}", parts.join(" | "));
    }
    if let Some(action) = &signals.action {
        let _ = write!(out, "\n  action: {action}");
    }
    if !signals.excerpt.is_empty() {
        let _ = write!(out, "\n  {}", signals.excerpt);
    }
    if let Some(url) = &item.url {
        let _ = write!(out, "\n  {url}");
    }
    out
}

/// Header + blank line + item blocks; a narrative, when given, leads as
/// `Summary: ...` followed by a blank line, even if nothing else is listed.
pub fn render_selection(selection: &Selection<'_>, narrative: Option<&str>) -> String {
    let mut out = String::new();
    if let Some(n) = narrative.map(str::trim).filter(|n| !n.is_empty()) {
        let _ = write!(out, "Summary: {n}\n\n");
    }

    if selection.items.is_empty() {
        out.push_str(if selection.total == 0 {
            EMPTY_FEED
        } else {
            NO_MATCHING_ITEMS
        });
        return out;
    }

    let n = selection.items.len();
    let _ = write!(
        out,
        "{n} item{} (of {} in feed):\n\n",
        if n == 1 { "" } else { "s" },
        selection.total
    );
    let blocks: Vec<String> = selection
        .items
        .iter()
        .map(|s| render_item(s.item, s.bucket))
        .collect();
    out.push_str(&blocks.join("\n\n"));
    out
}

/// `- id (name) [status] tags: a, b` plus an indented description line.
pub fn render_sources(sources: &[SourceDescriptor]) -> String {
    if sources.is_empty() {
        return NO_SOURCES.to_string();
    }
    let mut out = format!(
        "{} source{}:\n",
        sources.len(),
        if sources.len() == 1 { "" } else { "s" }
    );
    for s in sources {
        let _ = write!(out, "\n- {}", s.source_id);
        if let Some(name) = s.name.as_deref().filter(|n| !n.is_empty()) {
            let _ = write!(out, " ({name})");
        }
        let _ = write!(out, " [{}]", s.status);
        if !s.tags.is_empty() {
            let tags: Vec<&str> = s.tags.iter().map(String::as_str).collect();
            let _ = write!(out, " tags: {}", tags.join(", "));
        }
        if let Some(desc) = s.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = write!(out, "\n  {desc}");
        }
    }
    out
}
