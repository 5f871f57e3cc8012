//! # Item classification
//!
//! Turns a normalized [`Item`] into the display signals the formatter prints:
//!
//! - risk on the `0..=10` scale (`risk:9.8/10`)
//! - `severity:<level>(<cvss>)` plus an exploited marker
//! - `release:<version>` with `+security-patch` / `+prerelease` qualifiers
//! - `incident:<status>(<impact>)`
//! - `deprecation:<type>[a, b]`
//! - the excerpt cut to [`EXCERPT_LIMIT`] characters
//! - the upstream suggested action, passed through untouched
//!
//! Pure functions of the item: no global state, no defaults invented.

use crate::feed::item::{Deprecation, Incident, Release, Severity};
use crate::feed::Item;

/// Display budget for excerpts, in characters.
pub const EXCERPT_LIMIT: usize = 200;

pub const EXPLOITED_MARKER: &str = "⚠ EXPLOITED";

/// Placeholder for a signal present without its primary value.
const UNKNOWN: &str = "?";

#[derive(Debug, Clone, PartialEq)]
pub struct Signals {
    /// e.g. `9.8/10`
    pub risk: Option<String>,
    /// Ordered: severity, exploited marker, release, incident, deprecation.
    pub tags: Vec<String>,
    pub excerpt: String,
    pub action: Option<String>,
}

pub fn classify(item: &Item) -> Signals {
    let mut tags = Vec::new();
    let ev = &item.evidence;

    if let Some(sev) = &ev.severity {
        tags.push(severity_tag(sev));
        if sev.exploited == Some(true) {
            tags.push(EXPLOITED_MARKER.to_string());
        }
    }
    if let Some(rel) = &ev.release {
        tags.push(release_tag(rel));
    }
    if let Some(inc) = &ev.incident {
        tags.push(incident_tag(inc));
    }
    if let Some(dep) = &ev.deprecation {
        tags.push(deprecation_tag(dep));
    }

    Signals {
        risk: item.risk.map(|r| format!("{:.1}/10", r.out_of_ten())),
        tags,
        excerpt: item
            .excerpt
            .as_deref()
            .map(|s| truncate_chars(s, EXCERPT_LIMIT))
            .unwrap_or_default(),
        action: item.suggested_action.clone(),
    }
}

/// First `max` characters; no ellipsis, no word-boundary search.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn or_unknown(v: Option<&str>) -> &str {
    v.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(UNKNOWN)
}

fn severity_tag(sev: &Severity) -> String {
    let level = or_unknown(sev.level.as_deref());
    match sev.cvss {
        Some(cvss) if cvss.is_finite() => format!("severity:{level}({cvss:.1})"),
        _ => format!("severity:{level}"),
    }
}

fn release_tag(rel: &Release) -> String {
    let mut s = format!("release:{}", or_unknown(rel.version.as_deref()));
    if rel.security_patch == Some(true) {
        s.push_str("+security-patch");
    }
    if rel.prerelease == Some(true) {
        s.push_str("+prerelease");
    }
    s
}

fn incident_tag(inc: &Incident) -> String {
    let status = or_unknown(inc.status.as_deref());
    match inc.impact.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(impact) => format!("incident:{status}({impact})"),
        None => format!("incident:{status}"),
    }
}

fn deprecation_tag(dep: &Deprecation) -> String {
    let kind = or_unknown(dep.kind.as_deref());
    if dep.affected.is_empty() {
        format!("deprecation:{kind}")
    } else {
        format!("deprecation:{kind}[{}]", dep.affected.join(", "))
    }
}
