// src/feed/item.rs
//! Feed items, normalized once at ingestion.
//!
//! The feed has shipped two item shapes: a modern one with `risk.score` in
//! `0.0..=1.0` plus an evidence bundle, and an older one with a bare
//! `risk_score` on a `0..=10` scale. Shape detection is per item: one feed may
//! mix both. Everything downstream only sees [`Item`].

use serde::{Deserialize, Serialize};

use crate::feed::types::null_as_default;

/// Normalized risk, canonical range `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Risk {
    pub score: f64,
}

impl Risk {
    /// Modern shape: already in `0.0..=1.0`.
    pub fn from_unit(score: f64) -> Option<Self> {
        score.is_finite().then(|| Self {
            score: score.clamp(0.0, 1.0),
        })
    }

    /// Legacy shape: `0..=10`.
    pub fn from_legacy(score: f64) -> Option<Self> {
        Self::from_unit(score / 10.0)
    }

    /// Score on the `0..=10` display scale.
    pub fn out_of_ten(&self) -> f64 {
        self.score * 10.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Severity {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub cvss: Option<f64>,
    #[serde(default)]
    pub exploited: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub security_patch: Option<bool>,
    #[serde(default)]
    pub prerelease: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub impact: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deprecation {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub affected: Vec<String>,
}

/// Structured signals attached to an item. Each one is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub release: Option<Release>,
    #[serde(default)]
    pub incident: Option<Incident>,
    #[serde(default)]
    pub deprecation: Option<Deprecation>,
}

impl Evidence {
    pub fn is_empty(&self) -> bool {
        self.severity.is_none()
            && self.release.is_none()
            && self.incident.is_none()
            && self.deprecation.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawItem")]
pub struct Item {
    pub source_id: String,
    pub headline: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Untruncated excerpt; the display budget is applied at render time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<Risk>,
    #[serde(skip_serializing_if = "Evidence::is_empty")]
    pub evidence: Evidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

// --- tolerant ingestion shapes ---

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawRisk {
    Block {
        #[serde(default)]
        score: Option<f64>,
    },
    Bare(f64),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawContent {
    Text(String),
    Doc {
        #[serde(default)]
        excerpt: Option<String>,
        #[serde(default)]
        summary: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct RawItem {
    #[serde(default, alias = "source")]
    source_id: Option<String>,
    #[serde(default, alias = "title")]
    headline: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<RawContent>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default, alias = "signals")]
    evidence: Option<Evidence>,
    #[serde(default)]
    risk: Option<RawRisk>,
    #[serde(default)]
    risk_score: Option<f64>,
    #[serde(default, alias = "action")]
    suggested_action: Option<String>,
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

impl RawItem {
    /// Modern `risk.score` wins over legacy `risk_score`.
    fn risk(&self) -> Option<Risk> {
        let modern = match &self.risk {
            Some(RawRisk::Block { score: Some(s) }) => Risk::from_unit(*s),
            Some(RawRisk::Bare(s)) => Risk::from_unit(*s),
            _ => None,
        };
        modern.or_else(|| self.risk_score.and_then(Risk::from_legacy))
    }
}

impl From<RawItem> for Item {
    fn from(raw: RawItem) -> Self {
        let risk = raw.risk();

        // Object content's excerpt/summary, then string content, then a top-level excerpt.
        let excerpt = match raw.content {
            Some(RawContent::Doc { excerpt, summary }) => {
                non_blank(excerpt).or_else(|| non_blank(summary))
            }
            Some(RawContent::Text(s)) => non_blank(Some(s)),
            None => None,
        }
        .or_else(|| non_blank(raw.excerpt));

        Item {
            source_id: raw.source_id.unwrap_or_default(),
            headline: raw.headline.unwrap_or_default(),
            url: non_blank(raw.url),
            excerpt,
            risk,
            evidence: raw.evidence.unwrap_or_default(),
            suggested_action: non_blank(raw.suggested_action),
        }
    }
}
