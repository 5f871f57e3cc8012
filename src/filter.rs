// src/filter.rs
//! Bucket, source and tag filters over a feed document's buckets.

use std::collections::{BTreeSet, HashMap};

use crate::feed::{Bucket, Buckets, Item, SourceDescriptor};

fn clean_set(items: Option<Vec<String>>) -> Option<BTreeSet<String>> {
    let set: BTreeSet<String> = items
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!set.is_empty()).then_some(set)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub include_removed: bool,
    /// `None` = no source restriction.
    pub sources: Option<BTreeSet<String>>,
    /// `None` = no tag restriction.
    pub tags: Option<BTreeSet<String>>,
}

impl FilterSpec {
    /// Blank entries are dropped; an empty list means "no restriction".
    pub fn new(include_removed: bool, sources: Option<Vec<String>>, tags: Option<Vec<String>>) -> Self {
        Self {
            include_removed,
            sources: clean_set(sources),
            tags: clean_set(tags),
        }
    }

    pub fn wants_tags(&self) -> bool {
        self.tags.is_some()
    }

    pub fn buckets(&self) -> impl Iterator<Item = Bucket> + '_ {
        Bucket::PRIORITY_ORDER
            .into_iter()
            .filter(move |b| self.include_removed || *b != Bucket::Removed)
    }
}

/// source id -> tags, from `sources.json`.
#[derive(Debug, Clone, Default)]
pub struct TagIndex(HashMap<String, BTreeSet<String>>);

impl TagIndex {
    pub fn from_sources(sources: &[SourceDescriptor]) -> Self {
        Self(
            sources
                .iter()
                .map(|s| (s.source_id.clone(), s.tags.clone()))
                .collect(),
        )
    }

    /// Unknown sources have no tags and never match.
    pub fn has_any(&self, source_id: &str, wanted: &BTreeSet<String>) -> bool {
        self.0
            .get(source_id)
            .is_some_and(|tags| !tags.is_disjoint(wanted))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selected<'a> {
    pub item: &'a Item,
    pub bucket: Bucket,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    pub items: Vec<Selected<'a>>,
    /// Items in the document before any filter, all buckets.
    pub total: usize,
    /// The tag filter was requested but skipped for lack of metadata.
    pub tag_filter_skipped: bool,
}

/// Bucket inclusion first, then source AND tag. `tags = None` while `spec`
/// asks for tags means the metadata lookup failed and the tag filter is skipped.
pub fn apply<'a>(buckets: &'a Buckets, spec: &FilterSpec, tags: Option<&TagIndex>) -> Selection<'a> {
    let tag_filter = match (&spec.tags, tags) {
        (Some(wanted), Some(index)) => Some((wanted, index)),
        _ => None,
    };

    let items = spec
        .buckets()
        .flat_map(move |bucket| buckets.get(bucket).iter().map(move |item| Selected { item, bucket }))
        .filter(|s| {
            spec.sources
                .as_ref()
                .is_none_or(|allowed| allowed.contains(&s.item.source_id))
        })
        .filter(|s| {
            tag_filter.is_none_or(|(wanted, index)| index.has_any(&s.item.source_id, wanted))
        })
        .collect();

    Selection {
        items,
        total: buckets.total(),
        tag_filter_skipped: spec.wants_tags() && tags.is_none(),
    }
}
