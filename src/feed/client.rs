// src/feed/client.rs
use std::sync::Arc;

use anyhow::{bail, Context};
use reqwest::Url;
use serde::de::DeserializeOwned;

use crate::error::FetchError;
use crate::feed::types::{FeedDocument, FeedKey, HeadSnapshot, HealthReport, SourceDescriptor, SourcesDocument};
use crate::transport::FeedTransport;

pub const HEAD_PATH: &str = "head.json";
pub const LATEST_PATH: &str = "latest.json";
pub const SOURCES_PATH: &str = "sources.json";
pub const HEALTH_PATH: &str = "healthz.json";

/// Typed access to the feed service's four documents.
#[derive(Clone)]
pub struct FeedClient {
    transport: Arc<dyn FeedTransport>,
    root: Url,
}

impl FeedClient {
    pub fn new(transport: Arc<dyn FeedTransport>, root: &str) -> anyhow::Result<Self> {
        let root = Url::parse(root).with_context(|| format!("invalid feed root: {root}"))?;
        if root.cannot_be_a_base() {
            bail!("feed root cannot carry paths: {root}");
        }
        Ok(Self { transport, root })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    /// `<root>/<file>[?source=<id>]`
    pub fn url_for(&self, file: &str, key: &FeedKey) -> Url {
        let mut url = self.root.clone();
        if let Ok(mut segs) = url.path_segments_mut() {
            segs.pop_if_empty().push(file);
        }
        if let Some(id) = key.source_id() {
            url.query_pairs_mut().append_pair("source", id);
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, file: &str, key: &FeedKey) -> Result<T, FetchError> {
        let url = self.url_for(file, key);
        let value = self.transport.fetch_json(&url).await?;
        serde_json::from_value(value).map_err(|e| FetchError::parse(url.as_str(), e.to_string()))
    }

    pub async fn head(&self, key: &FeedKey) -> Result<HeadSnapshot, FetchError> {
        self.get(HEAD_PATH, key).await
    }

    pub async fn latest(&self, key: &FeedKey) -> Result<FeedDocument, FetchError> {
        self.get(LATEST_PATH, key).await
    }

    pub async fn sources(&self) -> Result<Vec<SourceDescriptor>, FetchError> {
        let doc: SourcesDocument = self.get(SOURCES_PATH, &FeedKey::Global).await?;
        Ok(doc.sources)
    }

    pub async fn health(&self) -> Result<HealthReport, FetchError> {
        self.get(HEALTH_PATH, &FeedKey::Global).await
    }
}
