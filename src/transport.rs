//! Transport fetcher: one bounded GET against a feed endpoint, returning JSON.
//!
//! `HttpTransport` is stateless past its pooled `reqwest::Client`, so it can be
//! shared behind an `Arc` and called concurrently for unrelated URLs.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde_json::Value;

use crate::config::FeedConfig;
use crate::error::FetchError;
use crate::metrics::ensure_metrics_described;

pub const CLIENT_ID_HEADER: &str = "x-client-id";
pub const API_KEY_HEADER: &str = "x-api-key";

#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// GET `url` and return the parsed JSON body.
    async fn fetch_json(&self, url: &Url) -> Result<Value, FetchError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(cfg: &FeedConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(CLIENT_ID_HEADER),
            HeaderValue::from_str(&cfg.client_id)?,
        );
        if let Some(key) = cfg.api_key.as_deref() {
            let mut v = HeaderValue::from_str(key)?;
            v.set_sensitive(true);
            headers.insert(HeaderName::from_static(API_KEY_HEADER), v);
        }

        let client = reqwest::Client::builder()
            .user_agent(cfg.client_id.clone())
            .default_headers(headers)
            .timeout(cfg.timeout())
            .build()?;

        Ok(Self {
            client,
            timeout: cfg.timeout(),
        })
    }

    fn classify(&self, url: &Url, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                after: self.timeout,
            }
        } else if e.is_decode() {
            FetchError::parse(url.as_str(), e.to_string())
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }

    async fn get(&self, url: &Url) -> Result<Value, FetchError> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
        if !is_json {
            let ct = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("<none>")
                .to_string();
            return Err(FetchError::parse(
                url.as_str(),
                format!("expected JSON content type, got {ct}"),
            ));
        }

        let body = resp.bytes().await.map_err(|e| self.classify(url, e))?;
        serde_json::from_slice(&body).map_err(|e| FetchError::parse(url.as_str(), e.to_string()))
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn fetch_json(&self, url: &Url) -> Result<Value, FetchError> {
        ensure_metrics_described();
        let endpoint = endpoint_label(url);
        counter!("feed_fetch_total", "endpoint" => endpoint).increment(1);

        let t0 = Instant::now();
        let res = self.get(url).await;
        histogram!("feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if let Err(e) = &res {
            tracing::warn!(error = %e, kind = e.kind(), "feed fetch failed");
            counter!("feed_fetch_errors_total", "kind" => e.kind()).increment(1);
        }
        res
    }
}

/// Last path segment, e.g. `head.json`. Keeps label cardinality bounded.
fn endpoint_label(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("root")
        .to_string()
}
