// tests/common/mod.rs
//
// In-memory FeedTransport: canned JSON per "<path>[?query]" plus a call log.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use intel_feed_sync::{CursorStore, FeedSync, FetchError, FeedTransport, MetadataFailurePolicy};
use reqwest::Url;
use serde_json::Value;

pub const ROOT: &str = "http://feed.test/";

#[derive(Default)]
pub struct StubTransport {
    routes: Mutex<HashMap<String, Result<Value, u16>>>,
    calls: Mutex<Vec<String>>,
}

fn route_key(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    }
}

impl StubTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, route: &str, body: Value) {
        self.routes.lock().unwrap().insert(route.to_string(), Ok(body));
    }

    pub fn fail(&self, route: &str, status: u16) {
        self.routes.lock().unwrap().insert(route.to_string(), Err(status));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, route: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == route).count()
    }
}

#[async_trait]
impl FeedTransport for StubTransport {
    async fn fetch_json(&self, url: &Url) -> Result<Value, FetchError> {
        let key = route_key(url);
        self.calls.lock().unwrap().push(key.clone());
        match self.routes.lock().unwrap().get(&key) {
            Some(Ok(v)) => Ok(v.clone()),
            Some(Err(status)) => Err(FetchError::Http {
                url: url.to_string(),
                status: *status,
            }),
            None => Err(FetchError::Http {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// Fresh session (empty cursor store) over the stub.
pub fn session(stub: &Arc<StubTransport>, policy: MetadataFailurePolicy) -> FeedSync {
    let transport: Arc<dyn FeedTransport> = stub.clone();
    FeedSync::new(transport, ROOT, Arc::new(CursorStore::new()), policy).expect("session")
}
