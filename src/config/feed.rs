// src/config/feed.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf, time::Duration};

pub const ENV_CONFIG_PATH: &str = "FEED_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/feed.toml";

const ENV_BASE_URL: &str = "FEED_BASE_URL";
const ENV_API_KEY: &str = "FEED_API_KEY";
const ENV_CLIENT_ID: &str = "FEED_CLIENT_ID";
const ENV_TIMEOUT_SECS: &str = "FEED_TIMEOUT_SECS";
const ENV_METADATA_FAILURE: &str = "FEED_METADATA_FAILURE";

fn default_base_url() -> String {
    "http://127.0.0.1:8787".to_string()
}
fn default_client_id() -> String {
    concat!("intel-feed-sync/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_timeout_secs() -> u64 {
    15
}

/// What the tag filter does when the source-metadata lookup fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataFailurePolicy {
    /// Skip the tag filter and keep every item that passed the other filters.
    #[default]
    Degrade,
    /// Surface the lookup failure as the poll's failure.
    Fail,
}

impl std::str::FromStr for MetadataFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(Self::Degrade),
            "fail" => Ok(Self::Fail),
            other => Err(anyhow!("unknown metadata failure policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Feed root; `head.json`, `latest.json`, ... are resolved under it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// "ENV" means: read from FEED_API_KEY.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub metadata_failure: MetadataFailurePolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            client_id: default_client_id(),
            timeout_secs: default_timeout_secs(),
            metadata_failure: MetadataFailurePolicy::default(),
        }
    }
}

impl FeedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parse a TOML file. Env overrides are NOT applied here.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading feed config from {}", path.display()))?;
        let cfg: FeedConfig = toml::from_str(&data)
            .with_context(|| format!("parsing feed config {}", path.display()))?;
        Ok(cfg)
    }

    /// Resolve config using file + env:
    /// 1) $FEED_CONFIG_PATH (must exist)
    /// 2) config/feed.toml
    /// 3) built-in defaults
    ///
    /// then FEED_* env vars override individual fields.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path");
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            Self::default()
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(v) = env::var(ENV_BASE_URL) {
            self.base_url = v;
        }
        if let Ok(v) = env::var(ENV_CLIENT_ID) {
            self.client_id = v;
        }
        if let Ok(v) = env::var(ENV_TIMEOUT_SECS) {
            self.timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT_SECS} is not a number: {v}"))?;
        }
        if let Ok(v) = env::var(ENV_METADATA_FAILURE) {
            self.metadata_failure = v.parse()?;
        }

        // Env key wins; a literal "ENV" in the file defers to it as well.
        match env::var(ENV_API_KEY) {
            Ok(k) if !k.trim().is_empty() => self.api_key = Some(k),
            _ => {
                if self
                    .api_key
                    .as_deref()
                    .is_some_and(|k| k.trim().eq_ignore_ascii_case("env"))
                {
                    bail!("api_key = \"ENV\" but {ENV_API_KEY} is not set");
                }
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be > 0");
        }
        reqwest::Url::parse(&self.base_url)
            .with_context(|| format!("invalid feed base_url: {}", self.base_url))?;
        if self.client_id.trim().is_empty() {
            self.client_id = default_client_id();
        }
        if self.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.api_key = None;
        }
        Ok(())
    }
}
