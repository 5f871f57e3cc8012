//! Feed sync service: binary entrypoint.
//! Boots the Axum HTTP surface over one `FeedSync` session.

use intel_feed_sync::api::{self, AppState};
use intel_feed_sync::config::FeedConfig;
use intel_feed_sync::metrics::Metrics;
use intel_feed_sync::sync::FeedSync;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact tracing logs, enabled with FEED_SYNC_LOG=1.
fn enable_tracing() {
    let enabled = std::env::var("FEED_SYNC_LOG")
        .ok()
        .is_some_and(|v| v == "1");
    if !enabled {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("intel_feed_sync=info,warn"));

    // The runtime may already own the global subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_tracing();

    let cfg = FeedConfig::load()?;
    let sync = FeedSync::from_config(&cfg)?;
    let metrics = Metrics::init()?;

    let router = api::router(AppState::new(sync)).merge(metrics.router());

    Ok(router.into())
}
