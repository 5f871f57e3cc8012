use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_fetch_total", "Feed HTTP fetches issued, by endpoint.");
        describe_counter!("feed_fetch_errors_total", "Feed fetch failures, by kind.");
        describe_histogram!("feed_fetch_ms", "Feed fetch latency in milliseconds.");
        describe_counter!(
            "feed_poll_unchanged_total",
            "Polls that short-circuited on an unchanged head cursor."
        );
        describe_counter!(
            "feed_poll_changed_total",
            "Polls that fetched the full feed after a cursor change."
        );
        describe_counter!(
            "feed_tag_filter_degraded_total",
            "Tag filters skipped because source metadata could not be fetched."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder for this process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
