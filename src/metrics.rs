use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe();
        Ok(Self { handle })
    }

    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
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

    /// Serve `/metrics` on `addr` in a background task.
    pub async fn serve(&self, addr: &str) -> Result<tokio::task::JoinHandle<()>> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("bind metrics listener on {addr}"))?;
        let router = self.router();
        tracing::info!(%addr, "serving /metrics");
        Ok(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::warn!("metrics server stopped: {e:#}");
            }
        }))
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn describe() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("reminder_sent_total", "Reminders delivered, by offset.");
        describe_counter!(
            "reminder_delivery_failures_total",
            "Deliveries that failed and will be retried next poll."
        );
        describe_counter!(
            "reminder_duplicates_skipped_total",
            "Due reminders skipped because the ledger already had them."
        );
        describe_counter!(
            "ledger_persist_errors_total",
            "Ledger writes that failed after a successful delivery."
        );
        describe_counter!(
            "source_fetch_errors_total",
            "Contest list fetch/parse errors, by source."
        );
        describe_counter!("poll_cycles_total", "Completed poll passes.");
        describe_gauge!("poll_last_run_ts", "Unix ts when the last poll pass finished.");
    });
}
