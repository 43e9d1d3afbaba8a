use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use redfish_exporter_core::{exposition, RedfishCollector, TelemetrySource};
use std::{sync::Arc, time::Instant};

const INDEX: &str = "Redfish power exporter\n\n/metrics  Prometheus metrics\n/healthz  liveness probe\n";

/// Exporter routes around a shared collector
pub fn router<S>(collector: Arc<RedfishCollector<S>>) -> Router
where
    S: TelemetrySource + 'static,
{
    Router::new()
        .route("/", get(handle_index))
        .route("/metrics", get(handle_metrics::<S>))
        .route("/healthz", get(handle_health))
        .with_state(collector)
}

async fn handle_metrics<S>(State(collector): State<Arc<RedfishCollector<S>>>) -> Response
where
    S: TelemetrySource + 'static,
{
    let started = Instant::now();
    let outcome = collector.collect().await;

    match exposition::encode(&outcome) {
        Ok(body) => {
            tracing::info!(
                chassis = outcome.chassis_total,
                failed = outcome.chassis_failed,
                samples = outcome.samples.len(),
                up = outcome.discovery_ok,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "scrape served"
            );
            ([(header::CONTENT_TYPE, exposition::content_type())], body).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("failed to encode metrics: {}", e)).into_response()
        }
    }
}

async fn handle_health() -> &'static str {
    "ok"
}

async fn handle_index() -> &'static str {
    INDEX
}
