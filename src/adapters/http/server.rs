//! Probe Server - axum Router for /probe, /metrics and Health
//!
//! `GET /probe?target=<name>` runs one scrape and answers with the
//! target's gauges in the text exposition format. Backend failures
//! never change the status code: a known target always gets 200,
//! possibly with partial data.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRef, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{error, info};

use super::exposition;
use crate::adapters::metrics::health::{self, HealthState};
use crate::adapters::metrics::ExporterMetrics;
use crate::domain::error::ProbeError;
use crate::ports::QueryBackend;
use crate::usecases::Prober;

/// Shared state handed to every request handler.
pub struct AppState<B: QueryBackend> {
    /// Scrape orchestrator, shared by all requests.
    pub prober: Arc<Prober<B>>,
    /// Exporter self-metrics.
    pub metrics: Arc<ExporterMetrics>,
    /// Readiness flag.
    pub health: HealthState,
}

impl<B: QueryBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            prober: Arc::clone(&self.prober),
            metrics: Arc::clone(&self.metrics),
            health: self.health.clone(),
        }
    }
}

impl<B: QueryBackend> FromRef<AppState<B>> for HealthState {
    fn from_ref(state: &AppState<B>) -> Self {
        state.health.clone()
    }
}

/// `/probe` query parameters.
#[derive(Debug, Deserialize)]
pub struct ProbeParams {
    /// Target name from the catalog.
    pub target: Option<String>,
}

impl IntoResponse for ProbeError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::MissingTarget => StatusCode::BAD_REQUEST,
            Self::TargetNotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, self.to_string()).into_response()
    }
}

/// Build the exporter router.
pub fn router<B: QueryBackend>(state: AppState<B>) -> Router {
    Router::new()
        .route("/", get(landing))
        .route("/probe", get(probe::<B>))
        .route("/metrics", get(self_metrics::<B>))
        .route("/live", get(health::liveness))
        .route("/ready", get(health::readiness))
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown_rx` fires.
pub async fn serve(
    listener: tokio::net::TcpListener,
    router: Router,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "Probe server listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await
}

/// Begin graceful shutdown.
///
/// `/ready` answers 503 for `grace` while the listener still accepts
/// connections, then `shutdown_tx` tells the server to stop accepting
/// and drain.
pub async fn drain(health: &HealthState, shutdown_tx: &broadcast::Sender<()>, grace: Duration) {
    health.set_not_ready();
    if !grace.is_zero() {
        info!(grace_ms = grace.as_millis() as u64, "Readiness withdrawn, waiting before drain");
        tokio::time::sleep(grace).await;
    }
    let _ = shutdown_tx.send(());
}

async fn probe<B: QueryBackend>(
    State(state): State<AppState<B>>,
    Query(params): Query<ProbeParams>,
) -> Result<Response, ProbeError> {
    let target = params
        .target
        .filter(|t| !t.is_empty())
        .ok_or(ProbeError::MissingTarget)?;

    let outcome = state.prober.probe(&target).await?;

    match exposition::render(&outcome.snapshot) {
        Ok(body) => Ok((
            [(header::CONTENT_TYPE, exposition::content_type())],
            body,
        )
            .into_response()),
        Err(e) => {
            error!(error = %e, "Failed to encode probe response");
            Ok((StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response())
        }
    }
}

async fn self_metrics<B: QueryBackend>(State(state): State<AppState<B>>) -> Response {
    match state.metrics.encode() {
        Ok(body) => ([(header::CONTENT_TYPE, exposition::content_type())], body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode exporter metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

async fn landing() -> Html<&'static str> {
    Html(
        "<html><head><title>Rules Exporter</title></head><body>\
         <h1>Rules Exporter</h1>\
         <p><a href=\"/probe?target=\">/probe?target=&lt;name&gt;</a></p>\
         <p><a href=\"/metrics\">/metrics</a></p>\
         </body></html>",
    )
}
