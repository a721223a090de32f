//! HTTP Tests - /probe Over Real Sockets
//!
//! Starts an in-process fake Prometheus query API and the exporter
//! router on ephemeral ports, then scrapes with reqwest.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::broadcast;

use rules_exporter::adapters::http::{self, AppState};
use rules_exporter::adapters::metrics::{ExporterMetrics, HealthState};
use rules_exporter::adapters::prometheus_api::{PrometheusClient, PrometheusClientConfig};
use rules_exporter::config::loader::{ConfigFormat, load_from_str};
use rules_exporter::domain::{Catalog, MetricRegistry};
use rules_exporter::ports::QueryBackend;
use rules_exporter::usecases::{Prober, QueryEvaluator, ResultCache};

const TRICKY_EXPR: &str = r#"sum by (job) (rate(http_requests_total{code=~"5..", path="/a b&c"}[5m]))"#;

/// Fake `/api/v1/query`: answers by expression.
async fn fake_query(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    let query = params.get("query").map(String::as_str).unwrap_or_default();
    let vector = |result: Value| {
        json!({"status": "success", "data": {"resultType": "vector", "result": result}})
    };

    match query {
        "sum(up)" => (
            StatusCode::OK,
            Json(vector(json!([
                {"metric": {"job": "node"}, "value": [1700000000.0, "3"]},
                {"metric": {"job": "api"}, "value": [1700000000.0, "1"]}
            ]))),
        ),
        "load1" => (
            StatusCode::OK,
            Json(vector(json!([
                {"metric": {"instance": "a"}, "value": [1700000000.0, "12.5"]},
                {"metric": {"instance": "b"}, "value": [1700000000.0, "NaNgarbage"]},
                {"metric": {"instance": "h"}, "histogram": [1700000000.0, {"count": "3", "sum": "1.5"}]}
            ]))),
        ),
        "broken(" => (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "errorType": "bad_data", "error": "unexpected end of input"})),
        ),
        TRICKY_EXPR => (
            StatusCode::OK,
            Json(vector(json!([
                {"metric": {"__name__": "ignored", "job": "web"}, "value": [1700000000.0, "0.25"]}
            ]))),
        ),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, Json(json!("boom"))),
    }
}

async fn spawn(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

struct Harness {
    base: String,
    health: HealthState,
    _shutdown: broadcast::Sender<()>,
}

async fn start_exporter() -> Harness {
    let backend_addr = spawn(Router::new().route("/api/v1/query", get(fake_query))).await;

    let yaml = format!(
        r#"
query:
  timeout_seconds: 5
targets:
  node:
    endpoint: http://{backend_addr}/
    rules:
      - record: broken_rule
        expr: "broken("
      - record: up_sum
        expr: sum(up)
      - record: load_avg
        expr: load1
      - record: error_rate
        expr: '{TRICKY_EXPR}'
  down:
    endpoint: http://{backend_addr}
    rules:
      - record: missing
        expr: does_not_exist
"#
    );
    let config = load_from_str(&yaml, ConfigFormat::Yaml).unwrap();

    let metrics = Arc::new(ExporterMetrics::new().unwrap());
    let backend = Arc::new(
        PrometheusClient::new(&PrometheusClientConfig {
            timeout: config.query.timeout(),
            ..PrometheusClientConfig::default()
        })
        .unwrap(),
    );
    let evaluator = QueryEvaluator::new(backend, Arc::clone(&metrics))
        .with_cache(Arc::new(ResultCache::new()), Duration::from_secs(1));
    let prober = Arc::new(Prober::new(
        Arc::new(Catalog::from_config(&config)),
        evaluator,
        Arc::new(MetricRegistry::new()),
        Arc::clone(&metrics),
    ));
    let health = HealthState::new();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let router = http::router(AppState {
        prober,
        metrics,
        health: health.clone(),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(http::serve(listener, router, shutdown_rx));

    Harness {
        base: format!("http://{addr}"),
        health,
        _shutdown: shutdown_tx,
    }
}

async fn get_text(url: &str) -> (StatusCode, String) {
    let response = reqwest::get(url).await.unwrap();
    let status = StatusCode::from_u16(response.status().as_u16()).unwrap();
    (status, response.text().await.unwrap())
}

#[tokio::test]
async fn test_missing_target_is_bad_request() {
    let h = start_exporter().await;
    let (status, _) = get_text(&format!("{}/probe", h.base)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get_text(&format!("{}/probe?target=", h.base)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_target_is_not_found() {
    let h = start_exporter().await;
    let (status, body) = get_text(&format!("{}/probe?target=ghost", h.base)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Target not found"));
}

#[tokio::test]
async fn test_probe_with_partial_failures_is_ok() {
    let h = start_exporter().await;
    let response = reqwest::get(format!("{}/probe?target=node", h.base)).await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/plain"));
    let body = response.text().await.unwrap();

    assert!(!body.contains("broken_rule"));
    assert!(body.contains("# TYPE up_sum gauge"));
    assert!(body.contains("up_sum{job=\"node\"} 3"));
    assert!(body.contains("up_sum{job=\"api\"} 1"));
    assert!(body.contains("load_avg{instance=\"a\"} 12.5"));
    assert!(!body.contains("instance=\"b\""));
    assert!(!body.contains("instance=\"h\""));
    assert!(body.contains("error_rate{job=\"web\"} 0.25"), "{body}");
    assert!(!body.contains("__name__"));
}

#[tokio::test]
async fn test_target_with_only_failures_returns_empty_body() {
    let h = start_exporter().await;
    let (status, body) = get_text(&format!("{}/probe?target=down", h.base)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_self_metrics_reflect_probes() {
    let h = start_exporter().await;
    get_text(&format!("{}/probe?target=node", h.base)).await;

    let (status, body) = get_text(&format!("{}/metrics", h.base)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("rules_exporter_probes_total{target=\"node\"} 1"));
    assert!(body.contains("rules_exporter_query_errors_total{rule=\"broken_rule\",target=\"node\"} 1"));
    assert!(body.contains("rules_exporter_rows_skipped_total{rule=\"load_avg\",target=\"node\"} 2"));
}

#[tokio::test]
async fn test_health_endpoints() {
    let h = start_exporter().await;
    assert_eq!(get_text(&format!("{}/live", h.base)).await.0, StatusCode::OK);
    assert_eq!(get_text(&format!("{}/ready", h.base)).await.0, StatusCode::OK);

    h.health.set_not_ready();
    assert_eq!(
        get_text(&format!("{}/ready", h.base)).await.0,
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_client_reports_backend_error_envelope() {
    let backend_addr = spawn(Router::new().route("/api/v1/query", get(fake_query))).await;
    let client = PrometheusClient::new(&PrometheusClientConfig::default()).unwrap();

    let err = client
        .instant_query(&format!("http://{backend_addr}"), "broken(")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("bad_data"), "{err}");

    let err = client
        .instant_query(&format!("http://{backend_addr}"), "anything_else")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("500"), "{err}");
}

#[tokio::test]
async fn test_client_times_out_on_hung_backend() {
    let hung = Router::new().route(
        "/api/v1/query",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            "never"
        }),
    );
    let backend_addr = spawn(hung).await;
    let client = PrometheusClient::new(&PrometheusClientConfig {
        timeout: Duration::from_millis(200),
        ..PrometheusClientConfig::default()
    })
    .unwrap();

    let started = std::time::Instant::now();
    let err = client
        .instant_query(&format!("http://{backend_addr}"), "up")
        .await
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(err.to_string().contains("transport"), "{err}");
}
