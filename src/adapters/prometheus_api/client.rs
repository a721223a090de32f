//! Prometheus HTTP Client - Instant Query Adapter
//!
//! Wraps reqwest with a bounded timeout for `GET /api/v1/query`.
//! One attempt per call: a failed query is retried by the next scrape.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::types::decode_response;
use crate::domain::error::QueryError;
use crate::ports::{QueryBackend, RawSample};

/// Configuration for the Prometheus HTTP client.
#[derive(Debug, Clone)]
pub struct PrometheusClientConfig {
  /// Request timeout, covering connect and body read.
  pub timeout: Duration,
  /// Idle connections kept per backend host.
  pub pool_max_idle_per_host: usize,
}

impl Default for PrometheusClientConfig {
  fn default() -> Self {
    Self {
      timeout: Duration::from_secs(50),
      pool_max_idle_per_host: 5,
    }
  }
}

/// `QueryBackend` over the Prometheus HTTP API.
#[derive(Debug, Clone)]
pub struct PrometheusClient {
  /// Underlying HTTP client.
  http: Client,
}

impl PrometheusClient {
  /// Create a new client.
  pub fn new(config: &PrometheusClientConfig) -> Result<Self, reqwest::Error> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(config.pool_max_idle_per_host)
      .user_agent(concat!("rules-exporter/", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self { http })
  }
}

#[async_trait]
impl QueryBackend for PrometheusClient {
  #[instrument(skip(self))]
  async fn instant_query(
    &self,
    endpoint: &str,
    expression: &str,
  ) -> Result<Vec<RawSample>, QueryError> {
    let url = format!("{endpoint}/api/v1/query");
    let started = Instant::now();

    let response = self
      .http
      .get(&url)
      .query(&[("query", expression)])
      .send()
      .await?;
    let status = response.status();
    let body = response.bytes().await?;

    debug!(
      status = status.as_u16(),
      bytes = body.len(),
      elapsed_ms = started.elapsed().as_millis() as u64,
      "Backend query completed"
    );

    let decoded = decode_response(&body);
    if status.is_success() {
      return decoded;
    }

    // Prometheus answers 400/422/503 with an error envelope; prefer its
    // message over the bare status.
    match decoded {
      Err(err @ QueryError::Backend { .. }) => Err(err),
      _ => Err(QueryError::HttpStatus {
        status: status.as_u16(),
      }),
    }
  }
}
