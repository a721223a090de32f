//! Rules Exporter - Entry Point
//!
//! Evaluates the configured rules against their backends on every
//! `/probe` request and exposes the results as gauges.
//!
//! Wiring sequence:
//! 1. Parse flags
//! 2. Init tracing (JSON structured logging)
//! 3. Load the rule file + validate (fatal on error)
//! 4. Build catalog, registry, result cache, backend client
//! 5. Spawn the cache sweep task
//! 6. Serve /probe, /metrics, /live, /ready
//! 7. Wait for SIGINT → mark not ready → grace period → drain server → exit

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use rules_exporter::adapters::http::{self, AppState};
use rules_exporter::adapters::metrics::{ExporterMetrics, HealthState};
use rules_exporter::adapters::prometheus_api::{PrometheusClient, PrometheusClientConfig};
use rules_exporter::config;
use rules_exporter::domain::{Catalog, MetricRegistry};
use rules_exporter::usecases::{Prober, QueryEvaluator, ResultCache};

/// Log output format.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

/// Prometheus exporter for recording-rule style queries.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Address to listen on for web interface and telemetry.
    #[arg(long = "web.listen-address", default_value = "0.0.0.0:9401")]
    listen_address: String,

    /// Path to configuration file.
    #[arg(long = "config.file", default_value = "rules_exporter.yaml")]
    config_file: String,

    /// Seconds `/ready` reports 503 before the listener stops accepting.
    #[arg(long = "web.shutdown-grace-seconds", default_value_t = 5)]
    shutdown_grace_seconds: u64,

    /// Log level filter, overridden by RUST_LOG.
    #[arg(long = "log.level", default_value = "info")]
    log_level: String,

    /// Log output format.
    #[arg(long = "log.format", value_enum, default_value = "json")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Parse flags ──────────────────────────────────────
    let cli = Cli::parse();

    // ── 2. Initialize structured logging ────────────────────
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    match cli.log_format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config_file,
        "Starting rules exporter"
    );

    // ── 3. Load configuration (fatal on error) ──────────────
    let config = config::loader::load_config(&cli.config_file)
        .context("Failed to load configuration")?;

    // ── 4. Build shared components ──────────────────────────
    let catalog = Arc::new(Catalog::from_config(&config));
    let registry = Arc::new(MetricRegistry::new());
    let metrics = Arc::new(ExporterMetrics::new().context("Failed to register exporter metrics")?);

    let client_config = PrometheusClientConfig {
        timeout: config.query.timeout(),
        ..PrometheusClientConfig::default()
    };
    let backend = Arc::new(
        PrometheusClient::new(&client_config).context("Failed to create backend HTTP client")?,
    );

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    let mut evaluator = QueryEvaluator::new(backend, Arc::clone(&metrics));
    let mut sweep_handle = None;
    if let Some(ttl) = config.query.cache_ttl() {
        let cache = Arc::new(ResultCache::new());
        evaluator = evaluator.with_cache(Arc::clone(&cache), ttl);

        // ── 5. Spawn cache sweep ────────────────────────────
        sweep_handle = Some(tokio::spawn(sweep_cache(
            cache,
            Arc::clone(&metrics),
            config.query.cleanup_interval(),
            shutdown_tx.subscribe(),
        )));
    }

    let prober = Arc::new(Prober::new(catalog, evaluator, registry, Arc::clone(&metrics)));
    let health = HealthState::new();

    info!(
        targets = config.targets.len(),
        timeout_seconds = config.query.timeout_seconds,
        cache_ttl_seconds = config.query.cache_ttl_seconds,
        "Components wired"
    );

    // ── 6. Serve HTTP ───────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&cli.listen_address)
        .await
        .with_context(|| format!("Failed to bind {}", cli.listen_address))?;
    let router = http::router(AppState {
        prober,
        metrics,
        health: health.clone(),
    });
    let server_shutdown = shutdown_tx.subscribe();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = http::serve(listener, router, server_shutdown).await {
            error!(error = %e, "HTTP server failed");
        }
    });

    // ── 7. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    http::drain(&health, &shutdown_tx, Duration::from_secs(cli.shutdown_grace_seconds)).await;

    // In-flight probes get a bounded drain window; abandoned backend
    // queries are dropped with their futures.
    if tokio::time::timeout(Duration::from_secs(10), server_handle).await.is_err() {
        info!("Server drain timed out");
    }
    if let Some(handle) = sweep_handle {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

/// Periodically purge expired cache entries until shutdown.
async fn sweep_cache(
    cache: Arc<ResultCache>,
    metrics: Arc<ExporterMetrics>,
    interval: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => break,
            _ = ticker.tick() => {
                let purged = cache.cleanup();
                metrics.cache_entries.set(cache.len() as i64);
                if purged > 0 {
                    debug!(purged, remaining = cache.len(), "Swept expired cache entries");
                }
            }
        }
    }
}
