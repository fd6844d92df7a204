//! finpulse - Streaming price derivation pipeline
//!
//! Consumes raw price messages (mock generator or NDJSON on stdin),
//! normalizes them, merges per-minute OHLCV candles and runs z-score
//! anomaly detection, persisting both to SQLite.
//!
//! # Usage
//! ```sh
//! MODE=mock cargo run
//! cat ticks.ndjson | MODE=stdin cargo run
//! ```
//!
//! # Environment Variables
//! - `MODE` - 'mock' or 'stdin' (default: mock)
//! - `SYMBOLS` - comma-separated symbol list
//! - `DATABASE_URL` - SQLite URL (default: sqlite://data/finpulse.db)
//! - `Z_SCORE_THRESHOLD` - anomaly threshold (default: 2.5)
//! - `ALERT_WEBHOOK_URL` - optional webhook for alert delivery

use anyhow::Result;
use chrono::Utc;
use finpulse::application::aggregator::CandleAggregator;
use finpulse::application::detector::{AnomalyDetector, DetectorConfig};
use finpulse::application::pipeline::{BatchSummary, EventPipeline};
use finpulse::config::{Config, Mode};
use finpulse::domain::repositories::{AlertSink, PriceHistoryStore};
use finpulse::infrastructure::alerts::{LogAlertSink, WebhookAlertSink};
use finpulse::infrastructure::mock::MockTickSource;
use finpulse::infrastructure::persistence::Database;
use finpulse::infrastructure::persistence::repositories::{
    SqliteAnomalyStore, SqliteCandleStore, SqlitePriceHistoryStore,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tracing::{Level, info, warn};
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false).pretty();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stdout_layer)
        .init();

    info!("finpulse {} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    info!(
        "Configuration loaded: Mode={:?}, Symbols={:?}, Z-threshold={}",
        config.mode, config.symbols, config.z_score_threshold
    );

    let database = Database::new(&config.database_url).await?;

    let candles = Arc::new(SqliteCandleStore::new(database.clone()));
    let history: Arc<dyn PriceHistoryStore> =
        Arc::new(SqlitePriceHistoryStore::new(database.clone()));
    let anomalies = Arc::new(SqliteAnomalyStore::new(database.clone()));
    let alerts: Arc<dyn AlertSink> = match &config.alert_webhook_url {
        Some(url) => {
            info!("Alert delivery: webhook {}", url);
            Arc::new(WebhookAlertSink::new(url.clone()))
        }
        None => {
            info!("Alert delivery: log only");
            Arc::new(LogAlertSink)
        }
    };

    let detector_config = DetectorConfig {
        z_threshold: config.z_score_threshold,
        history_limit: config.history_limit,
        ..DetectorConfig::default()
    };
    let aggregator = CandleAggregator::new(candles, config.candle_ttl_days);
    let detector = AnomalyDetector::new(history.clone(), anomalies, alerts, detector_config);
    let pipeline = EventPipeline::new(aggregator, detector, history, config.price_ttl_days);

    // Retention sweep: the store honoring the expiry stamps the core writes.
    let sweeper = database.clone();
    let purge_interval = config.purge_interval_secs;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(purge_interval));
        loop {
            ticker.tick().await;
            if let Err(e) = sweeper.purge_expired(Utc::now()).await {
                warn!("Retention sweep failed: {}", e);
            }
        }
    });

    match config.mode {
        Mode::Mock => run_mock(&pipeline, &config).await,
        Mode::Stdin => run_stdin(&pipeline).await,
    }
}

async fn run_mock(pipeline: &EventPipeline, config: &Config) -> Result<()> {
    let mut source = MockTickSource::new(&config.symbols);
    let mut ticker = tokio::time::interval(Duration::from_millis(config.mock_interval_ms));
    info!("Mock tick source running. Press Ctrl+C to shutdown.");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let batch = source.next_batch();
                let summary = pipeline.process_batch(&batch).await;
                if summary.failed > 0 || summary.anomalies > 0 {
                    info!(
                        "Batch: {} processed, {} failed, {} anomalies",
                        summary.processed, summary.failed, summary.anomalies
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received. Exiting...");
                return Ok(());
            }
        }
    }
}

async fn run_stdin(pipeline: &EventPipeline) -> Result<()> {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut totals = BatchSummary::default();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(raw) => {
                let summary = pipeline.process_batch(std::slice::from_ref(&raw)).await;
                totals.processed += summary.processed;
                totals.failed += summary.failed;
                totals.anomalies += summary.anomalies;
            }
            Err(e) => {
                warn!("Undecodable message: {}", e);
                totals.failed += 1;
            }
        }
    }

    info!(
        "Input drained: {} processed, {} failed, {} anomalies",
        totals.processed, totals.failed, totals.anomalies
    );
    Ok(())
}
