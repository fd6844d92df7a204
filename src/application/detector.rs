//! Anomaly Detector
//!
//! Compares each event's price against the symbol's recent price history
//! (a read-only snapshot of the last <=30 recorded prices) and classifies a
//! z-score outlier when the configured threshold is exceeded. Statistics run
//! at an f64 boundary via `statrs`; prices stay `Decimal` everywhere else.
//!
//! Detection is a best-effort signal: the history read is not synchronized
//! with concurrent writers, and an evaluation may miss a very recent write.

use crate::domain::errors::StoreError;
use crate::domain::market::{Anomaly, Direction, PriceEvent, Severity};
use crate::domain::repositories::{AlertSink, AnomalyStore, PriceHistoryStore};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use statrs::statistics::{Data, Distribution};
use std::sync::Arc;
use tracing::{info, warn};

/// Minimum history length for a meaningful sample standard deviation.
const MIN_HISTORY: usize = 2;

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// |z| above which an event is anomalous.
    pub z_threshold: f64,

    /// |z| above which severity escalates from MEDIUM to HIGH.
    pub high_severity_z: f64,

    /// How many recent prices to read per evaluation.
    pub history_limit: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            z_threshold: 2.5,
            high_severity_z: 3.5,
            history_limit: 30,
        }
    }
}

/// Round a presentation field to 4 decimal places. Internal math keeps
/// full precision; only the emitted record is rounded.
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Pure classification: z-score of `event.price` against `history`
/// (newest first, excluding the current event).
///
/// Returns `None` without error when history is too short, when the market
/// is flat (`stdev == 0`), or when the score stays within threshold.
pub fn classify(event: &PriceEvent, history: &[Decimal], config: &DetectorConfig) -> Option<Anomaly> {
    if history.len() < MIN_HISTORY {
        return None;
    }

    let prices: Vec<f64> = history.iter().filter_map(|p| p.to_f64()).collect();
    if prices.len() < MIN_HISTORY {
        return None;
    }

    let data = Data::new(prices);
    let mean = data.mean()?;
    // Sample standard deviation (n-1), consistent with the n>=2 precondition.
    let stdev = data.std_dev()?;
    if stdev == 0.0 {
        // Flat market carries no signal, regardless of deviation magnitude.
        return None;
    }

    let price = event.price.to_f64().unwrap_or(0.0);
    let z_score = (price - mean) / stdev;
    if z_score.abs() <= config.z_threshold {
        return None;
    }

    let direction = if price > mean {
        Direction::Spike
    } else {
        Direction::Drop
    };
    let deviation_percent = if mean == 0.0 {
        0.0
    } else {
        (price - mean) / mean * 100.0
    };
    let severity = if z_score.abs() > config.high_severity_z {
        Severity::High
    } else {
        Severity::Medium
    };

    Some(Anomaly {
        symbol: event.symbol.clone(),
        detected_at: event.timestamp,
        direction,
        current_price: event.price,
        mean_price: Decimal::from_f64_retain(mean).unwrap_or(Decimal::ZERO),
        deviation_percent: round4(deviation_percent),
        z_score: round4(z_score),
        severity,
    })
}

pub struct AnomalyDetector {
    history: Arc<dyn PriceHistoryStore>,
    anomalies: Arc<dyn AnomalyStore>,
    alerts: Arc<dyn AlertSink>,
    config: DetectorConfig,
}

impl AnomalyDetector {
    pub fn new(
        history: Arc<dyn PriceHistoryStore>,
        anomalies: Arc<dyn AnomalyStore>,
        alerts: Arc<dyn AlertSink>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            history,
            anomalies,
            alerts,
            config,
        }
    }

    /// Evaluate one event. A detected anomaly is always durably recorded;
    /// failing to record it fails this event. Alert delivery is fire and
    /// forget: a sink failure is logged and the anomaly still counts.
    pub async fn evaluate(&self, event: &PriceEvent) -> Result<Option<Anomaly>, StoreError> {
        let history = self
            .history
            .recent_prices(&event.symbol, self.config.history_limit)
            .await?;

        let Some(anomaly) = classify(event, &history, &self.config) else {
            return Ok(None);
        };

        self.anomalies.record(&anomaly).await?;
        info!(
            "Anomaly detected: {} z={} deviation={}%",
            anomaly.subject(),
            anomaly.z_score,
            anomaly.deviation_percent
        );

        if let Err(e) = self.alerts.publish(&anomaly).await {
            warn!("Alert delivery failed for {}: {}", anomaly.symbol, e);
        }

        Ok(Some(anomaly))
    }
}
