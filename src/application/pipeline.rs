//! Event Pipeline
//!
//! Per-batch orchestration: normalize each raw message, fan it out to the
//! anomaly detector and the candle aggregator, then record the raw price
//! into the history store. The detector runs before the recording step so
//! its history snapshot always excludes the current event.
//!
//! Failure is isolated per message: a malformed or storage-failed record is
//! counted and skipped, never aborting its siblings.

use crate::application::aggregator::CandleAggregator;
use crate::application::detector::AnomalyDetector;
use crate::application::normalizer::normalize;
use crate::domain::errors::ProcessError;
use crate::domain::market::Anomaly;
use crate::domain::repositories::PriceHistoryStore;
use chrono::{Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Partial-success accounting for one batch of raw messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
    pub anomalies: usize,
}

pub struct EventPipeline {
    aggregator: CandleAggregator,
    detector: AnomalyDetector,
    history: Arc<dyn PriceHistoryStore>,
    price_ttl: Duration,
}

impl EventPipeline {
    pub fn new(
        aggregator: CandleAggregator,
        detector: AnomalyDetector,
        history: Arc<dyn PriceHistoryStore>,
        price_ttl_days: i64,
    ) -> Self {
        Self {
            aggregator,
            detector,
            history,
            price_ttl: Duration::days(price_ttl_days),
        }
    }

    /// Process one raw message end to end. Returns the anomaly, if one was
    /// detected and recorded for this event.
    pub async fn process_message(&self, raw: &Value) -> Result<Option<Anomaly>, ProcessError> {
        let event = normalize(raw, Utc::now())?;

        // History snapshot is read here, before this event is recorded.
        let anomaly = self.detector.evaluate(&event).await?;

        self.aggregator.merge(&event).await?;
        self.history
            .record(&event, Utc::now() + self.price_ttl)
            .await?;

        Ok(anomaly)
    }

    /// Process a whole batch with per-message failure isolation.
    pub async fn process_batch(&self, batch: &[Value]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for raw in batch {
            match self.process_message(raw).await {
                Ok(detected) => {
                    summary.processed += 1;
                    if detected.is_some() {
                        summary.anomalies += 1;
                    }
                }
                Err(e) => {
                    warn!("Dropping event: {}", e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::detector::DetectorConfig;
    use crate::infrastructure::repositories::{
        CollectingAlertSink, InMemoryAnomalyStore, InMemoryCandleStore, InMemoryPriceHistoryStore,
    };
    use serde_json::json;

    fn build_pipeline() -> (EventPipeline, Arc<InMemoryCandleStore>) {
        let candles = Arc::new(InMemoryCandleStore::new());
        let history = Arc::new(InMemoryPriceHistoryStore::new());
        let aggregator = CandleAggregator::new(candles.clone(), 30);
        let detector = AnomalyDetector::new(
            history.clone(),
            Arc::new(InMemoryAnomalyStore::new()),
            Arc::new(CollectingAlertSink::new()),
            DetectorConfig::default(),
        );
        let pipeline = EventPipeline::new(aggregator, detector, history, 7);
        (pipeline, candles)
    }

    #[tokio::test]
    async fn test_batch_isolates_bad_messages() {
        let (pipeline, _) = build_pipeline();

        let mut batch: Vec<Value> = (0..9)
            .map(|i| {
                json!({
                    "symbol": "AAPL",
                    "timestamp": format!("2024-01-15T14:{:02}:10Z", 30 + i),
                    "price": 100.0 + i as f64,
                    "volume": 100
                })
            })
            .collect();
        batch.insert(4, json!({"price": 123.0, "volume": 1})); // no symbol

        let summary = pipeline.process_batch(&batch).await;
        assert_eq!(summary.processed, 9);
        assert_eq!(summary.failed, 1);
    }

    #[tokio::test]
    async fn test_history_excludes_current_event() {
        let (pipeline, _) = build_pipeline();

        // First message sees an empty window; recording happens after the
        // detector read, so nothing can self-compare.
        let summary = pipeline
            .process_batch(&[json!({"symbol": "TSLA", "price": 250.0})])
            .await;
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.anomalies, 0);
    }
}
