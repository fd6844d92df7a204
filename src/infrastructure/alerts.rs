//! Alert Sinks
//!
//! Best-effort delivery of detected anomalies. All sinks are single-shot:
//! no retry loop, no queue. Delivery failure is the caller's to log and
//! never affects whether the anomaly counts as detected.

use crate::domain::errors::NotifyError;
use crate::domain::market::Anomaly;
use crate::domain::repositories::AlertSink;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::warn;

/// Sink that only writes the alert to the log. Used when no webhook is
/// configured.
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn publish(&self, anomaly: &Anomaly) -> Result<(), NotifyError> {
        warn!(
            "ALERT {}: price {} vs mean {} (z={}, deviation={}%)",
            anomaly.subject(),
            anomaly.current_price,
            anomaly.mean_price,
            anomaly.z_score,
            anomaly.deviation_percent
        );
        Ok(())
    }
}

/// Sink that POSTs the structured alert body to a configured webhook URL.
pub struct WebhookAlertSink {
    client: Client,
    url: String,
}

impl WebhookAlertSink {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl AlertSink for WebhookAlertSink {
    async fn publish(&self, anomaly: &Anomaly) -> Result<(), NotifyError> {
        let body = json!({
            "subject": anomaly.subject(),
            "anomaly": anomaly,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::DeliveryFailed {
                reason: e.to_string(),
            })?;

        response
            .error_for_status()
            .map_err(|e| NotifyError::DeliveryFailed {
                reason: e.to_string(),
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::{Direction, Severity};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_log_sink_never_fails() {
        let sink = LogAlertSink;
        let anomaly = Anomaly {
            symbol: "AAPL".to_string(),
            detected_at: Utc::now(),
            direction: Direction::Spike,
            current_price: dec!(210),
            mean_price: dec!(180),
            deviation_percent: 16.6667,
            z_score: 4.1,
            severity: Severity::High,
        };

        assert!(sink.publish(&anomaly).await.is_ok());
    }
}
