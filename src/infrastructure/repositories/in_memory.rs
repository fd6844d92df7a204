//! In-Memory Store Implementations
//!
//! Thread-safe (`Arc<RwLock>`) implementations of the store and sink ports.
//! They back unit/integration tests and mock mode; durable deployments use
//! the SQLite adapters under `infrastructure::persistence`.
//!
//! The conditional-update semantics match the SQLite adapters exactly: a
//! raise/lower that does not improve the stored value (or targets a row the
//! upsert has not created yet) reports `SkippedDueToRace`.

use crate::domain::errors::{NotifyError, StoreError};
use crate::domain::market::{Anomaly, Candle, CandleKey, MergeOutcome, PriceEvent};
use crate::domain::repositories::{AlertSink, AnomalyStore, CandleStore, PriceHistoryStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct InMemoryCandleStore {
    candles: Arc<RwLock<HashMap<CandleKey, Candle>>>,
}

impl InMemoryCandleStore {
    pub fn new() -> Self {
        Self {
            candles: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.candles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.candles.read().await.is_empty()
    }
}

impl Default for InMemoryCandleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandleStore for InMemoryCandleStore {
    async fn merge_event(
        &self,
        key: &CandleKey,
        price: Decimal,
        volume: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut candles = self.candles.write().await;
        match candles.get_mut(key) {
            Some(candle) => candle.merge_event(price, volume, expires_at),
            None => {
                candles.insert(key.clone(), Candle::seeded(price, volume, expires_at));
            }
        }
        Ok(())
    }

    async fn raise_high(&self, key: &CandleKey, price: Decimal) -> Result<MergeOutcome, StoreError> {
        let mut candles = self.candles.write().await;
        Ok(match candles.get_mut(key) {
            Some(candle) => candle.raise_high(price),
            None => MergeOutcome::SkippedDueToRace,
        })
    }

    async fn lower_low(&self, key: &CandleKey, price: Decimal) -> Result<MergeOutcome, StoreError> {
        let mut candles = self.candles.write().await;
        Ok(match candles.get_mut(key) {
            Some(candle) => candle.lower_low(price),
            None => MergeOutcome::SkippedDueToRace,
        })
    }

    async fn fetch(&self, key: &CandleKey) -> Result<Option<Candle>, StoreError> {
        Ok(self.candles.read().await.get(key).cloned())
    }
}

struct HistoryRow {
    price: Decimal,
    expires_at: DateTime<Utc>,
}

pub struct InMemoryPriceHistoryStore {
    prices: Arc<RwLock<HashMap<String, Vec<HistoryRow>>>>,
}

impl InMemoryPriceHistoryStore {
    pub fn new() -> Self {
        Self {
            prices: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryPriceHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceHistoryStore for InMemoryPriceHistoryStore {
    async fn record(&self, event: &PriceEvent, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.prices
            .write()
            .await
            .entry(event.symbol.clone())
            .or_default()
            .push(HistoryRow {
                price: event.price,
                expires_at,
            });
        Ok(())
    }

    async fn recent_prices(&self, symbol: &str, limit: usize) -> Result<Vec<Decimal>, StoreError> {
        let now = Utc::now();
        let prices = self.prices.read().await;
        Ok(prices
            .get(symbol)
            .map(|rows| {
                rows.iter()
                    .rev()
                    .filter(|row| row.expires_at > now)
                    .take(limit)
                    .map(|row| row.price)
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub struct InMemoryAnomalyStore {
    anomalies: Arc<RwLock<Vec<Anomaly>>>,
}

impl InMemoryAnomalyStore {
    pub fn new() -> Self {
        Self {
            anomalies: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn all(&self) -> Vec<Anomaly> {
        self.anomalies.read().await.clone()
    }
}

impl Default for InMemoryAnomalyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AnomalyStore for InMemoryAnomalyStore {
    async fn record(&self, anomaly: &Anomaly) -> Result<(), StoreError> {
        self.anomalies.write().await.push(anomaly.clone());
        Ok(())
    }
}

/// Alert sink that keeps everything it was asked to publish. Used by tests
/// to assert on delivery without a network dependency.
pub struct CollectingAlertSink {
    published: Arc<RwLock<Vec<Anomaly>>>,
}

impl CollectingAlertSink {
    pub fn new() -> Self {
        Self {
            published: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn published(&self) -> Vec<Anomaly> {
        self.published.read().await.clone()
    }
}

impl Default for CollectingAlertSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertSink for CollectingAlertSink {
    async fn publish(&self, anomaly: &Anomaly) -> Result<(), NotifyError> {
        self.published.write().await.push(anomaly.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn key(minute: u32) -> CandleKey {
        CandleKey {
            symbol: "AAPL".to_string(),
            bucket: Utc.with_ymd_and_hms(2024, 1, 15, 14, minute, 0).unwrap(),
        }
    }

    fn expiry() -> DateTime<Utc> {
        Utc::now() + chrono::Duration::days(30)
    }

    #[tokio::test]
    async fn test_raise_before_upsert_is_a_race_loss() {
        let store = InMemoryCandleStore::new();
        let outcome = store.raise_high(&key(0), dec!(100)).await.unwrap();
        assert_eq!(outcome, MergeOutcome::SkippedDueToRace);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_upsert_then_conditional_updates() {
        let store = InMemoryCandleStore::new();
        store
            .merge_event(&key(1), dec!(100), 10, expiry())
            .await
            .unwrap();

        assert_eq!(
            store.raise_high(&key(1), dec!(101)).await.unwrap(),
            MergeOutcome::Applied
        );
        assert_eq!(
            store.raise_high(&key(1), dec!(100.5)).await.unwrap(),
            MergeOutcome::SkippedDueToRace
        );

        let candle = store.fetch(&key(1)).await.unwrap().unwrap();
        assert_eq!(candle.high, dec!(101));
        assert_eq!(candle.low, dec!(100));
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_bounded() {
        let store = InMemoryPriceHistoryStore::new();
        for i in 0..40 {
            let event = PriceEvent {
                symbol: "AAPL".to_string(),
                timestamp: Utc::now(),
                price: Decimal::from(i),
                volume: 0,
                source: "test".to_string(),
            };
            store.record(&event, expiry()).await.unwrap();
        }

        let prices = store.recent_prices("AAPL", 30).await.unwrap();
        assert_eq!(prices.len(), 30);
        assert_eq!(prices[0], dec!(39)); // newest first
        assert_eq!(prices[29], dec!(10));

        assert!(store.recent_prices("MSFT", 30).await.unwrap().is_empty());
    }
}
