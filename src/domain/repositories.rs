//! Store and Sink Ports
//!
//! Trait seams between the derivation core and its external collaborators.
//! The core never holds a lock across workers; all coordination happens
//! through the conditional-update contract of `CandleStore`. The `InMemory`
//! implementations back tests and mock mode; the `Sqlite` implementations
//! provide durable storage.

use crate::domain::errors::{NotifyError, StoreError};
use crate::domain::market::{Anomaly, CandleKey, MergeOutcome, PriceEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Keyed candle storage supporting decomposed, commutative partial updates.
///
/// A merge is issued as three independent writes so that concurrent workers
/// for the same `(symbol, bucket)` key never lose data:
/// an unconditional upsert, then two conditional extreme updates.
#[async_trait]
pub trait CandleStore: Send + Sync {
    /// Upsert the unconditional fields: `close = price`, `volume += volume`,
    /// `trade_count += 1`, `expires_at` refreshed. Initializes
    /// `open`/`high`/`low` to `price` only when the row does not exist yet.
    async fn merge_event(
        &self,
        key: &CandleKey,
        price: Decimal,
        volume: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Conditionally raise `high` to `price`. Losing the condition is a
    /// benign race outcome, not an error.
    async fn raise_high(&self, key: &CandleKey, price: Decimal) -> Result<MergeOutcome, StoreError>;

    /// Conditionally lower `low` to `price`.
    async fn lower_low(&self, key: &CandleKey, price: Decimal) -> Result<MergeOutcome, StoreError>;

    /// Fetch one candle, if present. Used by queries and tests; the merge
    /// path never reads back.
    async fn fetch(&self, key: &CandleKey) -> Result<Option<crate::domain::market::Candle>, StoreError>;
}

/// Recent-price history per symbol. The detector only reads a snapshot;
/// recording is done by the raw-price step of the pipeline, so a detector
/// evaluation may miss a very recent concurrent write (accepted).
#[async_trait]
pub trait PriceHistoryStore: Send + Sync {
    /// Append one observed price, stamped with its retention expiry.
    async fn record(&self, event: &PriceEvent, expires_at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Last `limit` prices for `symbol`, most recent first.
    async fn recent_prices(&self, symbol: &str, limit: usize) -> Result<Vec<Decimal>, StoreError>;
}

/// Append-only durable record of detected anomalies.
#[async_trait]
pub trait AnomalyStore: Send + Sync {
    async fn record(&self, anomaly: &Anomaly) -> Result<(), StoreError>;
}

/// Best-effort, fire-and-forget alert delivery. Failure is logged by the
/// caller and never propagated; the anomaly is still considered detected.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn publish(&self, anomaly: &Anomaly) -> Result<(), NotifyError>;
}
