//! Candle Aggregator
//!
//! Merges each `PriceEvent` into the OHLCV candle for its
//! `(symbol, minute_bucket)` key. The merge is decomposed into three
//! partial updates against the [`CandleStore`] port:
//!
//! 1. an unconditional upsert (`close`, running `volume`/`trade_count`,
//!    `open`/`high`/`low` initialized only on first write, expiry refresh);
//! 2. a conditional raise of `high`;
//! 3. a conditional lower of `low`.
//!
//! `max`/`min` are commutative and the running sums associative, so
//! concurrent workers merging into the same key under at-least-once
//! delivery never lose data. A conditional write that loses its race is a
//! normal outcome and is deliberately not retried or logged.

use crate::domain::errors::StoreError;
use crate::domain::market::PriceEvent;
use crate::domain::repositories::CandleStore;
use chrono::{Duration, Utc};
use std::sync::Arc;

pub struct CandleAggregator {
    store: Arc<dyn CandleStore>,
    candle_ttl: Duration,
}

impl CandleAggregator {
    pub fn new(store: Arc<dyn CandleStore>, candle_ttl_days: i64) -> Self {
        Self {
            store,
            candle_ttl: Duration::days(candle_ttl_days),
        }
    }

    /// Merge one event into its candle. The only failure mode is the store
    /// itself rejecting a write, which is fatal for this event alone.
    ///
    /// Note on `close`: under racing writers it is the price of whichever
    /// write lands last physically, not necessarily chronologically. The
    /// input model carries no sequence number that could disambiguate.
    pub async fn merge(&self, event: &PriceEvent) -> Result<(), StoreError> {
        let key = event.candle_key();
        let expires_at = Utc::now() + self.candle_ttl;

        self.store
            .merge_event(&key, event.price, event.volume, expires_at)
            .await?;

        // Race losses here are expected under concurrent merges; ignore.
        let _ = self.store.raise_high(&key, event.price).await?;
        let _ = self.store.lower_low(&key, event.price).await?;

        Ok(())
    }
}
