use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single normalized price observation for one symbol.
///
/// Created once per ingested message and never mutated afterwards. The
/// timestamp is already truncated to whole-minute precision by the
/// normalizer, so it doubles as the candle bucket for this event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEvent {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub volume: i64,
    pub source: String,
}

impl PriceEvent {
    /// Candle key for this event: (symbol, minute bucket).
    pub fn candle_key(&self) -> super::candle::CandleKey {
        super::candle::CandleKey {
            symbol: self.symbol.clone(),
            bucket: self.timestamp,
        }
    }
}
