use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifies one candle: a symbol plus its minute bucket (timestamp
/// truncated to :00 seconds).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandleKey {
    pub symbol: String,
    pub bucket: DateTime<Utc>,
}

/// Outcome of a conditional raise-high / lower-low write.
///
/// Losing the condition to a concurrent writer that already applied an
/// equal-or-better value is an expected race outcome, not an error. It is
/// never retried and never logged as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    SkippedDueToRace,
}

/// Per-minute OHLCV aggregate for one symbol.
///
/// Invariants after every merge: `low <= open <= high`,
/// `low <= close <= high`, `volume >= 0`, `trade_count >= 1`. Retention is
/// passive: the store deletes rows past `expires_at`, the core only stamps
/// and refreshes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    pub trade_count: i64,
    pub expires_at: DateTime<Utc>,
}

impl Candle {
    /// Candle created by the first event observed for a bucket.
    pub fn seeded(price: Decimal, volume: i64, expires_at: DateTime<Utc>) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
            trade_count: 1,
            expires_at,
        }
    }

    /// Unconditional part of a merge: close follows the latest write, the
    /// running sums accumulate, and the expiry stamp is refreshed. Open,
    /// high and low are left alone.
    pub fn merge_event(&mut self, price: Decimal, volume: i64, expires_at: DateTime<Utc>) {
        self.close = price;
        self.volume += volume;
        self.trade_count += 1;
        self.expires_at = expires_at;
    }

    /// Set `high = price` only if it improves the current value.
    pub fn raise_high(&mut self, price: Decimal) -> MergeOutcome {
        if price > self.high {
            self.high = price;
            MergeOutcome::Applied
        } else {
            MergeOutcome::SkippedDueToRace
        }
    }

    /// Set `low = price` only if it improves the current value.
    pub fn lower_low(&mut self, price: Decimal) -> MergeOutcome {
        if price < self.low {
            self.low = price;
            MergeOutcome::Applied
        } else {
            MergeOutcome::SkippedDueToRace
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn expiry() -> DateTime<Utc> {
        Utc::now() + chrono::Duration::days(30)
    }

    #[test]
    fn test_seeded_candle() {
        let candle = Candle::seeded(dec!(100.5), 2_000, expiry());

        assert_eq!(candle.open, dec!(100.5));
        assert_eq!(candle.high, dec!(100.5));
        assert_eq!(candle.low, dec!(100.5));
        assert_eq!(candle.close, dec!(100.5));
        assert_eq!(candle.volume, 2_000);
        assert_eq!(candle.trade_count, 1);
    }

    #[test]
    fn test_merge_keeps_open_and_extremes() {
        let mut candle = Candle::seeded(dec!(100), 1_000, expiry());

        candle.merge_event(dec!(105), 500, expiry());
        assert_eq!(candle.raise_high(dec!(105)), MergeOutcome::Applied);
        assert_eq!(candle.lower_low(dec!(105)), MergeOutcome::SkippedDueToRace);

        assert_eq!(candle.open, dec!(100)); // unchanged
        assert_eq!(candle.high, dec!(105));
        assert_eq!(candle.low, dec!(100));
        assert_eq!(candle.close, dec!(105));
        assert_eq!(candle.volume, 1_500);
        assert_eq!(candle.trade_count, 2);
    }

    #[test]
    fn test_conditional_updates_are_idempotent() {
        let mut candle = Candle::seeded(dec!(100), 0, expiry());

        assert_eq!(candle.raise_high(dec!(110)), MergeOutcome::Applied);
        // Re-applying the same value loses the condition and changes nothing.
        assert_eq!(candle.raise_high(dec!(110)), MergeOutcome::SkippedDueToRace);
        assert_eq!(candle.high, dec!(110));

        assert_eq!(candle.lower_low(dec!(90)), MergeOutcome::Applied);
        assert_eq!(candle.lower_low(dec!(90)), MergeOutcome::SkippedDueToRace);
        assert_eq!(candle.low, dec!(90));
    }

    #[test]
    fn test_invariants_hold_after_merges() {
        let mut candle = Candle::seeded(dec!(102), 10, expiry());
        for price in [dec!(100), dec!(105), dec!(98), dec!(103)] {
            candle.merge_event(price, 10, expiry());
            candle.raise_high(price);
            candle.lower_low(price);
        }

        assert!(candle.low <= candle.open && candle.open <= candle.high);
        assert!(candle.low <= candle.close && candle.close <= candle.high);
        assert!(candle.trade_count >= 1);
    }
}
