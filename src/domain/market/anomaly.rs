use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Spike,
    Drop,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Spike => write!(f, "SPIKE"),
            Direction::Drop => write!(f, "DROP"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
        }
    }
}

/// A statistical outlier detected against a symbol's recent price history.
///
/// Append-only: created once per qualifying event and never mutated.
/// `deviation_percent` and `z_score` are rounded to 4 decimal places when
/// the record is built; internal computation keeps full precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub symbol: String,
    pub detected_at: DateTime<Utc>,
    pub direction: Direction,
    pub current_price: Decimal,
    pub mean_price: Decimal,
    pub deviation_percent: f64,
    pub z_score: f64,
    pub severity: Severity,
}

impl Anomaly {
    /// Alert subject line, e.g. `"AAPL SPIKE (HIGH)"`.
    pub fn subject(&self) -> String {
        format!("{} {} ({})", self.symbol, self.direction, self.severity)
    }
}
