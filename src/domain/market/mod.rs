pub mod anomaly;
pub mod candle;
pub mod price_event;

pub use anomaly::{Anomaly, Direction, Severity};
pub use candle::{Candle, CandleKey, MergeOutcome};
pub use price_event::PriceEvent;
