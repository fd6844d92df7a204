// Raw message normalization
pub mod normalizer;

// OHLCV candle merging against the candle store
pub mod aggregator;

// Statistical anomaly detection
pub mod detector;

// Per-batch fan-out orchestration
pub mod pipeline;
