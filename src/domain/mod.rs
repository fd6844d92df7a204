// Market data domain: events, candles, anomalies
pub mod market;

// Repository traits (store and sink ports)
pub mod repositories;

// Domain-specific error types
pub mod errors;
