pub mod anomaly_repository;
pub mod candle_repository;
pub mod price_history_repository;

pub use anomaly_repository::SqliteAnomalyStore;
pub use candle_repository::SqliteCandleStore;
pub use price_history_repository::SqlitePriceHistoryStore;
