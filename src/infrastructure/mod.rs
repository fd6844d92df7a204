pub mod alerts;
pub mod mock;
pub mod persistence;
pub mod repositories;

pub use repositories::{
    CollectingAlertSink, InMemoryAnomalyStore, InMemoryCandleStore, InMemoryPriceHistoryStore,
};
