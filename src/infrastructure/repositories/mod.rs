pub mod in_memory;

pub use in_memory::{
    CollectingAlertSink, InMemoryAnomalyStore, InMemoryCandleStore, InMemoryPriceHistoryStore,
};
