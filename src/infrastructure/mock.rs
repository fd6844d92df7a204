//! Mock Tick Source
//!
//! Random-walk tick generator over the configured symbols, standing in for
//! the external market-data transport in `MODE=mock`. Emits the same raw
//! JSON shape the pipeline ingests, including the occasional outlier so the
//! anomaly detector has something to find.

use chrono::Utc;
use rand::Rng;
use serde_json::{Value, json};
use std::collections::HashMap;

pub struct MockTickSource {
    symbols: Vec<String>,
    prices: HashMap<String, f64>,
}

impl MockTickSource {
    pub fn new(symbols: &[String]) -> Self {
        let mut rng = rand::rng();
        let prices = symbols
            .iter()
            .map(|s| (s.clone(), rng.random_range(50.0..500.0)))
            .collect();
        Self {
            symbols: symbols.to_vec(),
            prices,
        }
    }

    /// One tick per symbol: small drift, roughly 1-in-80 chance of a jump
    /// large enough to trip the default z-score threshold.
    pub fn next_batch(&mut self) -> Vec<Value> {
        let mut rng = rand::rng();
        let mut batch = Vec::with_capacity(self.symbols.len());

        for symbol in &self.symbols {
            let Some(price) = self.prices.get_mut(symbol) else {
                continue;
            };
            *price *= 1.0 + rng.random_range(-0.004..0.004);
            if rng.random_range(0..80) == 0 {
                *price *= if rng.random_bool(0.5) { 1.15 } else { 0.85 };
            }

            batch.push(json!({
                "symbol": symbol,
                "timestamp": Utc::now().to_rfc3339(),
                "price": (*price * 100.0).round() / 100.0,
                "volume": rng.random_range(1_000..100_000i64),
                "source": "mock",
            }));
        }

        batch
    }
}
