use crate::domain::errors::StoreError;
use crate::domain::market::PriceEvent;
use crate::domain::repositories::PriceHistoryStore;
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::map_sqlx_err;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Append-only raw price log, keyed per symbol. The autoincrement rowid is
/// the recency order; timestamps alone cannot order rows because they are
/// minute-truncated at normalization.
pub struct SqlitePriceHistoryStore {
    database: Database,
}

impl SqlitePriceHistoryStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl PriceHistoryStore for SqlitePriceHistoryStore {
    async fn record(&self, event: &PriceEvent, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO prices (symbol, recorded_at, price, volume, source, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&event.symbol)
        .bind(event.timestamp.timestamp())
        .bind(event.price.to_string())
        .bind(event.volume)
        .bind(&event.source)
        .bind(expires_at.timestamp())
        .execute(&self.database.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn recent_prices(&self, symbol: &str, limit: usize) -> Result<Vec<Decimal>, StoreError> {
        let rows = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT price FROM prices
            WHERE symbol = ?1 AND expires_at > ?2
            ORDER BY id DESC
            LIMIT ?3
            "#,
        )
        .bind(symbol)
        .bind(Utc::now().timestamp())
        .bind(limit as i64)
        .fetch_all(&self.database.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(rows
            .into_iter()
            .map(|(price,)| Decimal::from_str(&price).unwrap_or_default())
            .collect())
    }
}
