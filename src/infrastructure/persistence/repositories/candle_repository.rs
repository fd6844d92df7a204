use crate::domain::errors::StoreError;
use crate::domain::market::{Candle, CandleKey, MergeOutcome};
use crate::domain::repositories::CandleStore;
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::map_sqlx_err;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

/// SQLite-backed candle store.
///
/// The merge contract maps onto single statements: the upsert is an
/// `INSERT .. ON CONFLICT DO UPDATE` and the conditional extreme updates are
/// `UPDATE .. WHERE` guards whose `rows_affected` tells a race loss apart
/// from an applied write. No transaction spans the three partial updates;
/// each is individually commutative with concurrent merges.
pub struct SqliteCandleStore {
    database: Database,
}

impl SqliteCandleStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl CandleStore for SqliteCandleStore {
    async fn merge_event(
        &self,
        key: &CandleKey,
        price: Decimal,
        volume: i64,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO candles (symbol, bucket, open, high, low, close, volume, trade_count, expires_at)
            VALUES (?1, ?2, ?3, ?3, ?3, ?3, ?4, 1, ?5)
            ON CONFLICT(symbol, bucket) DO UPDATE SET
                close = excluded.close,
                volume = candles.volume + excluded.volume,
                trade_count = candles.trade_count + 1,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&key.symbol)
        .bind(key.bucket.timestamp())
        .bind(price.to_string())
        .bind(volume)
        .bind(expires_at.timestamp())
        .execute(&self.database.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn raise_high(&self, key: &CandleKey, price: Decimal) -> Result<MergeOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE candles SET high = ?3
            WHERE symbol = ?1 AND bucket = ?2 AND CAST(high AS REAL) < CAST(?3 AS REAL)
            "#,
        )
        .bind(&key.symbol)
        .bind(key.bucket.timestamp())
        .bind(price.to_string())
        .execute(&self.database.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(if result.rows_affected() > 0 {
            MergeOutcome::Applied
        } else {
            MergeOutcome::SkippedDueToRace
        })
    }

    async fn lower_low(&self, key: &CandleKey, price: Decimal) -> Result<MergeOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE candles SET low = ?3
            WHERE symbol = ?1 AND bucket = ?2 AND CAST(low AS REAL) > CAST(?3 AS REAL)
            "#,
        )
        .bind(&key.symbol)
        .bind(key.bucket.timestamp())
        .bind(price.to_string())
        .execute(&self.database.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(if result.rows_affected() > 0 {
            MergeOutcome::Applied
        } else {
            MergeOutcome::SkippedDueToRace
        })
    }

    async fn fetch(&self, key: &CandleKey) -> Result<Option<Candle>, StoreError> {
        let row = sqlx::query_as::<_, (String, String, String, String, i64, i64, i64)>(
            r#"
            SELECT open, high, low, close, volume, trade_count, expires_at
            FROM candles
            WHERE symbol = ?1 AND bucket = ?2
            "#,
        )
        .bind(&key.symbol)
        .bind(key.bucket.timestamp())
        .fetch_optional(&self.database.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(row.map(
            |(open, high, low, close, volume, trade_count, expires_at)| Candle {
                open: Decimal::from_str(&open).unwrap_or_default(),
                high: Decimal::from_str(&high).unwrap_or_default(),
                low: Decimal::from_str(&low).unwrap_or_default(),
                close: Decimal::from_str(&close).unwrap_or_default(),
                volume,
                trade_count,
                expires_at: DateTime::from_timestamp(expires_at, 0).unwrap_or_else(Utc::now),
            },
        ))
    }
}
