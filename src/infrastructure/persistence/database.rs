use anyhow::{Context, Result};

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// Singleton database wrapper
#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(db_url: &str) -> Result<Self> {
        // Ensure the directory exists if it's a file path
        if let Some(path_part) = db_url.strip_prefix("sqlite://") {
            let path = Path::new(path_part);
            if let Some(parent) = path.parent()
                && !parent.exists()
            {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create database directory")?;
            }
        }

        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal); // Better for concurrency

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to SQLite database")?;

        info!("Connected to database: {}", db_url);

        let db = Self { pool };
        db.init().await?;

        Ok(db)
    }

    /// Initialize database schema
    async fn init(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        // 1. Candles: one row per (symbol, minute bucket). Prices are TEXT
        // (decimal strings); conditional updates CAST for comparison.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candles (
                symbol TEXT NOT NULL,
                bucket INTEGER NOT NULL,
                open TEXT NOT NULL,
                high TEXT NOT NULL,
                low TEXT NOT NULL,
                close TEXT NOT NULL,
                volume INTEGER NOT NULL,
                trade_count INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                PRIMARY KEY (symbol, bucket)
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create candles table")?;

        // 2. Raw price history, append-only
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS prices (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                recorded_at INTEGER NOT NULL,
                price TEXT NOT NULL,
                volume INTEGER NOT NULL,
                source TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create prices table")?;

        // Index for "last N prices per symbol" reads
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_prices_symbol_id
            ON prices (symbol, id);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create price index")?;

        // 3. Anomalies, append-only
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS anomalies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                detected_at INTEGER NOT NULL,
                direction TEXT NOT NULL,
                current_price TEXT NOT NULL,
                mean_price TEXT NOT NULL,
                deviation_percent REAL NOT NULL,
                z_score REAL NOT NULL,
                severity TEXT NOT NULL
            );
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create anomalies table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_anomalies_symbol_time
            ON anomalies (symbol, detected_at);
            "#,
        )
        .execute(&mut *conn)
        .await
        .context("Failed to create anomaly index")?;

        info!("Database schema initialized.");
        Ok(())
    }

    /// Passive retention: delete rows whose expiry stamp has passed. The
    /// derivation core only stamps `expires_at`; this sweep is the store
    /// honoring it.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let cutoff = now.timestamp();

        let candles = sqlx::query("DELETE FROM candles WHERE expires_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("Failed to purge expired candles")?
            .rows_affected();

        let prices = sqlx::query("DELETE FROM prices WHERE expires_at < ?1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .context("Failed to purge expired prices")?
            .rows_affected();

        if candles + prices > 0 {
            info!("Purged {} expired candles, {} expired prices", candles, prices);
        }
        Ok(candles + prices)
    }
}
