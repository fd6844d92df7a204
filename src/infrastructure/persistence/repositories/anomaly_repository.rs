use crate::domain::errors::StoreError;
use crate::domain::market::Anomaly;
use crate::domain::repositories::AnomalyStore;
use crate::infrastructure::persistence::database::Database;
use crate::infrastructure::persistence::map_sqlx_err;
use async_trait::async_trait;

/// Append-only anomaly log.
pub struct SqliteAnomalyStore {
    database: Database,
}

impl SqliteAnomalyStore {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

#[async_trait]
impl AnomalyStore for SqliteAnomalyStore {
    async fn record(&self, anomaly: &Anomaly) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO anomalies (
                symbol,
                detected_at,
                direction,
                current_price,
                mean_price,
                deviation_percent,
                z_score,
                severity
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&anomaly.symbol)
        .bind(anomaly.detected_at.timestamp())
        .bind(anomaly.direction.to_string())
        .bind(anomaly.current_price.to_string())
        .bind(anomaly.mean_price.to_string())
        .bind(anomaly.deviation_percent)
        .bind(anomaly.z_score)
        .bind(anomaly.severity.to_string())
        .execute(&self.database.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }
}
