use crate::errors::{Error, Result};
use crate::model::StoredMeasurement;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::time::Duration;
use tracing::info;

/// Append-only measurement log backed by sqlite. The pool holds a single
/// connection, so writes are serialized and every operation is its own
/// transaction; readers never observe a partially written row.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(database_url: &str) -> Result<Self> {
        info!("Connecting to database...");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;

        info!("Database connection established");
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| Error::Storage(sqlx::Error::Migrate(Box::new(e))))?;
        info!("Migrations completed");

        Ok(Self { pool })
    }

    /// Inserts one measurement and returns its assigned id. Ids are
    /// strictly increasing in insertion order.
    pub async fn append(
        &self,
        temperature_celsius: f64,
        humidity_percent: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<i64> {
        let id = sqlx::query_scalar(
            "INSERT INTO measurements (temperature_celsius, humidity_percent, ts)
             VALUES (?, ?, ?)
             RETURNING id",
        )
        .bind(temperature_celsius)
        .bind(humidity_percent)
        .bind(timestamp)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    pub async fn get(&self, id: i64) -> Result<StoredMeasurement> {
        sqlx::query_as::<_, StoredMeasurement>(
            "SELECT id, temperature_celsius, humidity_percent, ts as timestamp
             FROM measurements
             WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NotFound(id))
    }

    /// Returns the `n` highest-id rows in ascending id order (most recent
    /// last), all rows when fewer than `n` exist.
    pub async fn get_last(&self, n: u32) -> Result<Vec<StoredMeasurement>> {
        let mut rows = sqlx::query_as::<_, StoredMeasurement>(
            "SELECT id, temperature_celsius, humidity_percent, ts as timestamp
             FROM measurements
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(n as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.reverse();
        Ok(rows)
    }

    pub async fn close(&self) {
        info!("Closing database");
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn memory_store() -> SqliteStore {
        SqliteStore::open("sqlite::memory:")
            .await
            .expect("open in-memory store")
    }

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap() + chrono::Duration::seconds(seconds)
    }

    #[tokio::test]
    async fn test_append_then_get_returns_the_row() {
        let store = memory_store().await;

        let id = store.append(21.5, 55.2, ts(0)).await.unwrap();
        let row = store.get(id).await.unwrap();

        assert_eq!(row.id, id);
        assert_eq!(row.temperature_celsius, 21.5);
        assert_eq!(row.humidity_percent, 55.2);
        assert_eq!(row.timestamp, ts(0));
    }

    #[tokio::test]
    async fn test_ids_strictly_increasing() {
        let store = memory_store().await;

        let first = store.append(20.0, 50.0, ts(0)).await.unwrap();
        let second = store.append(20.1, 50.1, ts(15)).await.unwrap();
        let third = store.append(20.2, 50.2, ts(30)).await.unwrap();

        assert!(first < second && second < third);
    }

    #[tokio::test]
    async fn test_get_last_returns_highest_ids_ascending() {
        let store = memory_store().await;
        for i in 0..5 {
            store
                .append(20.0 + i as f64, 50.0, ts(i * 15))
                .await
                .unwrap();
        }

        let rows = store.get_last(3).await.unwrap();
        assert_eq!(rows.len(), 3);
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_get_last_with_fewer_rows_returns_all() {
        let store = memory_store().await;
        store.append(20.0, 50.0, ts(0)).await.unwrap();
        store.append(21.0, 51.0, ts(15)).await.unwrap();

        let rows = store.get_last(10).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[1].id, 2);
    }

    #[tokio::test]
    async fn test_get_last_on_empty_store() {
        let store = memory_store().await;
        assert!(store.get_last(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_row_is_not_found() {
        let store = memory_store().await;
        assert!(matches!(store.get(42).await, Err(Error::NotFound(42))));
    }
}
