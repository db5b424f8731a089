use std::collections::BTreeMap;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use time::OffsetDateTime;

use crate::{
    domain::{NewReading, Reading},
    error::StoreError,
    store::ReadingStore,
};

/// Timestamps are stored as microseconds since the Unix epoch (UTC) so that
/// range scans and ordering are plain integer comparisons.
fn to_micros(ts: OffsetDateTime) -> i64 {
    (ts.unix_timestamp_nanos() / 1_000) as i64
}

fn from_micros(micros: i64) -> Result<OffsetDateTime, StoreError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .map_err(|_| StoreError::TimestampOutOfRange(micros))
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ReadingRow {
    id: i64,
    device: String,
    watts: f64,
    ts_micros: i64,
}

impl TryFrom<ReadingRow> for Reading {
    type Error = StoreError;

    fn try_from(row: ReadingRow) -> Result<Self, Self::Error> {
        Ok(Reading {
            id: row.id,
            device: row.device,
            watts: row.watts,
            timestamp: from_micros(row.ts_micros)?,
        })
    }
}

/// [`ReadingStore`] backed by SQLite through a `sqlx` pool.
#[derive(Debug, Clone)]
pub struct SqliteReadingStore {
    pool: SqlitePool,
}

impl SqliteReadingStore {
    /// The schema must already exist, see [`crate::db::schema::init`].
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl ReadingStore for SqliteReadingStore {
    async fn append(&self, reading: &NewReading) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO readings (device, watts, ts_micros) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(&reading.device)
        .bind(reading.watts)
        .bind(to_micros(reading.timestamp))
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn append_batch(&self, readings: &[NewReading]) -> Result<Vec<i64>, StoreError> {
        if readings.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;

        let mut builder =
            QueryBuilder::<Sqlite>::new("INSERT INTO readings (device, watts, ts_micros) ");
        builder.push_values(readings, |mut b, r| {
            b.push_bind(&r.device)
                .push_bind(r.watts)
                .push_bind(to_micros(r.timestamp));
        });
        builder.push(" RETURNING id");

        let mut ids: Vec<i64> = builder
            .build_query_scalar()
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        // RETURNING order is unspecified; AUTOINCREMENT ids follow input order.
        ids.sort_unstable();
        Ok(ids)
    }

    async fn range_query(
        &self,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) -> Result<Vec<Reading>, StoreError> {
        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT id, device, watts, ts_micros FROM readings WHERE 1 = 1");
        if let Some(start) = start {
            builder.push(" AND ts_micros >= ").push_bind(to_micros(start));
        }
        if let Some(end) = end {
            builder.push(" AND ts_micros <= ").push_bind(to_micros(end));
        }
        builder.push(" ORDER BY ts_micros ASC, id ASC");

        let rows: Vec<ReadingRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(Reading::try_from).collect()
    }

    async fn latest_per_device(&self) -> Result<BTreeMap<String, Reading>, StoreError> {
        let rows = sqlx::query_as::<_, ReadingRow>(
            r#"
            SELECT id, device, watts, ts_micros
            FROM readings r
            WHERE r.id = (
                SELECT r2.id
                FROM readings r2
                WHERE r2.device = r.device
                ORDER BY r2.ts_micros DESC, r2.id DESC
                LIMIT 1
            )
            ORDER BY device
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Reading::try_from(row).map(|r| (r.device.clone(), r)))
            .collect()
    }
}
