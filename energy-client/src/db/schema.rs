use sqlx::SqlitePool;

use crate::error::StoreError;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS readings (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        device    TEXT    NOT NULL,
        watts     REAL    NOT NULL,
        ts_micros INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS readings_ts_idx ON readings (ts_micros, id)",
    "CREATE INDEX IF NOT EXISTS readings_device_ts_idx ON readings (device, ts_micros, id)",
];

/// Create the readings table and its indexes. Idempotent; run once at startup
/// before the store is shared.
pub async fn init(pool: &SqlitePool) -> Result<(), StoreError> {
    for stmt in STATEMENTS {
        sqlx::query(stmt).execute(pool).await?;
    }
    tracing::info!("readings schema ready");
    Ok(())
}
