pub mod reading_queries;
pub mod schema;

pub use reading_queries::SqliteReadingStore;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::error::StoreError;

/// Open a pool for `uri`, creating the database file if it is missing.
///
/// In-memory databases are private to a connection, so `sqlite::memory:`
/// is always opened with a single connection.
pub async fn connect(uri: &str, max_connections: u32) -> Result<SqlitePool, StoreError> {
    let options = SqliteConnectOptions::from_str(uri)?.create_if_missing(true);
    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
    if uri.contains(":memory:") {
        pool_options = pool_options
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }

    let pool = pool_options.connect_with(options).await?;
    Ok(pool)
}
