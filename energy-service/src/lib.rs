pub mod api;
pub mod config;
pub mod error;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod service;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{Envelope, Pipeline};
pub use service::EnergyService;

use std::sync::Arc;

use energy_client::{
    db::{self, SqliteReadingStore},
    ReadingStore,
};

/// Connect to the configured database and create the schema. Called once at
/// startup, before anything is served.
pub async fn open_store(cfg: &config::DatabaseConfig) -> anyhow::Result<Arc<dyn ReadingStore>> {
    let pool = db::connect(&cfg.uri, cfg.max_connections).await?;
    db::schema::init(&pool).await?;
    tracing::info!(uri = %cfg.uri, "reading store opened");
    Ok(Arc::new(SqliteReadingStore::new(pool)))
}
