use anyhow::{bail, Result};
use energy_service::{
    config::AppConfig,
    observability, open_store,
    pipeline::Pipeline,
    sinks::ReadingStoreSink,
    sources::ReadingsCsvFileSource,
    transform,
};
use energy_client::domain::NewReading;
use std::{env, sync::Arc, time::Duration};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: backfill_readings <csv_file_path>");
    }
    let file_path = &args[1];

    // Load configuration (can point ENERGY_CONFIG to a backfill-specific file).
    let cfg = AppConfig::load()?;
    let store = open_store(&cfg.database).await?;

    let sink = ReadingStoreSink::new(
        store,
        cfg.backfill.batch_size,
        cfg.backfill.max_retries,
        Duration::from_millis(cfg.backfill.retry_backoff_ms),
    );

    let pipeline: Pipeline<_, NewReading, _> = Pipeline {
        name: "readings_csv_backfill",
        source: ReadingsCsvFileSource::new(file_path),
        transforms: vec![Arc::new(transform::ReadingValidation)],
        sink,
    };

    let report = pipeline.run().await?;
    if report.skipped > 0 {
        tracing::warn!(skipped = report.skipped, "some rows were not imported");
    }

    Ok(())
}
