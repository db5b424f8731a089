use std::{fs::File, path::PathBuf};

use csv::StringRecord;
use energy_client::{domain::NewReading, timestamp::parse_timestamp};

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// CSV backfill source for power readings.
///
/// Expected header columns (by name):
/// - timestamp (ISO-8601; naive values are UTC)
/// - device (optional, defaults to `unknown`)
/// - watts
///
/// A row that fails to parse is yielded as an error and the file keeps
/// streaming.
pub struct ReadingsCsvFileSource {
    path: PathBuf,
}

impl ReadingsCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

fn record_to_reading(record: &StringRecord, headers: &StringRecord) -> Result<NewReading, PipelineError> {
    let get = |name: &str| -> Option<&str> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .and_then(|idx| record.get(idx))
            .map(str::trim)
    };

    let ts_str = get("timestamp")
        .ok_or_else(|| PipelineError::Source("missing column 'timestamp' in CSV record".to_string()))?;
    let timestamp = parse_timestamp(ts_str)
        .ok_or_else(|| PipelineError::Source(format!("invalid timestamp '{ts_str}'")))?;

    let device = match get("device") {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => energy_client::domain::DEFAULT_DEVICE.to_string(),
    };

    let watts_str = get("watts")
        .ok_or_else(|| PipelineError::Source("missing column 'watts' in CSV record".to_string()))?;
    let watts: f64 = watts_str
        .parse()
        .map_err(|e| PipelineError::Source(format!("invalid watts '{watts_str}': {e}")))?;

    Ok(NewReading::new(device, watts, timestamp))
}

#[async_trait::async_trait]
impl Source<NewReading> for ReadingsCsvFileSource {
    async fn stream(&self) -> EnvelopeStream<NewReading> {
        // Blocking CSV reads inside one task; backfill files are read sequentially.
        let path = self.path.clone();
        let s = async_stream::stream! {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to open CSV file: {e}")));
                    return;
                }
            };
            let mut rdr = csv::Reader::from_reader(file);
            let headers = match rdr.headers() {
                Ok(h) => h.clone(),
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to read CSV headers: {e}")));
                    return;
                }
            };

            for result in rdr.records() {
                let parsed = result
                    .map_err(|e| PipelineError::Source(format!("failed to read CSV record: {e}")))
                    .and_then(|record| record_to_reading(&record, &headers));

                match parsed {
                    Ok(reading) => yield Ok(Envelope::now(reading)),
                    Err(e) => {
                        metrics::counter!("readings_csv_parse_errors_total").increment(1);
                        yield Err(e);
                    }
                }
            }
        };

        Box::pin(s)
    }
}
