use std::sync::Arc;

use energy_client::{
    analytics::{resolve_summary, DailyAggregator, EmissionsCalculator},
    domain::{Co2Estimate, DailyBucket, NewReading, Reading, Summary, DEFAULT_DEVICE},
    timestamp::{parse_or, parse_timestamp},
    ReadingStore,
};
use time::OffsetDateTime;

use crate::{config::AnalyticsConfig, error::ApiError};

/// Operations exposed to the HTTP layer, all backed by one [`ReadingStore`].
///
/// Every query is computed from the store contents at call time; nothing is
/// cached between calls, so one instance can serve concurrent requests.
pub struct EnergyService {
    store: Arc<dyn ReadingStore>,
    aggregator: DailyAggregator,
    emissions: EmissionsCalculator,
    default_days: i64,
}

impl EnergyService {
    pub fn new(store: Arc<dyn ReadingStore>, cfg: &AnalyticsConfig) -> Self {
        Self {
            store,
            aggregator: DailyAggregator::new(cfg.integration_scope),
            emissions: EmissionsCalculator::new(cfg.emissions_factor_kg_co2_per_kwh),
            default_days: cfg.default_days,
        }
    }

    pub fn default_days(&self) -> i64 {
        self.default_days
    }

    /// Store a reading. A missing or unparsable timestamp means "now".
    pub async fn ingest(
        &self,
        device: Option<String>,
        watts: f64,
        timestamp: Option<&str>,
    ) -> Result<Reading, ApiError> {
        let now = OffsetDateTime::now_utc();
        let device = device.unwrap_or_else(|| DEFAULT_DEVICE.to_string());
        let reading = NewReading::new(device, watts, parse_or(timestamp, now)).validate()?;

        let id = self.store.append(&reading).await?;
        let stored = reading.into_reading(id);

        metrics::counter!("http_readings_ingested_total").increment(1);
        tracing::debug!(id, device = %stored.device, watts = stored.watts, "reading stored");
        Ok(stored)
    }

    /// Readings between `start` and `end` inclusive; unparsable bounds are ignored.
    pub async fn query_readings(
        &self,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<Reading>, ApiError> {
        let start = start.and_then(parse_timestamp);
        let end = end.and_then(parse_timestamp);
        Ok(self.store.range_query(start, end).await?)
    }

    pub async fn daily_aggregates(&self, days: Option<i64>) -> Result<Vec<DailyBucket>, ApiError> {
        self.daily_aggregates_at(days, OffsetDateTime::now_utc()).await
    }

    pub async fn daily_aggregates_at(
        &self,
        days: Option<i64>,
        now: OffsetDateTime,
    ) -> Result<Vec<DailyBucket>, ApiError> {
        let days = days.unwrap_or(self.default_days);
        metrics::counter!("aggregate_queries_total", "kind" => "daily").increment(1);

        let started = std::time::Instant::now();
        let series = self.aggregator.aggregate(self.store.as_ref(), days, now).await?;
        metrics::histogram!("aggregate_query_seconds").record(started.elapsed().as_secs_f64());

        Ok(series)
    }

    pub async fn summary(&self) -> Result<Summary, ApiError> {
        metrics::counter!("aggregate_queries_total", "kind" => "summary").increment(1);
        Ok(resolve_summary(self.store.as_ref()).await?)
    }

    pub async fn co2(&self, days: Option<i64>) -> Result<Co2Estimate, ApiError> {
        self.co2_at(days, OffsetDateTime::now_utc()).await
    }

    pub async fn co2_at(
        &self,
        days: Option<i64>,
        now: OffsetDateTime,
    ) -> Result<Co2Estimate, ApiError> {
        let series = self.daily_aggregates_at(days, now).await?;
        Ok(self.emissions.estimate(&series))
    }
}
