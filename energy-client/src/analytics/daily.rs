use time::{Date, Duration, OffsetDateTime, UtcOffset};

use super::integration::{DailyEnergy, IntegrationScope};
use crate::{domain::DailyBucket, error::StoreError, store::ReadingStore};

/// Number of days from `Date::MIN` through `today`, inclusive. A series
/// ending on `today` cannot be longer than this.
pub fn max_window_days(today: Date) -> i64 {
    (today - Date::MIN).whole_days() + 1
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

fn clamp_days(days: i64, today: Date) -> i64 {
    let max = max_window_days(today);
    if days > max {
        tracing::warn!(days, max, "daily window reaches past the earliest date");
        max
    } else {
        days
    }
}

/// Lay `energy` out as one bucket per UTC day, oldest first, ending on the
/// day of `now`. Days without contributions are zero.
pub fn daily_series(energy: &DailyEnergy, days: i64, now: OffsetDateTime) -> Vec<DailyBucket> {
    if days <= 0 {
        return Vec::new();
    }
    let today = now.to_offset(UtcOffset::UTC).date();
    let days = clamp_days(days, today);

    (0..days)
        .rev()
        .map(|d| {
            let date = today - Duration::days(d);
            let wh = energy.get(&date).copied().unwrap_or(0.0);
            DailyBucket {
                date,
                watt_hours: round_to(wh, 3),
                kwh: round_to(wh / 1000.0, 4),
            }
        })
        .collect()
}

/// Computes the daily energy series from a [`ReadingStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyAggregator {
    scope: IntegrationScope,
}

impl DailyAggregator {
    pub fn new(scope: IntegrationScope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> IntegrationScope {
        self.scope
    }

    /// Energy per day for the `days` days ending on `now`'s date.
    ///
    /// Every reading at or after `now - days` takes part in integration; there
    /// is no upper bound on the window.
    pub async fn aggregate(
        &self,
        store: &dyn ReadingStore,
        days: i64,
        now: OffsetDateTime,
    ) -> Result<Vec<DailyBucket>, StoreError> {
        if days <= 0 {
            return Ok(Vec::new());
        }
        let days = clamp_days(days, now.to_offset(UtcOffset::UTC).date());

        // A window reaching past the earliest instant has no lower bound.
        let start = now.checked_sub(Duration::days(days));
        let readings = store.range_query(start, None).await?;
        let energy = self.scope.integrate(&readings);

        tracing::debug!(
            days,
            readings = readings.len(),
            scope = ?self.scope,
            "daily aggregates computed"
        );

        Ok(daily_series(&energy, days, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{connect, schema, SqliteReadingStore},
        domain::NewReading,
        store::MemoryReadingStore,
    };
    use time::macros::{date, datetime};

    const NOW: OffsetDateTime = datetime!(2024-01-10 15:00:00 UTC);

    #[test]
    fn rounding_matches_three_and_four_places() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(0.12345678, 4), 0.1235);
        assert_eq!(round_to(150.0, 3), 150.0);
    }

    #[test]
    fn series_has_exactly_days_contiguous_entries_ending_today() {
        for days in [1, 2, 7, 31, 400] {
            let series = daily_series(&DailyEnergy::new(), days, NOW);
            assert_eq!(series.len() as i64, days);
            assert_eq!(series.last().unwrap().date, date!(2024 - 01 - 10));
            for pair in series.windows(2) {
                assert_eq!(pair[1].date, pair[0].date.next_day().unwrap());
            }
            assert!(series.iter().all(|b| b.watt_hours == 0.0 && b.kwh == 0.0));
        }
    }

    #[test]
    fn non_positive_days_yield_empty_series() {
        assert!(daily_series(&DailyEnergy::new(), 0, NOW).is_empty());
        assert!(daily_series(&DailyEnergy::new(), -3, NOW).is_empty());
    }

    #[test]
    fn forty_thousand_day_window_is_complete() {
        let series = daily_series(&DailyEnergy::new(), 40_000, NOW);
        assert_eq!(series.len(), 40_000);
        assert_eq!(series[0].date, date!(2024 - 01 - 10) - Duration::days(39_999));
        assert_eq!(series.last().unwrap().date, date!(2024 - 01 - 10));
    }

    #[test]
    fn window_stops_at_the_earliest_date() {
        let today = Date::MIN + Duration::days(10);
        let now = today.midnight().assume_utc() + Duration::hours(12);
        assert_eq!(max_window_days(today), 11);

        let exact = daily_series(&DailyEnergy::new(), 11, now);
        assert_eq!(exact.len(), 11);
        assert_eq!(exact[0].date, Date::MIN);

        let beyond = daily_series(&DailyEnergy::new(), i64::MAX, now);
        assert_eq!(beyond.len(), 11);
        assert_eq!(beyond[0].date, Date::MIN);
    }

    #[tokio::test]
    async fn window_past_the_earliest_date_keeps_every_reading() {
        let store = MemoryReadingStore::new();
        let start = Date::MIN.midnight().assume_utc();
        store.append(&NewReading::new("tv", 100.0, start)).await.unwrap();
        store
            .append(&NewReading::new("tv", 100.0, start + Duration::hours(1)))
            .await
            .unwrap();

        let now = start + Duration::days(2);
        let series = DailyAggregator::default().aggregate(&store, 500, now).await.unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series[0].date, Date::MIN);
        assert_eq!(series[0].watt_hours, 100.0);
    }

    #[test]
    fn today_is_taken_in_utc() {
        let late_evening = datetime!(2024-01-10 23:30:00 -05:00);
        let series = daily_series(&DailyEnergy::new(), 1, late_evening);
        assert_eq!(series[0].date, date!(2024 - 01 - 11));
    }

    #[test]
    fn energy_outside_the_series_is_dropped() {
        let mut energy = DailyEnergy::new();
        energy.insert(date!(2024 - 01 - 01), 10.0);
        energy.insert(date!(2024 - 01 - 09), 1234.56789);
        energy.insert(date!(2024 - 01 - 11), 99.0);

        let series = daily_series(&energy, 2, NOW);
        assert_eq!(series[0].date, date!(2024 - 01 - 09));
        assert_eq!(series[0].watt_hours, 1234.568);
        assert_eq!(series[0].kwh, 1.2346);
        assert_eq!(series[1].watt_hours, 0.0);
    }

    #[tokio::test]
    async fn fridge_hour_lands_on_its_start_day() {
        let store = MemoryReadingStore::new();
        let t0 = datetime!(2024-01-09 10:00:00 UTC);
        store.append(&NewReading::new("fridge", 100.0, t0)).await.unwrap();
        store
            .append(&NewReading::new("fridge", 200.0, t0 + Duration::hours(1)))
            .await
            .unwrap();

        let series = DailyAggregator::default().aggregate(&store, 7, NOW).await.unwrap();
        assert_eq!(series.len(), 7);
        let jan9 = series.iter().find(|b| b.date == date!(2024 - 01 - 09)).unwrap();
        assert_eq!(jan9.watt_hours, 150.0);
        assert_eq!(jan9.kwh, 0.15);
        let total: f64 = series.iter().map(|b| b.watt_hours).sum();
        assert_eq!(total, 150.0);
    }

    #[tokio::test]
    async fn single_reading_in_window_gives_zero_buckets() {
        let store = MemoryReadingStore::new();
        // Outside the 3-day window.
        store
            .append(&NewReading::new("tv", 80.0, NOW - Duration::days(5)))
            .await
            .unwrap();
        store
            .append(&NewReading::new("tv", 80.0, NOW - Duration::hours(2)))
            .await
            .unwrap();

        let series = DailyAggregator::default().aggregate(&store, 3, NOW).await.unwrap();
        assert_eq!(series.len(), 3);
        assert!(series.iter().all(|b| b.kwh == 0.0));
    }

    #[tokio::test]
    async fn only_days_in_the_series_are_reported() {
        let store = MemoryReadingStore::new();
        let start = NOW - Duration::days(1);
        store.append(&NewReading::new("ac", 1000.0, start)).await.unwrap();
        store
            .append(&NewReading::new("ac", 1000.0, start + Duration::hours(1)))
            .await
            .unwrap();

        let series = DailyAggregator::default().aggregate(&store, 1, NOW).await.unwrap();
        // The pair starts yesterday, which is outside a one-day series.
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].watt_hours, 0.0);

        let series = DailyAggregator::default().aggregate(&store, 2, NOW).await.unwrap();
        assert_eq!(series[0].watt_hours, 1000.0);
    }

    #[tokio::test]
    async fn scope_changes_totals_for_mixed_devices() {
        let store = MemoryReadingStore::new();
        let t0 = datetime!(2024-01-10 08:00:00 UTC);
        store.append(&NewReading::new("fridge", 100.0, t0)).await.unwrap();
        store
            .append(&NewReading::new("ac", 1900.0, t0 + Duration::minutes(30)))
            .await
            .unwrap();
        store
            .append(&NewReading::new("fridge", 100.0, t0 + Duration::hours(1)))
            .await
            .unwrap();

        let pooled = DailyAggregator::new(IntegrationScope::Pooled)
            .aggregate(&store, 1, NOW)
            .await
            .unwrap();
        // (100+1900)/2 * 0.5h twice.
        assert_eq!(pooled[0].watt_hours, 1000.0);

        let per_device = DailyAggregator::new(IntegrationScope::PerDevice)
            .aggregate(&store, 1, NOW)
            .await
            .unwrap();
        assert_eq!(per_device[0].watt_hours, 100.0);
    }

    #[tokio::test]
    async fn sqlite_store_feeds_integration_in_timestamp_order() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        schema::init(&pool).await.unwrap();
        let store = SqliteReadingStore::new(pool);

        // Inserted out of time order; id order alone would clamp intervals to zero.
        let t0 = datetime!(2024-01-10 08:00:00 UTC);
        store
            .append(&NewReading::new("fridge", 100.0, t0 + Duration::hours(2)))
            .await
            .unwrap();
        store.append(&NewReading::new("fridge", 100.0, t0)).await.unwrap();
        store
            .append(&NewReading::new("fridge", 300.0, t0 + Duration::hours(1)))
            .await
            .unwrap();
        store
            .append(&NewReading::new("fridge", 500.0, t0 + Duration::hours(1)))
            .await
            .unwrap();

        let series = DailyAggregator::default().aggregate(&store, 1, NOW).await.unwrap();
        // (100+300)/2 + 0 for the shared instant + (500+100)/2.
        assert_eq!(series[0].watt_hours, 500.0);

        let memory = MemoryReadingStore::new();
        for r in store.range_query(None, None).await.unwrap() {
            memory
                .append(&NewReading::new(r.device, r.watts, r.timestamp))
                .await
                .unwrap();
        }
        let from_memory = DailyAggregator::default().aggregate(&memory, 1, NOW).await.unwrap();
        assert_eq!(from_memory, series);
    }
}
