use std::collections::BTreeMap;

use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::{
    domain::{NewReading, Reading},
    error::StoreError,
};

/// Append-only storage of power readings.
///
/// A single append is atomic and a reading never disappears once visible,
/// so aggregations can run against whatever snapshot a query observes.
#[async_trait::async_trait]
pub trait ReadingStore: Send + Sync {
    /// Persist a reading and return its id.
    async fn append(&self, reading: &NewReading) -> Result<i64, StoreError>;

    /// Persist a batch atomically, returning ids in input order.
    async fn append_batch(&self, readings: &[NewReading]) -> Result<Vec<i64>, StoreError> {
        let mut ids = Vec::with_capacity(readings.len());
        for r in readings {
            ids.push(self.append(r).await?);
        }
        Ok(ids)
    }

    /// Readings with `start <= timestamp <= end`, ordered by `(timestamp, id)`.
    /// Absent bounds are open.
    async fn range_query(
        &self,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) -> Result<Vec<Reading>, StoreError>;

    /// The latest reading per device. Ties on timestamp resolve to the highest id.
    async fn latest_per_device(&self) -> Result<BTreeMap<String, Reading>, StoreError>;
}

/// Process-local store, used for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryReadingStore {
    readings: RwLock<Vec<Reading>>,
}

impl MemoryReadingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ReadingStore for MemoryReadingStore {
    async fn append(&self, reading: &NewReading) -> Result<i64, StoreError> {
        let mut guard = self.readings.write().await;
        let id = guard.len() as i64 + 1;
        guard.push(reading.clone().into_reading(id));
        Ok(id)
    }

    async fn append_batch(&self, readings: &[NewReading]) -> Result<Vec<i64>, StoreError> {
        let mut guard = self.readings.write().await;
        let mut ids = Vec::with_capacity(readings.len());
        for r in readings {
            let id = guard.len() as i64 + 1;
            guard.push(r.clone().into_reading(id));
            ids.push(id);
        }
        Ok(ids)
    }

    async fn range_query(
        &self,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) -> Result<Vec<Reading>, StoreError> {
        let guard = self.readings.read().await;
        let mut out: Vec<Reading> = guard
            .iter()
            .filter(|r| start.map_or(true, |s| r.timestamp >= s))
            .filter(|r| end.map_or(true, |e| r.timestamp <= e))
            .cloned()
            .collect();
        out.sort_by_key(Reading::sort_key);
        Ok(out)
    }

    async fn latest_per_device(&self) -> Result<BTreeMap<String, Reading>, StoreError> {
        let guard = self.readings.read().await;
        let mut latest: BTreeMap<String, Reading> = BTreeMap::new();
        for r in guard.iter() {
            match latest.get(&r.device) {
                Some(cur) if cur.sort_key() >= r.sort_key() => {}
                _ => {
                    latest.insert(r.device.clone(), r.clone());
                }
            }
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[tokio::test]
    async fn memory_store_orders_by_timestamp_then_id() {
        let store = MemoryReadingStore::new();
        store
            .append(&NewReading::new("b", 2.0, datetime!(2024-01-01 01:00:00 UTC)))
            .await
            .unwrap();
        store
            .append(&NewReading::new("a", 1.0, datetime!(2024-01-01 00:00:00 UTC)))
            .await
            .unwrap();
        store
            .append(&NewReading::new("c", 3.0, datetime!(2024-01-01 01:00:00 UTC)))
            .await
            .unwrap();

        let all = store.range_query(None, None).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[tokio::test]
    async fn memory_store_bounds_are_inclusive() {
        let store = MemoryReadingStore::new();
        for h in 0..4 {
            let ts = datetime!(2024-01-01 00:00:00 UTC) + time::Duration::hours(h);
            store.append(&NewReading::new("a", 1.0, ts)).await.unwrap();
        }

        let got = store
            .range_query(
                Some(datetime!(2024-01-01 01:00:00 UTC)),
                Some(datetime!(2024-01-01 02:00:00 UTC)),
            )
            .await
            .unwrap();
        assert_eq!(got.len(), 2);

        let inverted = store
            .range_query(
                Some(datetime!(2024-01-01 03:00:00 UTC)),
                Some(datetime!(2024-01-01 00:00:00 UTC)),
            )
            .await
            .unwrap();
        assert!(inverted.is_empty());
    }

    #[tokio::test]
    async fn memory_store_latest_prefers_highest_id_on_tie() {
        let store = MemoryReadingStore::new();
        let ts = datetime!(2024-01-01 12:00:00 UTC);
        store.append(&NewReading::new("ac", 800.0, ts)).await.unwrap();
        store.append(&NewReading::new("ac", 900.0, ts)).await.unwrap();
        store
            .append(&NewReading::new("ac", 100.0, ts - time::Duration::minutes(1)))
            .await
            .unwrap();

        let latest = store.latest_per_device().await.unwrap();
        assert_eq!(latest["ac"].id, 2);
        assert_eq!(latest["ac"].watts, 900.0);
    }
}
