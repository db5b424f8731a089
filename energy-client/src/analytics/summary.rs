use std::collections::BTreeMap;

use crate::{
    domain::{DeviceSnapshot, Reading, Summary},
    error::StoreError,
    store::ReadingStore,
};

/// Fold the latest reading of each device into a load summary, ordered by
/// device name.
pub fn summarize(latest: BTreeMap<String, Reading>) -> Summary {
    let devices: Vec<DeviceSnapshot> = latest.into_values().map(DeviceSnapshot::from).collect();
    let total_watts = devices.iter().map(|d| d.watts).sum();
    Summary {
        total_watts,
        devices,
    }
}

pub async fn resolve_summary(store: &dyn ReadingStore) -> Result<Summary, StoreError> {
    let latest = store.latest_per_device().await?;
    Ok(summarize(latest))
}
