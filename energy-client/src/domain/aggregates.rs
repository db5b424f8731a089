use serde::Serialize;
use time::{Date, OffsetDateTime};

use super::Reading;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Energy attributed to one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyBucket {
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(rename = "wh")]
    pub watt_hours: f64,
    pub kwh: f64,
}

/// Most recent reading of a single device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub id: i64,
    pub device: String,
    pub watts: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl From<Reading> for DeviceSnapshot {
    fn from(r: Reading) -> Self {
        Self {
            id: r.id,
            device: r.device,
            watts: r.watts,
            timestamp: r.timestamp,
        }
    }
}

/// Instantaneous load across all devices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_watts: f64,
    pub devices: Vec<DeviceSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Co2Estimate {
    pub kwh: f64,
    #[serde(rename = "kgCO2")]
    pub kg_co2: f64,
    #[serde(rename = "factor_kgCO2_per_kWh")]
    pub factor: f64,
}
