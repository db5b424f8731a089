use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::error::ValidationError;

/// Device name recorded when a sensor does not identify itself.
pub const DEFAULT_DEVICE: &str = "unknown";

/// One instantaneous power measurement as stored.
///
/// Readings are ordered by `(timestamp, id)`; the id breaks ties between
/// samples that carry the same instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: i64,
    pub device: String,
    pub watts: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Reading {
    pub fn sort_key(&self) -> (OffsetDateTime, i64) {
        (self.timestamp, self.id)
    }
}

/// A reading that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReading {
    pub device: String,
    pub watts: f64,
    pub timestamp: OffsetDateTime,
}

impl NewReading {
    /// Build a reading, normalising the timestamp to UTC at microsecond
    /// precision, the precision readings are stored with.
    pub fn new(device: impl Into<String>, watts: f64, timestamp: OffsetDateTime) -> Self {
        let sub_micros = Duration::nanoseconds(i64::from(timestamp.nanosecond() % 1_000));
        Self {
            device: device.into(),
            watts,
            timestamp: (timestamp - sub_micros).to_offset(UtcOffset::UTC),
        }
    }

    /// Rules:
    /// - watts must be a finite number.
    /// - watts must be non-negative.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if !self.watts.is_finite() {
            return Err(ValidationError::InvalidWatts);
        }
        if self.watts < 0.0 {
            return Err(ValidationError::NegativeWatts);
        }
        Ok(self)
    }

    pub fn into_reading(self, id: i64) -> Reading {
        Reading {
            id,
            device: self.device,
            watts: self.watts,
            timestamp: self.timestamp,
        }
    }
}
