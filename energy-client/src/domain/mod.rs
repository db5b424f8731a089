pub mod aggregates;
pub mod reading;

pub use aggregates::{Co2Estimate, DailyBucket, DeviceSnapshot, Summary};
pub use reading::{NewReading, Reading, DEFAULT_DEVICE};
