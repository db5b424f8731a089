//! Energy analytics over stored power readings.
//!
//! Readings flow through [`integration`] (trapezoidal watt-hours per UTC
//! day) into [`daily`] (fixed-length, zero-filled series), which in turn
//! feeds [`emissions`]. [`summary`] reads the latest reading per device
//! straight from the store.

pub mod daily;
pub mod emissions;
pub mod integration;
pub mod summary;

pub use daily::{daily_series, round_to, DailyAggregator, max_window_days};
pub use emissions::{EmissionsCalculator, DEFAULT_FACTOR_KG_CO2_PER_KWH};
pub use integration::{integrate, integrate_per_device, DailyEnergy, IntegrationScope};
pub use summary::{resolve_summary, summarize};
