use std::collections::BTreeMap;

use serde::Deserialize;
use time::{Date, UtcOffset};

use crate::domain::Reading;

/// Accumulated watt-hours keyed by UTC calendar date.
pub type DailyEnergy = BTreeMap<Date, f64>;

/// Which readings count as neighbours when integrating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationScope {
    /// One pass over the time-ordered readings of every device combined.
    /// Consecutive samples of different devices are averaged together.
    #[default]
    Pooled,
    /// Integrate each device's own sequence and sum the results.
    PerDevice,
}

impl IntegrationScope {
    /// `readings` must be ordered by `(timestamp, id)`.
    pub fn integrate(self, readings: &[Reading]) -> DailyEnergy {
        match self {
            Self::Pooled => integrate(readings),
            Self::PerDevice => integrate_per_device(readings),
        }
    }
}

/// Trapezoidal energy of one interval, in watt-hours.
///
/// Out-of-order pairs contribute nothing.
pub fn pair_energy_wh(prev: &Reading, curr: &Reading) -> f64 {
    let mut seconds = (curr.timestamp - prev.timestamp).as_seconds_f64();
    if seconds < 0.0 {
        tracing::warn!(
            prev_id = prev.id,
            curr_id = curr.id,
            seconds,
            "readings out of order, clamping interval to zero"
        );
        seconds = 0.0;
    }

    let avg_watts = (prev.watts + curr.watts) / 2.0;
    avg_watts * seconds / 3600.0
}

fn accumulate<'a, I>(readings: I, energy: &mut DailyEnergy)
where
    I: IntoIterator<Item = &'a Reading>,
{
    let mut iter = readings.into_iter();
    let Some(mut prev) = iter.next() else {
        return;
    };

    for curr in iter {
        // The whole interval is credited to the day it starts on, even when it
        // runs past midnight.
        let day = prev.timestamp.to_offset(UtcOffset::UTC).date();
        *energy.entry(day).or_insert(0.0) += pair_energy_wh(prev, curr);
        prev = curr;
    }
}

/// Integrate an ordered sequence as a single stream.
pub fn integrate(readings: &[Reading]) -> DailyEnergy {
    let mut energy = DailyEnergy::new();
    accumulate(readings, &mut energy);
    energy
}

/// Integrate each device separately, preserving the input order within a
/// device, and sum the per-day totals.
pub fn integrate_per_device(readings: &[Reading]) -> DailyEnergy {
    let mut by_device: BTreeMap<&str, Vec<&Reading>> = BTreeMap::new();
    for r in readings {
        by_device.entry(r.device.as_str()).or_default().push(r);
    }

    let mut energy = DailyEnergy::new();
    for stream in by_device.into_values() {
        accumulate(stream, &mut energy);
    }
    energy
}
