use super::daily::round_to;
use crate::domain::{Co2Estimate, DailyBucket};

pub const DEFAULT_FACTOR_KG_CO2_PER_KWH: f64 = 0.5;

/// Converts aggregated energy into an estimated CO2 mass using a single
/// emissions factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionsCalculator {
    factor_kg_co2_per_kwh: f64,
}

impl Default for EmissionsCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_FACTOR_KG_CO2_PER_KWH)
    }
}

impl EmissionsCalculator {
    pub fn new(factor_kg_co2_per_kwh: f64) -> Self {
        Self {
            factor_kg_co2_per_kwh,
        }
    }

    pub fn factor(&self) -> f64 {
        self.factor_kg_co2_per_kwh
    }

    /// Sums the (already rounded) kWh of each bucket; both totals are rounded
    /// to 3 decimals.
    pub fn estimate(&self, series: &[DailyBucket]) -> Co2Estimate {
        let kwh: f64 = series.iter().map(|b| b.kwh).sum();
        let kg_co2 = kwh * self.factor_kg_co2_per_kwh;
        Co2Estimate {
            kwh: round_to(kwh, 3),
            kg_co2: round_to(kg_co2, 3),
            factor: self.factor_kg_co2_per_kwh,
        }
    }
}
