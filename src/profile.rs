//! Immutable hourly price and green-supply curves.

use serde::Serialize;

use crate::error::SchedError;

/// Number of hourly slots in the scheduling horizon.
pub const HOURS: usize = 24;

/// Per-hour traditional price, green price and green supply.
///
/// Built once from input and never mutated during a scheduling run.
/// Every value is finite and non-negative.
///
/// # Examples
///
/// ```
/// use energy_sched::profile::{HourlyProfile, HOURS};
///
/// let profile = HourlyProfile::uniform(1.0, 0.4, 500.0);
/// assert_eq!(profile.green_supply(3), 500.0);
/// assert_eq!(profile.trad_prices().len(), HOURS);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyProfile {
    trad_price: [f64; HOURS],
    green_price: [f64; HOURS],
    green_supply: [f64; HOURS],
}

impl HourlyProfile {
    /// Creates a profile from three aligned hourly tables.
    ///
    /// # Errors
    ///
    /// Returns `SchedError::InvalidProfile` for the first negative or
    /// non-finite value encountered.
    pub fn new(
        trad_price: [f64; HOURS],
        green_price: [f64; HOURS],
        green_supply: [f64; HOURS],
    ) -> Result<Self, SchedError> {
        let tables: [(&'static str, &[f64; HOURS]); 3] = [
            ("trad_price", &trad_price),
            ("green_price", &green_price),
            ("green_supply", &green_supply),
        ];
        for (field, values) in tables {
            for (hour, &value) in values.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(SchedError::InvalidProfile { hour, field, value });
                }
            }
        }
        Ok(Self {
            trad_price,
            green_price,
            green_supply,
        })
    }

    /// Profile with the same prices and supply in every hour.
    ///
    /// Values are clamped to zero if negative.
    pub fn uniform(trad_price: f64, green_price: f64, green_supply: f64) -> Self {
        Self {
            trad_price: [trad_price.max(0.0); HOURS],
            green_price: [green_price.max(0.0); HOURS],
            green_supply: [green_supply.max(0.0); HOURS],
        }
    }

    /// Traditional price at `hour` (currency per energy unit).
    pub fn trad_price(&self, hour: usize) -> f64 {
        self.trad_price[hour]
    }

    /// Green price at `hour` (currency per energy unit).
    pub fn green_price(&self, hour: usize) -> f64 {
        self.green_price[hour]
    }

    /// Green supply available at `hour` (energy units).
    pub fn green_supply(&self, hour: usize) -> f64 {
        self.green_supply[hour]
    }

    pub fn trad_prices(&self) -> &[f64; HOURS] {
        &self.trad_price
    }

    pub fn green_prices(&self) -> &[f64; HOURS] {
        &self.green_price
    }

    pub fn green_supplies(&self) -> &[f64; HOURS] {
        &self.green_supply
    }

    /// Total green supply over the day.
    pub fn total_green_supply(&self) -> f64 {
        self.green_supply.iter().sum()
    }
}
