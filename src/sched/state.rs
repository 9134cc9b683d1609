//! Per-run green-capacity bookkeeping for sequential schedulers.

use crate::profile::{HOURS, HourlyProfile};

use super::types::ENERGY_EPS;

/// Remaining green energy per hour during one scheduling run.
///
/// Created from the profile at the start of a run, passed by exclusive
/// reference through the phases, and dropped when the run ends. Values only
/// decrease.
#[derive(Debug, Clone)]
pub struct ScheduleState {
    remaining_green: [f64; HOURS],
}

impl ScheduleState {
    /// Initializes remaining green energy to the full supply of every hour.
    pub fn from_profile(profile: &HourlyProfile) -> Self {
        Self {
            remaining_green: *profile.green_supplies(),
        }
    }

    /// Green energy still available at `hour`.
    pub fn remaining(&self, hour: usize) -> f64 {
        self.remaining_green[hour]
    }

    pub fn remaining_all(&self) -> &[f64; HOURS] {
        &self.remaining_green
    }

    /// Consumes up to `wanted` green energy at `hour` and returns the amount taken.
    pub fn take_up_to(&mut self, hour: usize, wanted: f64) -> f64 {
        let taken = wanted.min(self.remaining_green[hour]).max(0.0);
        self.consume(hour, taken);
        taken
    }

    /// Consumes exactly `amount` green energy at `hour`.
    ///
    /// The caller must have checked availability; overdrawing is a logic fault.
    pub fn consume(&mut self, hour: usize, amount: f64) {
        debug_assert!(
            amount <= self.remaining_green[hour] + ENERGY_EPS,
            "green capacity exceeded at hour {hour}: want {amount}, have {}",
            self.remaining_green[hour]
        );
        self.remaining_green[hour] = (self.remaining_green[hour] - amount).max(0.0);
    }
}
