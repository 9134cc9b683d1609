//! Post-hoc cost and green-utilization report from a schedule.

use std::fmt;

use serde::Serialize;

use crate::profile::{HOURS, HourlyProfile};

use super::types::{Assignment, Schedule};

/// Cost and utilization figures derived from a set of assignments.
///
/// Computed the same way for every strategy, so reports from different
/// schedulers are directly comparable. `total_cost` is pure currency and
/// never includes model incentive terms.
#[derive(Debug, Clone, Serialize)]
pub struct CostReport {
    /// Producing strategy.
    pub strategy: String,
    /// `Σ_h green_used[h]·green_price[h] + trad_used[h]·trad_price[h]`.
    pub total_cost: f64,
    /// Raw solver objective, if the strategy has one.
    pub objective: Option<f64>,
    /// Green energy used per hour.
    pub green_usage: [f64; HOURS],
    /// Traditional energy used per hour.
    pub trad_usage: [f64; HOURS],
    /// Green share of each hour's consumption, in percent (0 when nothing runs).
    pub utilization_pct: [f64; HOURS],
    /// Mean of `utilization_pct` over the 24 hours.
    pub avg_utilization_pct: f64,
    pub total_green: f64,
    pub total_trad: f64,
}

impl CostReport {
    /// Builds the report for a schedule.
    pub fn from_schedule(profile: &HourlyProfile, schedule: &Schedule) -> Self {
        let mut report = Self::from_assignments(profile, &schedule.assignments);
        report.strategy = schedule.strategy.to_string();
        report.objective = schedule.objective;
        report
    }

    /// Sums green and traditional energy per hour and prices it.
    ///
    /// # Arguments
    ///
    /// * `profile` - Prices used to value each hour's energy
    /// * `assignments` - Assignments from any strategy
    pub fn from_assignments(profile: &HourlyProfile, assignments: &[Assignment]) -> Self {
        let mut green = [0.0; HOURS];
        let mut trad = [0.0; HOURS];
        for a in assignments {
            green[a.hour] += a.green_used;
            trad[a.hour] += a.trad_used;
        }

        let mut utilization = [0.0; HOURS];
        let mut total_cost = 0.0;
        for h in 0..HOURS {
            let used = green[h] + trad[h];
            utilization[h] = if used > 0.0 {
                green[h] / used * 100.0
            } else {
                0.0
            };
            total_cost += green[h] * profile.green_price(h) + trad[h] * profile.trad_price(h);
        }

        Self {
            strategy: String::new(),
            total_cost,
            objective: None,
            green_usage: green,
            trad_usage: trad,
            utilization_pct: utilization,
            avg_utilization_pct: utilization.iter().sum::<f64>() / HOURS as f64,
            total_green: green.iter().sum(),
            total_trad: trad.iter().sum(),
        }
    }

    /// Absolute and percentage savings relative to `baseline`.
    ///
    /// The percentage is 0 when the baseline cost is 0.
    pub fn savings_vs(&self, baseline: &CostReport) -> (f64, f64) {
        let saved = baseline.total_cost - self.total_cost;
        let pct = if baseline.total_cost > 0.0 {
            100.0 * saved / baseline.total_cost
        } else {
            0.0
        };
        (saved, pct)
    }
}

impl fmt::Display for CostReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Cost Report ({}) ---", self.strategy)?;
        writeln!(f, "Total cost:            {:.2}", self.total_cost)?;
        if let Some(obj) = self.objective {
            writeln!(f, "Model objective:       {obj:.2}")?;
        }
        writeln!(f, "Green energy used:     {:.2}", self.total_green)?;
        writeln!(f, "Traditional used:      {:.2}", self.total_trad)?;
        write!(f, "Avg green utilization: {:.2}%", self.avg_utilization_pct)
    }
}
