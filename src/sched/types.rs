//! Core scheduling types: subtasks, placements, assignments and the strategy contract.

use std::fmt;

use serde::Serialize;

use crate::demand::Demand;
use crate::error::SchedError;
use crate::profile::{HOURS, HourlyProfile};

/// Absolute tolerance used for energy comparisons after floating-point arithmetic.
pub const ENERGY_EPS: f64 = 1e-6;

/// Priority class of a subtask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Mid,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::High => "high",
            Priority::Mid => "mid",
            Priority::Low => "low",
        };
        f.write_str(s)
    }
}

/// Stable identifier of a subtask within one [`Demand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubtaskId(pub usize);

impl fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a subtask is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Pinned to one hour (high priority).
    Fixed { hour: usize },
    /// Any hour of the rotating window `(publish_hour + i) mod 24`, `i < window_hours`.
    ///
    /// `window_hours` is clamped to `1..=24`, so the publish hour is always allowed.
    Floating {
        publish_hour: usize,
        window_hours: usize,
    },
}

impl Placement {
    /// Candidate hours in window order.
    pub fn candidate_hours(&self) -> Vec<usize> {
        match *self {
            Placement::Fixed { hour } => vec![hour],
            Placement::Floating {
                publish_hour,
                window_hours,
            } => rotating_window(publish_hour, window_hours).collect(),
        }
    }

    /// Whether `hour` is an allowed hour for this placement.
    pub fn allows(&self, hour: usize) -> bool {
        match *self {
            Placement::Fixed { hour: h } => h == hour,
            Placement::Floating {
                publish_hour,
                window_hours,
            } => (hour + HOURS - publish_hour) % HOURS < window_hours.clamp(1, HOURS),
        }
    }

    /// The fixed hour, or the publish hour of a floating window.
    pub fn anchor_hour(&self) -> usize {
        match *self {
            Placement::Fixed { hour } => hour,
            Placement::Floating { publish_hour, .. } => publish_hour,
        }
    }
}

/// Hours `(publish_hour + i) mod 24` for `i` in `0..len`, with `len` clamped to `1..=24`.
pub fn rotating_window(publish_hour: usize, len: usize) -> impl Iterator<Item = usize> {
    (0..len.clamp(1, HOURS)).map(move |i| (publish_hour + i) % HOURS)
}

/// Atomic unit of energy demand handled by the schedulers.
#[derive(Debug, Clone, PartialEq)]
pub struct Subtask {
    pub id: SubtaskId,
    pub priority: Priority,
    /// Energy demand (energy units, > 0).
    pub energy: f64,
    pub placement: Placement,
}

/// One subtask placed in one hour, split between green and traditional energy.
///
/// Invariant: `green_used + trad_used == energy` of the subtask, both >= 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub subtask: SubtaskId,
    pub priority: Priority,
    pub hour: usize,
    pub green_used: f64,
    pub trad_used: f64,
}

impl Assignment {
    /// Total energy delivered to the subtask.
    pub fn energy(&self) -> f64 {
        self.green_used + self.trad_used
    }
}

/// Output of one scheduling run, independent of the strategy that produced it.
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Name of the producing strategy.
    pub strategy: &'static str,
    /// One assignment per subtask, in subtask order.
    pub assignments: Vec<Assignment>,
    /// Raw model objective, including incentive terms, when the strategy has one.
    ///
    /// Not a currency figure; compare costs through the aggregator instead.
    pub objective: Option<f64>,
}

impl Schedule {
    /// Green energy committed per hour.
    pub fn green_by_hour(&self) -> [f64; HOURS] {
        let mut green = [0.0; HOURS];
        for a in &self.assignments {
            green[a.hour] += a.green_used;
        }
        green
    }

    /// Verifies that green usage never exceeds supply in any hour.
    ///
    /// # Errors
    ///
    /// Returns `SchedError::CapacityExceeded` for the first overrun hour.
    pub fn check_capacity(&self, profile: &HourlyProfile) -> Result<(), SchedError> {
        for (hour, used) in self.green_by_hour().into_iter().enumerate() {
            let supply = profile.green_supply(hour);
            if used > supply + ENERGY_EPS * supply.max(1.0) {
                return Err(SchedError::CapacityExceeded { hour, used, supply });
            }
        }
        Ok(())
    }
}

/// A scheduling strategy over an hourly profile and distributed demand.
///
/// All strategies return the same [`Schedule`] representation so they can be
/// swapped freely and aggregated by the same cost report.
pub trait Scheduler {
    /// Short strategy name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Assigns every subtask of `demand` to an hour and an energy split.
    ///
    /// # Errors
    ///
    /// Returns a `SchedError` if the strategy cannot produce a schedule.
    fn schedule(&self, profile: &HourlyProfile, demand: &Demand) -> Result<Schedule, SchedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_window_wraps_from_publish_hour() {
        let hours: Vec<usize> = rotating_window(22, 24).collect();
        assert_eq!(hours.len(), 24);
        assert_eq!(&hours[..3], &[22, 23, 0]);
        assert_eq!(hours[23], 21);
    }

    #[test]
    fn window_is_capped_at_one_day() {
        assert_eq!(rotating_window(5, 40).count(), 24);
    }

    #[test]
    fn narrowed_window_membership() {
        let p = Placement::Floating {
            publish_hour: 22,
            window_hours: 4,
        };
        assert!(p.allows(22));
        assert!(p.allows(1));
        assert!(!p.allows(2));
        assert!(!p.allows(21));
        assert_eq!(p.candidate_hours(), vec![22, 23, 0, 1]);
    }

    #[test]
    fn empty_window_keeps_publish_hour() {
        let p = Placement::Floating {
            publish_hour: 7,
            window_hours: 0,
        };
        assert_eq!(p.candidate_hours(), vec![7]);
        assert!(p.allows(7));
        assert!(!p.allows(8));
        assert_eq!(p.anchor_hour(), 7);
    }

    #[test]
    fn fixed_placement_allows_only_its_hour() {
        let p = Placement::Fixed { hour: 9 };
        assert!(p.allows(9));
        assert!(!p.allows(10));
        assert_eq!(p.candidate_hours(), vec![9]);
    }

    #[test]
    fn capacity_check_flags_overrun() {
        let profile = HourlyProfile::uniform(1.0, 0.5, 10.0);
        let schedule = Schedule {
            strategy: "test",
            assignments: vec![
                Assignment {
                    subtask: SubtaskId(0),
                    priority: Priority::Mid,
                    hour: 3,
                    green_used: 6.0,
                    trad_used: 0.0,
                },
                Assignment {
                    subtask: SubtaskId(1),
                    priority: Priority::Low,
                    hour: 3,
                    green_used: 6.0,
                    trad_used: 1.0,
                },
            ],
            objective: None,
        };
        assert!(matches!(
            schedule.check_capacity(&profile),
            Err(SchedError::CapacityExceeded { hour: 3, .. })
        ));
    }
}
