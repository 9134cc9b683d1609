//! Conversion of interval-based task counts into per-hour energy subtasks.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DemandConfig;
use crate::error::{FormatError, SchedError};
use crate::profile::HOURS;
use crate::sched::types::{Placement, Priority, Subtask, SubtaskId};

/// Energy consumed per task unit for each priority class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyFactors {
    pub high: f64,
    pub mid: f64,
    pub low: f64,
}

impl Default for EnergyFactors {
    fn default() -> Self {
        Self {
            high: 80.0,
            mid: 50.0,
            low: 30.0,
        }
    }
}

/// One raw row of the task table, as supplied by a loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRow {
    /// Time range in `"HH:MM-HH:MM"` form.
    pub time_range: String,
    /// High-priority task count.
    pub high: f64,
    /// Mid-priority task count.
    pub mid: f64,
    /// Low-priority task count.
    pub low: f64,
}

impl TaskRow {
    pub fn new(time_range: impl Into<String>, high: f64, mid: f64, low: f64) -> Self {
        Self {
            time_range: time_range.into(),
            high,
            mid,
            low,
        }
    }
}

/// Half-open hour range `[start_hour, end_hour)` with per-class task counts.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskInterval {
    pub start_hour: usize,
    pub end_hour: usize,
    pub high: f64,
    pub mid: f64,
    pub low: f64,
}

impl TaskInterval {
    /// Parses a raw task row.
    ///
    /// Only the hour part of each `HH:MM` bound is used. A range whose end is
    /// not after its start is a valid zero-length interval.
    ///
    /// # Errors
    ///
    /// Returns a `FormatError` if the range is not `"HH:MM-HH:MM"`, an hour
    /// lies outside `0..=24`, a minute outside `0..=59`, or a count is
    /// negative or not finite.
    ///
    /// # Examples
    ///
    /// ```
    /// use energy_sched::demand::{TaskInterval, TaskRow};
    ///
    /// let row = TaskRow::new("22:00-24:00", 0.0, 20.0, 15.0);
    /// let interval = TaskInterval::parse(&row).unwrap();
    /// assert_eq!(interval.hours(), 22..24);
    /// assert!(TaskInterval::parse(&TaskRow::new("8-12", 1.0, 0.0, 0.0)).is_err());
    /// ```
    pub fn parse(row: &TaskRow) -> Result<Self, FormatError> {
        let (start_hour, end_hour) = parse_range(&row.time_range)?;
        for (label, count) in [("high", row.high), ("mid", row.mid), ("low", row.low)] {
            if !count.is_finite() || count < 0.0 {
                return Err(FormatError::new(
                    row.time_range.as_str(),
                    format!("{label} count {count} must be a non-negative number"),
                ));
            }
        }
        Ok(Self {
            start_hour,
            end_hour,
            high: row.high,
            mid: row.mid,
            low: row.low,
        })
    }

    /// Covered hours; empty for zero-length intervals.
    pub fn hours(&self) -> Range<usize> {
        if self.end_hour > self.start_hour {
            self.start_hour..self.end_hour
        } else {
            self.start_hour..self.start_hour
        }
    }

    pub fn num_hours(&self) -> usize {
        self.hours().len()
    }
}

fn parse_range(s: &str) -> Result<(usize, usize), FormatError> {
    let (start, end) = s
        .trim()
        .split_once('-')
        .ok_or_else(|| FormatError::new(s, "expected \"HH:MM-HH:MM\""))?;
    Ok((parse_clock(start, s)?, parse_clock(end, s)?))
}

fn parse_clock(part: &str, whole: &str) -> Result<usize, FormatError> {
    let (hh, mm) = part
        .trim()
        .split_once(':')
        .ok_or_else(|| FormatError::new(whole, format!("\"{part}\" is not HH:MM")))?;
    let hour: usize = hh
        .trim()
        .parse()
        .map_err(|_| FormatError::new(whole, format!("hour \"{hh}\" is not an integer")))?;
    let minute: usize = mm
        .trim()
        .parse()
        .map_err(|_| FormatError::new(whole, format!("minute \"{mm}\" is not an integer")))?;
    if hour > HOURS {
        return Err(FormatError::new(whole, format!("hour {hour} out of range 0..=24")));
    }
    if minute > 59 {
        return Err(FormatError::new(whole, format!("minute {minute} out of range 0..=59")));
    }
    Ok(hour)
}

/// Subtasks derived from a task table.
///
/// IDs are assigned high first (hour order), then mid and low in table order.
#[derive(Debug, Clone, Default)]
pub struct Demand {
    /// At most one fixed subtask per hour, aggregating all high demand of that hour.
    pub high: Vec<Subtask>,
    /// Floating mid-priority subtasks, one per (interval, hour) pair.
    pub mid: Vec<Subtask>,
    /// Floating low-priority subtasks, one per (interval, hour) pair.
    pub low: Vec<Subtask>,
    /// Rows skipped because they could not be parsed.
    pub rejected: Vec<FormatError>,
}

impl Demand {
    /// High-priority energy per hour (0 where no high demand exists).
    pub fn high_energy_by_hour(&self) -> [f64; HOURS] {
        let mut energy = [0.0; HOURS];
        for task in &self.high {
            if let Placement::Fixed { hour } = task.placement {
                energy[hour] += task.energy;
            }
        }
        energy
    }

    /// Mid subtasks followed by low subtasks.
    pub fn floating(&self) -> impl Iterator<Item = &Subtask> {
        self.mid.iter().chain(self.low.iter())
    }

    /// All subtasks in ID order.
    pub fn subtasks(&self) -> impl Iterator<Item = &Subtask> {
        self.high.iter().chain(self.floating())
    }

    pub fn len(&self) -> usize {
        self.high.len() + self.mid.len() + self.low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total energy demand across all subtasks.
    pub fn total_energy(&self) -> f64 {
        self.subtasks().map(|t| t.energy).sum()
    }
}

/// Splits interval task counts evenly over covered hours and converts them to energy.
#[derive(Debug, Clone)]
pub struct DemandDistributor {
    factors: EnergyFactors,
    window_hours: usize,
    strict: bool,
}

impl Default for DemandDistributor {
    fn default() -> Self {
        Self::new(EnergyFactors::default())
    }
}

impl DemandDistributor {
    /// Distributor with a full-day window and non-strict parsing.
    pub fn new(factors: EnergyFactors) -> Self {
        Self {
            factors,
            window_hours: HOURS,
            strict: false,
        }
    }

    pub fn from_config(cfg: &DemandConfig) -> Self {
        Self::new(cfg.factors())
            .with_window_hours(cfg.window_hours)
            .with_strict(cfg.strict_format)
    }

    /// Narrows the rotating window of floating subtasks (clamped to `1..=24`).
    pub fn with_window_hours(mut self, window_hours: usize) -> Self {
        self.window_hours = window_hours.clamp(1, HOURS);
        self
    }

    /// Makes the first malformed row abort the whole distribution.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn factors(&self) -> EnergyFactors {
        self.factors
    }

    /// Parses and distributes raw task rows.
    ///
    /// In non-strict mode a malformed row contributes nothing and is kept in
    /// [`Demand::rejected`].
    ///
    /// # Errors
    ///
    /// In strict mode, returns `SchedError::Format` for the first malformed row.
    pub fn distribute(&self, rows: &[TaskRow]) -> Result<Demand, SchedError> {
        let mut intervals = Vec::with_capacity(rows.len());
        let mut rejected = Vec::new();
        for row in rows {
            match TaskInterval::parse(row) {
                Ok(interval) => intervals.push(interval),
                Err(e) if self.strict => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "skipping task row");
                    rejected.push(e);
                }
            }
        }
        let mut demand = self.distribute_intervals(&intervals);
        demand.rejected = rejected;
        Ok(demand)
    }

    /// Distributes already-parsed intervals.
    pub fn distribute_intervals(&self, intervals: &[TaskInterval]) -> Demand {
        let mut high_energy = [0.0; HOURS];
        let mut mid = Vec::new();
        let mut low = Vec::new();

        for interval in intervals {
            let n = interval.num_hours();
            if n == 0 {
                debug!(
                    start = interval.start_hour,
                    end = interval.end_hour,
                    "ignoring zero-length interval"
                );
                continue;
            }
            let n = n as f64;
            let per_high = interval.high / n * self.factors.high;
            let per_mid = interval.mid / n * self.factors.mid;
            let per_low = interval.low / n * self.factors.low;

            for hour in interval.hours() {
                high_energy[hour] += per_high;
                if per_mid > 0.0 {
                    mid.push(self.floating(Priority::Mid, per_mid, hour));
                }
                if per_low > 0.0 {
                    low.push(self.floating(Priority::Low, per_low, hour));
                }
            }
        }

        let mut next_id = 0;
        let high = high_energy
            .iter()
            .enumerate()
            .filter(|(_, e)| **e > 0.0)
            .map(|(hour, &energy)| Subtask {
                id: SubtaskId(0),
                priority: Priority::High,
                energy,
                placement: Placement::Fixed { hour },
            })
            .collect::<Vec<_>>();

        let mut demand = Demand {
            high,
            mid,
            low,
            rejected: Vec::new(),
        };
        for task in demand
            .high
            .iter_mut()
            .chain(demand.mid.iter_mut())
            .chain(demand.low.iter_mut())
        {
            task.id = SubtaskId(next_id);
            next_id += 1;
        }

        debug!(
            high = demand.high.len(),
            mid = demand.mid.len(),
            low = demand.low.len(),
            energy = demand.total_energy(),
            "distributed demand"
        );
        demand
    }

    fn floating(&self, priority: Priority, energy: f64, publish_hour: usize) -> Subtask {
        Subtask {
            id: SubtaskId(0),
            priority,
            energy,
            placement: Placement::Floating {
                publish_hour,
                window_hours: self.window_hours,
            },
        }
    }
}
