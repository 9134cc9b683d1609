//! Baseline strategy without load shifting.

use tracing::info;

use crate::demand::Demand;
use crate::error::SchedError;
use crate::profile::HourlyProfile;

use super::state::ScheduleState;
use super::types::{Assignment, Placement, Schedule, Scheduler};

/// Runs every subtask in the hour it was distributed into.
///
/// Within an hour, demand draws green energy first and the rest from the
/// traditional source, so per-hour green usage is
/// `min(total demand, green supply)`. Used as the reference for savings.
#[derive(Debug, Default, Clone, Copy)]
pub struct InPlaceScheduler;

impl Scheduler for InPlaceScheduler {
    fn name(&self) -> &'static str {
        "in_place"
    }

    fn schedule(&self, profile: &HourlyProfile, demand: &Demand) -> Result<Schedule, SchedError> {
        let mut state = ScheduleState::from_profile(profile);
        let assignments: Vec<Assignment> = demand
            .subtasks()
            .map(|task| {
                let hour = match task.placement {
                    Placement::Fixed { hour } => hour,
                    Placement::Floating { publish_hour, .. } => publish_hour,
                };
                let green = state.take_up_to(hour, task.energy);
                Assignment {
                    subtask: task.id,
                    priority: task.priority,
                    hour,
                    green_used: green,
                    trad_used: task.energy - green,
                }
            })
            .collect();

        info!(subtasks = assignments.len(), "in-place schedule complete");
        Ok(Schedule {
            strategy: self.name(),
            assignments,
            objective: None,
        })
    }
}
