//! Three-phase greedy allocator: high priority pinned, then mid and low floating.

use tracing::{debug, info};

use crate::demand::Demand;
use crate::error::SchedError;
use crate::profile::HourlyProfile;

use super::state::ScheduleState;
use super::types::{Assignment, Placement, Schedule, Scheduler, Subtask};

/// Greedy priority scheduler.
///
/// Phases run strictly in order and are never revisited:
///
/// 1. High priority: each hour's demand takes as much green as the hour supplies.
/// 2. Mid priority, in input order: the whole subtask goes green to the first
///    window hour (cheapest green price, then most remaining green) that can
///    hold it, otherwise fully traditional at the cheapest traditional hour.
/// 3. Low priority, same rule as phase 2.
///
/// Single pass, no backtracking. The traditional fallback does not look at
/// existing load in the chosen hour: traditional capacity is modeled as
/// unlimited.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyScheduler;

impl GreedyScheduler {
    /// Phase 1: commits every high-priority subtask in its fixed hour.
    fn schedule_high(
        &self,
        state: &mut ScheduleState,
        tasks: &[Subtask],
        out: &mut Vec<Assignment>,
    ) {
        for task in tasks {
            let Placement::Fixed { hour } = task.placement else {
                continue;
            };
            let green = state.take_up_to(hour, task.energy);
            out.push(Assignment {
                subtask: task.id,
                priority: task.priority,
                hour,
                green_used: green,
                trad_used: task.energy - green,
            });
        }
    }

    /// Phases 2 and 3: places each floating subtask atomically in one hour.
    fn schedule_floating(
        &self,
        profile: &HourlyProfile,
        state: &mut ScheduleState,
        tasks: &[Subtask],
        out: &mut Vec<Assignment>,
    ) {
        for task in tasks {
            let assignment = self.place(profile, state, task);
            out.push(assignment);
        }
    }

    fn place(
        &self,
        profile: &HourlyProfile,
        state: &mut ScheduleState,
        task: &Subtask,
    ) -> Assignment {
        let window = task.placement.candidate_hours();
        debug_assert!(!window.is_empty(), "subtask {} has an empty window", task.id);
        let mut candidates = window.clone();
        // Stable sort: ties keep window order.
        candidates.sort_by(|&a, &b| {
            profile
                .green_price(a)
                .total_cmp(&profile.green_price(b))
                .then(state.remaining(b).total_cmp(&state.remaining(a)))
        });

        if let Some(&hour) = candidates
            .iter()
            .find(|&&h| state.remaining(h) >= task.energy)
        {
            state.consume(hour, task.energy);
            return Assignment {
                subtask: task.id,
                priority: task.priority,
                hour,
                green_used: task.energy,
                trad_used: 0.0,
            };
        }

        // First minimum in window order.
        let hour = window
            .into_iter()
            .min_by(|&a, &b| profile.trad_price(a).total_cmp(&profile.trad_price(b)))
            .unwrap_or_else(|| task.placement.anchor_hour());
        debug!(
            subtask = %task.id,
            hour,
            energy = task.energy,
            "no green slot, falling back to traditional"
        );
        Assignment {
            subtask: task.id,
            priority: task.priority,
            hour,
            green_used: 0.0,
            trad_used: task.energy,
        }
    }
}

impl Scheduler for GreedyScheduler {
    fn name(&self) -> &'static str {
        "greedy"
    }

    fn schedule(&self, profile: &HourlyProfile, demand: &Demand) -> Result<Schedule, SchedError> {
        let mut state = ScheduleState::from_profile(profile);
        let mut assignments = Vec::with_capacity(demand.len());

        self.schedule_high(&mut state, &demand.high, &mut assignments);
        debug!(count = demand.high.len(), "high-priority phase done");

        self.schedule_floating(profile, &mut state, &demand.mid, &mut assignments);
        debug!(count = demand.mid.len(), "mid-priority phase done");

        self.schedule_floating(profile, &mut state, &demand.low, &mut assignments);
        debug!(count = demand.low.len(), "low-priority phase done");

        let green_left: f64 = state.remaining_all().iter().sum();
        info!(
            subtasks = assignments.len(),
            green_left, "greedy schedule complete"
        );

        Ok(Schedule {
            strategy: self.name(),
            assignments,
            objective: None,
        })
    }
}
