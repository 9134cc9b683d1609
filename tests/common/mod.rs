//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use energy_sched::demand::{Demand, DemandDistributor, EnergyFactors, TaskRow};
use energy_sched::profile::{HOURS, HourlyProfile};
use energy_sched::sched::types::{ENERGY_EPS, Placement};
use energy_sched::sched::{Priority, Schedule, Subtask, SubtaskId};

/// Builds a profile from per-hour closures.
pub fn profile_from(
    trad: impl Fn(usize) -> f64,
    green: impl Fn(usize) -> f64,
    supply: impl Fn(usize) -> f64,
) -> HourlyProfile {
    let mut t = [0.0; HOURS];
    let mut g = [0.0; HOURS];
    let mut s = [0.0; HOURS];
    for h in 0..HOURS {
        t[h] = trad(h);
        g[h] = green(h);
        s[h] = supply(h);
    }
    HourlyProfile::new(t, g, s).expect("valid test profile")
}

/// A floating subtask with a full-day window.
pub fn floating(id: usize, priority: Priority, energy: f64, publish_hour: usize) -> Subtask {
    Subtask {
        id: SubtaskId(id),
        priority,
        energy,
        placement: Placement::Floating {
            publish_hour,
            window_hours: HOURS,
        },
    }
}

/// A fixed high-priority subtask.
pub fn fixed(id: usize, energy: f64, hour: usize) -> Subtask {
    Subtask {
        id: SubtaskId(id),
        priority: Priority::High,
        energy,
        placement: Placement::Fixed { hour },
    }
}

/// Small task table used for solver comparisons.
pub fn small_tasks() -> Vec<TaskRow> {
    vec![
        TaskRow::new("08:00-10:00", 2.0, 2.0, 2.0),
        TaskRow::new("11:00-12:00", 0.0, 1.0, 1.0),
    ]
}

/// Distributes `tasks` with default factors and the given window length.
pub fn distribute(tasks: &[TaskRow], window_hours: usize) -> Demand {
    DemandDistributor::new(EnergyFactors::default())
        .with_window_hours(window_hours)
        .distribute(tasks)
        .unwrap()
}

/// Every subtask appears exactly once and its green and traditional
/// parts add up to its demand.
pub fn assert_conservation(demand: &Demand, schedule: &Schedule) {
    assert_eq!(schedule.assignments.len(), demand.len());
    for task in demand.subtasks() {
        let matching: Vec<_> = schedule
            .assignments
            .iter()
            .filter(|a| a.subtask == task.id)
            .collect();
        assert_eq!(matching.len(), 1, "subtask {} placed once", task.id);
        let a = matching[0];
        assert!(a.green_used >= -ENERGY_EPS && a.trad_used >= -ENERGY_EPS);
        assert!(
            (a.green_used + a.trad_used - task.energy).abs() < 1e-4,
            "subtask {}: {} + {} != {}",
            task.id,
            a.green_used,
            a.trad_used,
            task.energy
        );
        assert!(task.placement.allows(a.hour), "subtask {} outside window", task.id);
    }
}

/// Green use per hour never exceeds supply.
pub fn assert_capacity(profile: &HourlyProfile, schedule: &Schedule) {
    let green = schedule.green_by_hour();
    for h in 0..HOURS {
        assert!(
            green[h] <= profile.green_supply(h) + 1e-4,
            "hour {h}: {} > {}",
            green[h],
            profile.green_supply(h)
        );
    }
}
