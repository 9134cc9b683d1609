//! Schedulers, the MILP model and cost reporting.

pub mod greedy;
pub mod in_place;
pub mod kpi;
pub mod milp;
pub mod optimal;
pub mod state;
pub mod types;

pub use greedy::GreedyScheduler;
pub use in_place::InPlaceScheduler;
pub use kpi::CostReport;
pub use optimal::{OptimalParams, OptimalScheduler};
pub use types::{Assignment, Priority, Schedule, Scheduler, Subtask, SubtaskId};
