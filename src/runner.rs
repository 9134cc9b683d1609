//! End-to-end run: distribute demand, apply one or more strategies, report.

use tracing::info;

use crate::config::ScenarioConfig;
use crate::demand::{Demand, DemandDistributor, TaskRow};
use crate::error::SchedError;
use crate::perturb::RobustnessGenerator;
use crate::profile::HourlyProfile;
use crate::sched::{
    CostReport, GreedyScheduler, InPlaceScheduler, OptimalParams, OptimalScheduler, Schedule,
    Scheduler,
};

/// Which scheduler(s) a run applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Greedy,
    Optimal,
    InPlace,
    /// In-place baseline, greedy and optimal on the same demand.
    Compare,
}

impl Strategy {
    /// Parses a strategy name as used in configuration and on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "greedy" => Some(Self::Greedy),
            "optimal" => Some(Self::Optimal),
            "in_place" => Some(Self::InPlace),
            "compare" => Some(Self::Compare),
            _ => None,
        }
    }

    /// Schedulers to run, baseline first when comparing.
    pub fn schedulers(self, config: &ScenarioConfig) -> Vec<Box<dyn Scheduler>> {
        let optimal = || -> Box<dyn Scheduler> {
            Box::new(OptimalScheduler::new(OptimalParams::from_config(
                &config.optimal,
            )))
        };
        match self {
            Self::Greedy => vec![Box::new(GreedyScheduler)],
            Self::Optimal => vec![optimal()],
            Self::InPlace => vec![Box::new(InPlaceScheduler)],
            Self::Compare => vec![
                Box::new(InPlaceScheduler),
                Box::new(GreedyScheduler),
                optimal(),
            ],
        }
    }
}

/// One strategy's schedule together with its cost report.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub schedule: Schedule,
    pub report: CostReport,
}

/// Result of a full run over one profile and task table.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub demand: Demand,
    pub outcomes: Vec<RunOutcome>,
}

impl RunResult {
    /// Report of the named strategy, if it ran.
    pub fn report(&self, strategy: &str) -> Option<&CostReport> {
        self.outcomes
            .iter()
            .map(|o| &o.report)
            .find(|r| r.strategy == strategy)
    }
}

/// Distributes `tasks` and applies every scheduler of `strategy`.
///
/// # Arguments
///
/// * `config` - Validated scenario configuration
/// * `strategy` - Strategy (or comparison) to apply
/// * `profile` - Prices and green supply for the day
/// * `tasks` - Raw task table
///
/// # Errors
///
/// Returns the first distribution or scheduling error.
pub fn run(
    config: &ScenarioConfig,
    strategy: Strategy,
    profile: &HourlyProfile,
    tasks: &[TaskRow],
) -> Result<RunResult, SchedError> {
    let demand = DemandDistributor::from_config(&config.demand).distribute(tasks)?;
    info!(
        subtasks = demand.len(),
        energy = demand.total_energy(),
        rejected = demand.rejected.len(),
        "demand distributed"
    );

    let mut outcomes = Vec::new();
    for scheduler in strategy.schedulers(config) {
        let schedule = scheduler.schedule(profile, &demand)?;
        let report = CostReport::from_schedule(profile, &schedule);
        info!(
            strategy = scheduler.name(),
            total_cost = report.total_cost,
            avg_utilization_pct = report.avg_utilization_pct,
            "schedule complete"
        );
        outcomes.push(RunOutcome { schedule, report });
    }
    Ok(RunResult { demand, outcomes })
}

/// Cost and utilization of one strategy on one perturbed variant.
#[derive(Debug, Clone)]
pub struct VariantOutcome {
    pub index: usize,
    pub reports: Vec<CostReport>,
}

/// Runs `strategy` on `count` seeded perturbations of the input day.
///
/// # Errors
///
/// Returns the first error from any variant's run. No further variants are
/// started after a failure, so a timed-out microlp worker is never joined by
/// a second one.
pub fn run_robustness(
    config: &ScenarioConfig,
    strategy: Strategy,
    profile: &HourlyProfile,
    tasks: &[TaskRow],
    count: usize,
) -> Result<Vec<VariantOutcome>, SchedError> {
    let mut generator = RobustnessGenerator::new(config.robustness.seed);
    generator
        .generate(profile, tasks, count)
        .into_iter()
        .map(|variant| -> Result<VariantOutcome, SchedError> {
            let result = run(config, strategy, &variant.profile, &variant.tasks)?;
            Ok(VariantOutcome {
                index: variant.index,
                reports: result.outcomes.into_iter().map(|o| o.report).collect(),
            })
        })
        .collect()
}
