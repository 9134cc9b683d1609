//! Globally optimal strategy: one mixed-integer program over all subtasks.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::OptimalConfig;
use crate::demand::Demand;
use crate::error::SchedError;
use crate::profile::{HOURS, HourlyProfile};

use super::milp::{
    GoodLpSolver, LinearExpr, MilpModel, MilpSolution, MilpSolver, SolveBudget, SolveStatus,
    VarId, VarKind,
};
use super::types::{Assignment, Placement, Schedule, Scheduler, Subtask};

/// Incentive weights and solver budget of the optimal formulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimalParams {
    /// Reward per unit of green energy consumed.
    pub beta: f64,
    /// Reward per unit of green supply in the hour a floating subtask is placed.
    pub gamma: f64,
    pub budget: SolveBudget,
}

impl Default for OptimalParams {
    fn default() -> Self {
        Self {
            beta: 0.15,
            gamma: 0.05,
            budget: SolveBudget::default(),
        }
    }
}

impl OptimalParams {
    pub fn from_config(cfg: &OptimalConfig) -> Self {
        Self {
            beta: cfg.beta,
            gamma: cfg.gamma,
            budget: SolveBudget {
                time_limit: Duration::try_from_secs_f64(cfg.time_limit_secs)
                    .unwrap_or(SolveBudget::default().time_limit),
                gap_rel: cfg.gap_rel,
            },
        }
    }

    /// Pure cost minimization, no incentive terms.
    pub fn cost_only() -> Self {
        Self {
            beta: 0.0,
            gamma: 0.0,
            ..Self::default()
        }
    }
}

/// Variables of one floating subtask in one candidate hour.
#[derive(Debug, Clone, Copy)]
struct HourVars {
    hour: usize,
    assign: VarId,
    green: VarId,
    trad: VarId,
}

#[derive(Debug, Clone)]
struct FloatingVars {
    task: Subtask,
    hours: Vec<HourVars>,
}

/// Variable layout needed to read a solution back into assignments.
#[derive(Debug, Clone)]
pub struct ModelLayout {
    green_high: [VarId; HOURS],
    trad_high: [VarId; HOURS],
    high: Vec<Subtask>,
    floating: Vec<FloatingVars>,
}

/// Incrementally assembles the scheduling MILP.
///
/// High-priority variables for every hour are created up front; each floating
/// subtask adds one binary and two continuous variables per candidate hour.
pub struct OptimalModelBuilder<'a> {
    profile: &'a HourlyProfile,
    params: OptimalParams,
    model: MilpModel,
    green_high: [VarId; HOURS],
    trad_high: [VarId; HOURS],
    high_demand: [f64; HOURS],
    high: Vec<Subtask>,
    floating: Vec<FloatingVars>,
}

impl<'a> OptimalModelBuilder<'a> {
    pub fn new(profile: &'a HourlyProfile, params: OptimalParams) -> Self {
        let mut model = MilpModel::new();
        let green_high = std::array::from_fn(|h| {
            model.add_var(format!("green_high_{h}"), VarKind::NonNegative)
        });
        let trad_high = std::array::from_fn(|h| {
            model.add_var(format!("trad_high_{h}"), VarKind::NonNegative)
        });
        Self {
            profile,
            params,
            model,
            green_high,
            trad_high,
            high_demand: [0.0; HOURS],
            high: Vec::new(),
            floating: Vec::new(),
        }
    }

    /// Adds a subtask; fixed subtasks join their hour's high-priority demand.
    pub fn add_subtask(&mut self, task: &Subtask) -> &mut Self {
        match task.placement {
            Placement::Fixed { hour } => {
                self.high_demand[hour] += task.energy;
                self.high.push(task.clone());
            }
            Placement::Floating { .. } => self.add_floating(task),
        }
        self
    }

    fn add_floating(&mut self, task: &Subtask) {
        let idx = self.floating.len();
        let mut hours = Vec::new();
        let mut pick_one = LinearExpr::new();
        for hour in task.placement.candidate_hours() {
            let assign = self
                .model
                .add_var(format!("assign_{idx}_{hour}"), VarKind::Binary);
            let green = self
                .model
                .add_var(format!("green_{idx}_{hour}"), VarKind::NonNegative);
            let trad = self
                .model
                .add_var(format!("trad_{idx}_{hour}"), VarKind::NonNegative);
            // green + trad - energy·assign = 0
            self.model.add_eq(
                LinearExpr::new()
                    .with_term(green, 1.0)
                    .with_term(trad, 1.0)
                    .with_term(assign, -task.energy),
                0.0,
            );
            pick_one.add_term(assign, 1.0);
            hours.push(HourVars {
                hour,
                assign,
                green,
                trad,
            });
        }
        self.model.add_eq(pick_one, 1.0);
        self.floating.push(FloatingVars {
            task: task.clone(),
            hours,
        });
    }

    /// Adds balance and capacity constraints and the objective.
    pub fn build(mut self) -> (MilpModel, ModelLayout) {
        let p = self.profile;
        let OptimalParams { beta, gamma, .. } = self.params;
        let mut objective = LinearExpr::new();

        for h in 0..HOURS {
            self.model.add_eq(
                LinearExpr::new()
                    .with_term(self.green_high[h], 1.0)
                    .with_term(self.trad_high[h], 1.0),
                self.high_demand[h],
            );
            objective.add_term(self.green_high[h], p.green_price(h) - beta);
            objective.add_term(self.trad_high[h], p.trad_price(h));
        }

        let mut green_in_hour: [LinearExpr; HOURS] =
            std::array::from_fn(|h| LinearExpr::new().with_term(self.green_high[h], 1.0));
        for fv in &self.floating {
            for hv in &fv.hours {
                green_in_hour[hv.hour].add_term(hv.green, 1.0);
                objective.add_term(hv.green, p.green_price(hv.hour) - beta);
                objective.add_term(hv.trad, p.trad_price(hv.hour));
                objective.add_term(hv.assign, -gamma * p.green_supply(hv.hour));
            }
        }
        for (h, expr) in green_in_hour.into_iter().enumerate() {
            self.model.add_le(expr, p.green_supply(h));
        }
        self.model.set_objective(objective);

        let layout = ModelLayout {
            green_high: self.green_high,
            trad_high: self.trad_high,
            high: self.high,
            floating: self.floating,
        };
        (self.model, layout)
    }
}

impl ModelLayout {
    /// Converts solver values into assignments.
    ///
    /// Energy splits are clamped to `[0, energy]` and traditional energy is
    /// recomputed so every assignment conserves its subtask's energy exactly.
    ///
    /// # Errors
    ///
    /// Returns `SchedError::InfeasibleModel` if a floating subtask has no
    /// selected hour in the solution.
    pub fn extract(&self, solution: &MilpSolution) -> Result<Vec<Assignment>, SchedError> {
        let mut assignments = Vec::with_capacity(self.high.len() + self.floating.len());

        // Share each hour's high-priority green among that hour's fixed subtasks.
        let mut high_demand = [0.0; HOURS];
        for task in &self.high {
            if let Placement::Fixed { hour } = task.placement {
                high_demand[hour] += task.energy;
            }
        }
        for task in &self.high {
            let Placement::Fixed { hour } = task.placement else {
                continue;
            };
            let green_total = solution
                .value(self.green_high[hour])
                .clamp(0.0, high_demand[hour]);
            let green = if high_demand[hour] > 0.0 {
                green_total * task.energy / high_demand[hour]
            } else {
                0.0
            };
            debug_assert!(solution.value(self.trad_high[hour]) >= -1e-6);
            assignments.push(split(task, hour, green));
        }

        for fv in &self.floating {
            let chosen = fv
                .hours
                .iter()
                .max_by(|a, b| solution.value(a.assign).total_cmp(&solution.value(b.assign)))
                .filter(|hv| solution.value(hv.assign) > 0.5)
                .ok_or_else(|| SchedError::InfeasibleModel {
                    reason: format!("subtask {} has no selected hour", fv.task.id),
                })?;
            let green = solution.value(chosen.green).clamp(0.0, fv.task.energy);
            debug!(
                subtask = %fv.task.id,
                hour = chosen.hour,
                green,
                trad = solution.value(chosen.trad),
                "placed"
            );
            assignments.push(split(&fv.task, chosen.hour, green));
        }

        assignments.sort_by_key(|a| a.subtask);
        Ok(assignments)
    }
}

fn split(task: &Subtask, hour: usize, green: f64) -> Assignment {
    Assignment {
        subtask: task.id,
        priority: task.priority,
        hour,
        green_used: green,
        trad_used: task.energy - green,
    }
}

/// Optimal scheduler delegating the assembled model to a [`MilpSolver`].
///
/// Any solver failure is fatal and returned as `SchedError::InfeasibleModel`.
/// The reported objective includes the incentive terms and is not a cost.
#[derive(Debug, Clone)]
pub struct OptimalScheduler<S = GoodLpSolver> {
    params: OptimalParams,
    solver: S,
}

impl OptimalScheduler<GoodLpSolver> {
    pub fn new(params: OptimalParams) -> Self {
        Self::with_solver(params, GoodLpSolver)
    }
}

impl Default for OptimalScheduler<GoodLpSolver> {
    fn default() -> Self {
        Self::new(OptimalParams::default())
    }
}

impl<S: MilpSolver> OptimalScheduler<S> {
    pub fn with_solver(params: OptimalParams, solver: S) -> Self {
        Self { params, solver }
    }

    pub fn params(&self) -> &OptimalParams {
        &self.params
    }
}

impl<S: MilpSolver> Scheduler for OptimalScheduler<S> {
    fn name(&self) -> &'static str {
        "optimal"
    }

    fn schedule(&self, profile: &HourlyProfile, demand: &Demand) -> Result<Schedule, SchedError> {
        let mut builder = OptimalModelBuilder::new(profile, self.params);
        for task in demand.subtasks() {
            builder.add_subtask(task);
        }
        let (model, layout) = builder.build();
        info!(
            vars = model.vars().len(),
            binaries = model.binary_count(),
            constraints = model.constraints().len(),
            time_limit = ?self.params.budget.time_limit,
            gap_rel = self.params.budget.gap_rel,
            "solving optimal model"
        );

        let solution = self.solver.solve(&model, &self.params.budget).map_err(|e| {
            warn!(error = %e, "solver returned no solution");
            SchedError::InfeasibleModel {
                reason: e.to_string(),
            }
        })?;
        if solution.status() == SolveStatus::TimeLimit {
            warn!(
                time_limit = ?self.params.budget.time_limit,
                "time limit reached, using best solution found"
            );
        }

        let assignments = layout.extract(&solution)?;
        let objective = model.objective().evaluate(solution.values());
        let schedule = Schedule {
            strategy: self.name(),
            assignments,
            objective: Some(objective),
        };
        schedule.check_capacity(profile)?;
        info!(objective, "optimal schedule complete");
        Ok(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::milp::SolveError;
    use crate::sched::types::{Priority, SubtaskId};

    struct RefusingSolver;

    impl MilpSolver for RefusingSolver {
        fn solve(&self, _: &MilpModel, budget: &SolveBudget) -> Result<MilpSolution, SolveError> {
            Err(SolveError::TimedOut {
                limit: budget.time_limit,
            })
        }
    }

    /// Returns all zeros: no floating subtask gets an hour.
    struct ZeroSolver;

    impl MilpSolver for ZeroSolver {
        fn solve(&self, model: &MilpModel, _: &SolveBudget) -> Result<MilpSolution, SolveError> {
            Ok(MilpSolution::new(vec![0.0; model.vars().len()]))
        }
    }

    /// Solves for real but reports the result as a time-limited incumbent.
    struct StoppedAtLimitSolver;

    impl MilpSolver for StoppedAtLimitSolver {
        fn solve(
            &self,
            model: &MilpModel,
            budget: &SolveBudget,
        ) -> Result<MilpSolution, SolveError> {
            let solved = GoodLpSolver.solve(model, budget)?;
            Ok(MilpSolution::at_time_limit(solved.values().to_vec()))
        }
    }

    fn mid(id: usize, energy: f64, publish_hour: usize, window_hours: usize) -> Subtask {
        Subtask {
            id: SubtaskId(id),
            priority: Priority::Mid,
            energy,
            placement: Placement::Floating {
                publish_hour,
                window_hours,
            },
        }
    }

    #[test]
    fn builder_creates_vars_per_candidate_hour() {
        let profile = HourlyProfile::uniform(1.0, 0.5, 10.0);
        let mut builder = OptimalModelBuilder::new(&profile, OptimalParams::default());
        builder.add_subtask(&mid(0, 50.0, 3, 4));
        let (model, _) = builder.build();
        // 48 high vars + 3 per candidate hour
        assert_eq!(model.vars().len(), 48 + 12);
        assert_eq!(model.binary_count(), 4);
        // 4 balance + 1 pick-one + 24 high balance + 24 capacity
        assert_eq!(model.constraints().len(), 4 + 1 + 24 + 24);
    }

    #[test]
    fn solver_failure_is_infeasible_model() {
        let profile = HourlyProfile::uniform(1.0, 0.5, 10.0);
        let demand = Demand {
            mid: vec![mid(0, 50.0, 0, 2)],
            ..Demand::default()
        };
        let scheduler = OptimalScheduler::with_solver(OptimalParams::default(), RefusingSolver);
        let result = scheduler.schedule(&profile, &demand);
        assert!(matches!(result, Err(SchedError::InfeasibleModel { .. })));
    }

    #[test]
    fn incumbent_at_time_limit_is_accepted() {
        let profile = HourlyProfile::uniform(1.0, 0.5, 40.0);
        let demand = Demand {
            mid: vec![mid(0, 50.0, 0, 2), mid(1, 30.0, 4, 3)],
            ..Demand::default()
        };
        let scheduler =
            OptimalScheduler::with_solver(OptimalParams::default(), StoppedAtLimitSolver);
        let schedule = scheduler
            .schedule(&profile, &demand)
            .expect("incumbent should be used");
        assert_eq!(schedule.assignments.len(), 2);
        for (a, task) in schedule.assignments.iter().zip(&demand.mid) {
            assert!(task.placement.allows(a.hour));
            assert!((a.energy() - task.energy).abs() < 1e-6);
        }
        assert!(schedule.check_capacity(&profile).is_ok());
    }

    #[test]
    fn missing_hour_selection_is_infeasible_model() {
        let profile = HourlyProfile::uniform(1.0, 0.5, 10.0);
        let demand = Demand {
            mid: vec![mid(0, 50.0, 0, 2)],
            ..Demand::default()
        };
        let scheduler = OptimalScheduler::with_solver(OptimalParams::default(), ZeroSolver);
        let result = scheduler.schedule(&profile, &demand);
        assert!(matches!(result, Err(SchedError::InfeasibleModel { .. })));
    }

    #[test]
    fn beats_greedy_order_trap() {
        // Greedy puts the small task in the cheap hour first and strands the big one.
        let mut green = [0.9; HOURS];
        green[0] = 0.1;
        green[1] = 0.2;
        let mut supply = [0.0; HOURS];
        supply[0] = 50.0;
        supply[1] = 30.0;
        let profile = HourlyProfile::new([1.0; HOURS], green, supply).unwrap();
        let demand = Demand {
            mid: vec![mid(0, 30.0, 0, 2), mid(1, 50.0, 0, 2)],
            ..Demand::default()
        };

        let schedule = OptimalScheduler::new(OptimalParams::cost_only())
            .schedule(&profile, &demand)
            .expect("optimal should solve");
        let hours: Vec<(usize, f64)> = schedule
            .assignments
            .iter()
            .map(|a| (a.hour, a.green_used))
            .collect();
        assert_eq!(hours[0].0, 1);
        assert_eq!(hours[1].0, 0);
        assert!((hours[0].1 - 30.0).abs() < 1e-6);
        assert!((hours[1].1 - 50.0).abs() < 1e-6);
        assert!((schedule.objective.unwrap() - 11.0).abs() < 1e-6);
    }
}
