//! Solver-independent mixed-integer linear model and the solver seam.
//!
//! [`MilpModel`] is a plain description of variables, linear constraints and a
//! linear objective. A [`MilpSolver`] turns it into variable values within a
//! [`SolveBudget`]. [`GoodLpSolver`] is the shipped backend, built on `good_lp`.

use std::time::Duration;

use thiserror::Error;

/// Handle to a variable inside one [`MilpModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Domain of a model variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// Continuous, `>= 0`.
    NonNegative,
    /// Integer in `{0, 1}`.
    Binary,
}

#[derive(Debug, Clone)]
pub struct VarDef {
    pub name: String,
    pub kind: VarKind,
}

/// `Σ coef·var + constant`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    pub terms: Vec<(VarId, f64)>,
    pub constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    /// Adds `coef·var`; zero coefficients are dropped.
    pub fn add_term(&mut self, var: VarId, coef: f64) -> &mut Self {
        if coef != 0.0 {
            self.terms.push((var, coef));
        }
        self
    }

    /// Builder-style [`LinearExpr::add_term`].
    pub fn with_term(mut self, var: VarId, coef: f64) -> Self {
        self.add_term(var, coef);
        self
    }

    /// Value of the expression for the given variable assignment.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(v, c)| c * values.get(v.0).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.constant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Le,
}

/// `lhs (= | <=) rhs`.
#[derive(Debug, Clone)]
pub struct LinearConstraint {
    pub lhs: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

/// A minimization problem.
#[derive(Debug, Clone, Default)]
pub struct MilpModel {
    vars: Vec<VarDef>,
    constraints: Vec<LinearConstraint>,
    objective: LinearExpr,
}

impl MilpModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var(&mut self, name: impl Into<String>, kind: VarKind) -> VarId {
        self.vars.push(VarDef {
            name: name.into(),
            kind,
        });
        VarId(self.vars.len() - 1)
    }

    pub fn add_eq(&mut self, lhs: LinearExpr, rhs: f64) {
        self.constraints.push(LinearConstraint {
            lhs,
            relation: Relation::Eq,
            rhs,
        });
    }

    pub fn add_le(&mut self, lhs: LinearExpr, rhs: f64) {
        self.constraints.push(LinearConstraint {
            lhs,
            relation: Relation::Le,
            rhs,
        });
    }

    pub fn set_objective(&mut self, objective: LinearExpr) {
        self.objective = objective;
    }

    pub fn vars(&self) -> &[VarDef] {
        &self.vars
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn binary_count(&self) -> usize {
        self.vars.iter().filter(|v| v.kind == VarKind::Binary).count()
    }
}

/// Wall-clock and optimality limits for one solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveBudget {
    pub time_limit: Duration,
    /// Relative MIP gap at which the solver may stop.
    pub gap_rel: f64,
}

impl Default for SolveBudget {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(60),
            gap_rel: 0.01,
        }
    }
}

/// How a solve ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal within the requested gap.
    Optimal,
    /// The time limit was hit; values are the best incumbent found.
    TimeLimit,
}

/// Variable values returned by a solver, indexed by [`VarId`].
#[derive(Debug, Clone, PartialEq)]
pub struct MilpSolution {
    values: Vec<f64>,
    status: SolveStatus,
}

impl MilpSolution {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            status: SolveStatus::Optimal,
        }
    }

    /// Best incumbent found before the time limit.
    pub fn at_time_limit(values: Vec<f64>) -> Self {
        Self {
            values,
            status: SolveStatus::TimeLimit,
        }
    }

    pub fn status(&self) -> SolveStatus {
        self.status
    }

    pub fn value(&self, var: VarId) -> f64 {
        self.values.get(var.0).copied().unwrap_or(0.0)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Why a solve produced no solution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveError {
    #[error("model is infeasible")]
    Infeasible,
    #[error("no solution found within {limit:?}")]
    TimedOut { limit: Duration },
    #[error("solver backend failed: {0}")]
    Backend(String),
}

/// An external mixed-integer solver.
pub trait MilpSolver {
    /// Solves `model` within `budget`, returning the best solution found.
    ///
    /// Hitting the time limit with an incumbent is a success with
    /// [`SolveStatus::TimeLimit`].
    ///
    /// # Errors
    ///
    /// Returns a `SolveError` if no feasible solution is available.
    fn solve(&self, model: &MilpModel, budget: &SolveBudget) -> Result<MilpSolution, SolveError>;
}

impl<S: MilpSolver + ?Sized> MilpSolver for &S {
    fn solve(&self, model: &MilpModel, budget: &SolveBudget) -> Result<MilpSolution, SolveError> {
        (**self).solve(model, budget)
    }
}

/// `good_lp` backed solver.
///
/// With the `highs` feature (the default) the time limit and gap are passed to
/// HiGHS, which returns its incumbent when the limit is hit.
///
/// The opt-in `microlp` backend (`--no-default-features --features microlp`)
/// is meant for small models, such as narrowed windows. It has no gap setting
/// and no incumbent: it runs on a worker thread and the call fails with
/// [`SolveError::TimedOut`] once the limit elapses. The worker cannot be
/// cancelled and keeps its core busy until it finishes or the process exits,
/// so a run should be abandoned after a timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct GoodLpSolver;

#[cfg(not(any(feature = "microlp", feature = "highs")))]
compile_error!("enable the `microlp` or `highs` feature to select a MILP backend");

#[cfg(feature = "highs")]
impl MilpSolver for GoodLpSolver {
    fn solve(&self, model: &MilpModel, budget: &SolveBudget) -> Result<MilpSolution, SolveError> {
        backend::solve_highs(model, budget)
    }
}

#[cfg(all(feature = "microlp", not(feature = "highs")))]
impl MilpSolver for GoodLpSolver {
    fn solve(&self, model: &MilpModel, budget: &SolveBudget) -> Result<MilpSolution, SolveError> {
        use std::sync::mpsc::{self, RecvTimeoutError};
        use std::thread;

        let (tx, rx) = mpsc::channel();
        let owned = model.clone();
        thread::Builder::new()
            .name("microlp-solve".into())
            .spawn(move || {
                // Receiver may be gone after a timeout.
                let _ = tx.send(backend::solve_microlp(&owned));
            })
            .map_err(|e| SolveError::Backend(format!("cannot start solver thread: {e}")))?;
        match rx.recv_timeout(budget.time_limit) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(SolveError::TimedOut {
                limit: budget.time_limit,
            }),
            Err(RecvTimeoutError::Disconnected) => {
                Err(SolveError::Backend("solver thread terminated".into()))
            }
        }
    }
}

mod backend {
    #[cfg(feature = "highs")]
    use std::time::Instant;

    use good_lp::{
        Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
        constraint, variable,
    };

    #[cfg(feature = "highs")]
    use super::SolveBudget;
    use super::{MilpModel, MilpSolution, Relation, SolveError, VarKind};

    /// Declares all model variables and returns them in `VarId` order.
    fn declare(model: &MilpModel) -> (ProblemVariables, Vec<Variable>) {
        let mut problem = ProblemVariables::new();
        let vars = model
            .vars()
            .iter()
            .map(|def| {
                let v = match def.kind {
                    VarKind::NonNegative => variable().min(0.0),
                    VarKind::Binary => variable().binary(),
                };
                problem.add(v.name(def.name.clone()))
            })
            .collect();
        (problem, vars)
    }

    fn expression(expr: &super::LinearExpr, vars: &[Variable]) -> Expression {
        let mut out = Expression::from(expr.constant);
        for &(v, coef) in &expr.terms {
            out += coef * vars[v.index()];
        }
        out
    }

    fn constraints(model: &MilpModel, vars: &[Variable]) -> Vec<good_lp::Constraint> {
        model
            .constraints()
            .iter()
            .map(|c| {
                let lhs = expression(&c.lhs, vars);
                match c.relation {
                    Relation::Eq => constraint::eq(lhs, c.rhs),
                    Relation::Le => constraint::leq(lhs, c.rhs),
                }
            })
            .collect()
    }

    fn map_error(e: ResolutionError) -> SolveError {
        match e {
            ResolutionError::Infeasible => SolveError::Infeasible,
            other => SolveError::Backend(other.to_string()),
        }
    }

    fn values<S: Solution>(solution: &S, vars: &[Variable]) -> Vec<f64> {
        vars.iter().map(|&v| solution.value(v)).collect()
    }

    #[cfg(all(feature = "microlp", not(feature = "highs")))]
    pub(super) fn solve_microlp(model: &MilpModel) -> Result<MilpSolution, SolveError> {
        let (problem, vars) = declare(model);
        let objective = expression(model.objective(), &vars);
        let mut lp = problem
            .minimise(objective)
            .using(good_lp::solvers::microlp::microlp);
        for c in constraints(model, &vars) {
            lp = lp.with(c);
        }
        let solution = lp.solve().map_err(map_error)?;
        Ok(MilpSolution::new(values(&solution, &vars)))
    }

    #[cfg(feature = "highs")]
    pub(super) fn solve_highs(
        model: &MilpModel,
        budget: &SolveBudget,
    ) -> Result<MilpSolution, SolveError> {
        let started = Instant::now();
        let (problem, vars) = declare(model);
        let objective = expression(model.objective(), &vars);
        let mut lp = problem
            .minimise(objective)
            .using(good_lp::solvers::highs::highs)
            .set_option("time_limit", budget.time_limit.as_secs_f64())
            .set_option("mip_rel_gap", budget.gap_rel);
        for c in constraints(model, &vars) {
            lp = lp.with(c);
        }
        // HiGHS reports a time-limited incumbent as a regular solution.
        let solution = lp.solve().map_err(map_error)?;
        let solved = values(&solution, &vars);
        if started.elapsed() >= budget.time_limit {
            Ok(MilpSolution::at_time_limit(solved))
        } else {
            Ok(MilpSolution::new(solved))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_expression() {
        let mut model = MilpModel::new();
        let x = model.add_var("x", VarKind::NonNegative);
        let y = model.add_var("y", VarKind::Binary);
        let expr = LinearExpr::constant(1.5).with_term(x, 2.0).with_term(y, -3.0);
        assert_eq!(expr.evaluate(&[4.0, 1.0]), 1.5 + 8.0 - 3.0);
    }

    #[test]
    fn zero_coefficients_are_dropped() {
        let mut model = MilpModel::new();
        let x = model.add_var("x", VarKind::NonNegative);
        let expr = LinearExpr::new().with_term(x, 0.0);
        assert!(expr.terms.is_empty());
    }

    #[test]
    fn counts_binaries() {
        let mut model = MilpModel::new();
        model.add_var("a", VarKind::Binary);
        model.add_var("b", VarKind::NonNegative);
        model.add_var("c", VarKind::Binary);
        assert_eq!(model.binary_count(), 2);
    }

    #[test]
    fn solves_tiny_assignment() {
        // Pick the cheaper of two hours for one unit of demand.
        let mut model = MilpModel::new();
        let a = model.add_var("a", VarKind::Binary);
        let b = model.add_var("b", VarKind::Binary);
        model.add_eq(LinearExpr::new().with_term(a, 1.0).with_term(b, 1.0), 1.0);
        model.set_objective(LinearExpr::new().with_term(a, 3.0).with_term(b, 2.0));

        let solution = GoodLpSolver.solve(&model, &SolveBudget::default());
        let solution = solution.unwrap();
        assert!(solution.value(b) > 0.5);
        assert!(solution.value(a) < 0.5);
    }

    #[test]
    fn incumbent_keeps_values_and_status() {
        let solution = MilpSolution::at_time_limit(vec![1.0, 0.0]);
        assert_eq!(solution.status(), SolveStatus::TimeLimit);
        assert_eq!(MilpSolution::new(vec![]).status(), SolveStatus::Optimal);
    }

    #[cfg(all(feature = "microlp", not(feature = "highs")))]
    #[test]
    fn microlp_gives_up_at_the_time_limit() {
        let mut model = MilpModel::new();
        let x = model.add_var("x", VarKind::Binary);
        model.set_objective(LinearExpr::new().with_term(x, 1.0));
        let budget = SolveBudget {
            time_limit: Duration::ZERO,
            gap_rel: 0.0,
        };
        let started = std::time::Instant::now();
        let result = GoodLpSolver.solve(&model, &budget);
        assert!(started.elapsed() < Duration::from_secs(5));
        // A zero budget may still race a trivial solve.
        assert!(matches!(result, Ok(_) | Err(SolveError::TimedOut { .. })));
    }

    #[test]
    fn reports_infeasible_model() {
        let mut model = MilpModel::new();
        let x = model.add_var("x", VarKind::NonNegative);
        model.add_le(LinearExpr::new().with_term(x, 1.0), -1.0);
        model.set_objective(LinearExpr::new().with_term(x, 1.0));
        let result = GoodLpSolver.solve(&model, &SolveBudget::default());
        assert!(result.is_err());
    }
}
