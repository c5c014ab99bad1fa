use std::any::Any;
use std::ops::Div;

use dyn_clone::DynClone;
use faer::Col;
use faer::traits::ComplexField;
use faer::traits::num_traits::{Float, PrimInt};
use faer::Index;
use macros::build_options;
use problemo::Problem;

pub trait ElementType: ComplexField + Float + Div<Output = Self> + PrimInt {}
impl<T> ElementType for T where T: ComplexField + Float + Div<Output = T> + PrimInt {}

pub trait IndexType: Copy + PartialEq + Eq + Ord + Index {}
impl<T> IndexType for T where T: Copy + PartialEq + Eq + Ord + Index {}

pub type E = f64;
pub type I = usize;

pub mod callback;
pub mod interface;
pub mod linalg;
pub mod lp;
pub mod terminators;

#[cfg(test)]
pub mod tests;

pub trait OptionTrait: Any + Sync + Send + DynClone {}
impl OptionTrait for &'static str {}
impl OptionTrait for String {}
impl OptionTrait for bool {}
impl OptionTrait for usize {}
impl OptionTrait for u8 {}
impl OptionTrait for u16 {}
impl OptionTrait for u32 {}
impl OptionTrait for u64 {}
impl OptionTrait for i8 {}
impl OptionTrait for i16 {}
impl OptionTrait for i32 {}
impl OptionTrait for i64 {}
impl OptionTrait for f32 {}
impl OptionTrait for f64 {}

impl Clone for Box<dyn OptionTrait> {
    fn clone(&self) -> Self {
        dyn_clone::clone_box(&**self)
    }
}

/// Terminal status codes returned by a solve.
///
/// `InProgress` is the only non-terminal variant; it is the state a fresh
/// [`SolverState`] starts in before the orchestrator's phase driver runs.
/// Malformed input (NaN, dimension mismatch, `l > u`) and allocation
/// failure are *not* modeled here — they never reach "a run happened" and
/// are surfaced as `Err(Problem)` instead (see `lp::simplex::error`).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum Status {
    #[default]
    /// The solver is still running.
    InProgress,
    /// Phase 2 converged with residuals within tolerance.
    Optimal,
    /// Phase 1 finished with remaining infeasibility.
    Infeasible,
    /// The ratio test found no leaving variable in phase 2.
    Unbounded,
    /// Presolve/phase 1 could not distinguish infeasible from unbounded.
    InfeasibleOrUnbounded,
    /// The solver stopped due to an iteration limit.
    IterationLimit,
    /// The solver stopped due to a time limit.
    TimeLimit,
    /// The solver was interrupted by a caller (Ctrl-C, callback, external flag).
    UserTerminated,
    /// A singular basis persisted after a refactor-and-retry (and, in phase
    /// 2, a perturbation attempt).
    NumericBreakdown,
}

pub trait OptimizationProgram {
    fn compute_residual(&self, state: &SolverState) -> Residual;
}

/// Trait for iterative optimization solvers.
///
/// Provides a standard interface for algorithms that proceed by repeated
/// iteration. The simplex core (`lp::simplex::SimplexSolver`) is the sole
/// implementor in this crate.
pub trait Solver {
    /// Run the solver until convergence, a limit, or a numeric failure.
    fn solve(
        &mut self,
        state: &mut SolverState,
        hooks: &mut SolverHooks,
    ) -> Result<Status, Problem>;
}

/// Public-facing snapshot of a solve in progress, handed to callbacks and
/// terminators. The simplex orchestrator owns a much richer working state
/// internally (basis header, eta file, pricing weights, ...) and projects
/// into this struct at construction and at each reported iteration rather
/// than exposing that internal state directly — components stay
/// index-based back-references into one owning state, this is the
/// publishable part of it.
#[derive(Debug, Clone)]
#[allow(non_snake_case, unused)]
pub struct SolverState {
    status: Status,
    nit: usize,

    /// Primal solution (structural variables only).
    x: Col<E>,
    /// Dual values (one per constraint row).
    y: Col<E>,

    obj_val: E,
    residual: Residual,
}

impl SolverState {
    pub fn new(n: usize, m: usize) -> Self {
        Self {
            status: Status::InProgress,
            nit: 0,
            x: Col::zeros(n),
            y: Col::zeros(m),
            obj_val: E::from(0.),
            residual: Residual {
                primal_infeasibility: E::from(0.),
                dual_infeasibility: E::from(0.),
            },
        }
    }

    pub fn get_status(&self) -> Status {
        self.status
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn get_iteration(&self) -> usize {
        self.nit
    }

    pub fn set_iteration(&mut self, nit: usize) {
        self.nit = nit;
    }

    pub fn get_primal(&self) -> &Col<E> {
        &self.x
    }

    pub fn set_primal(&mut self, x: Col<E>) {
        self.x = x;
    }

    pub fn get_dual(&self) -> &Col<E> {
        &self.y
    }

    pub fn set_dual(&mut self, y: Col<E>) {
        self.y = y;
    }

    pub fn get_objective(&self) -> E {
        self.obj_val
    }

    pub fn set_objective(&mut self, obj_val: E) {
        self.obj_val = obj_val;
    }

    pub fn get_primal_infeasibility(&self) -> E {
        self.residual.primal_infeasibility
    }

    pub fn get_dual_infeasibility(&self) -> E {
        self.residual.dual_infeasibility
    }

    pub fn set_residual(&mut self, primal_infeasibility: E, dual_infeasibility: E) {
        self.residual.primal_infeasibility = primal_infeasibility;
        self.residual.dual_infeasibility = dual_infeasibility;
    }
}

/// Aggregate feasibility residuals reported at each iteration.
#[derive(Debug, Clone, Default)]
pub struct Residual {
    /// Sum (or max, depending on caller) of basic-variable bound violations.
    primal_infeasibility: E,
    /// Magnitude of the largest attractive reduced cost still outstanding.
    dual_infeasibility: E,
}

pub struct SolverHooks {
    pub callback: Box<dyn crate::callback::Callback>,
    pub terminator: Box<dyn crate::terminators::Terminator>,
}

build_options!(name = SolverOptions, registry_name = OPTION_REGISTRY);

/// Alias for the options struct generated by [`build_options!`] above —
/// every module in this crate (`callback`, `terminators`, `lp::simplex`)
/// refers to it by this name.
pub type SolverOptions = Options;
