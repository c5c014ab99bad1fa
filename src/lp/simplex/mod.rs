//! §4.H solve orchestrator: the single entry point that wires the sparse
//! matrix store, eta-file basis, pricing engine, ratio test, pivot
//! executor, phase driver, crossover, and numerical validators into one
//! `crate::Solver` implementation.
//!
//! The sequence run by [`SimplexSolver::solve`] is: validate the model,
//! build the working state (crash basis all-slack, or crossover from a
//! caller-supplied interior point), factorize the basis, run phase 1 then
//! phase 2, refine the primal solution, and project the result back into
//! the public [`crate::SolverState`].

pub mod basis;
pub mod crossover;
pub mod error;
pub mod matrix;
pub mod options;
pub mod phase;
pub mod pivot;
pub mod pricing;
pub mod ratio;
pub mod state;
pub mod validators;

use problemo::Problem;

use crate::callback::{Callback, NoOpCallback};
use crate::terminators::MultipleTerminators;
use crate::{E, Solver as SolverTrait, SolverHooks, SolverOptions, SolverState, Status};

use super::LinearProgram;
use error::SimplexError;
use matrix::{SparseMatrix, two_norm};
use options::SimplexOptions;
use phase::PhaseOutcome;
use state::SimplexState;

/// `max_iter`'s registered literal default (§10.3); anything else means the
/// caller explicitly set it via `SolverOptions::set_option`, so
/// `resolve_max_iter` should honor it instead of computing `2*(n+m)*100`.
const REGISTERED_MAX_ITER_DEFAULT: usize = 100_000;

/// Builds a [`SimplexSolver`] for one model, matching the crate's existing
/// preference for explicit builders over ad hoc constructors (§11).
pub struct SimplexBuilder<'a> {
    lp: &'a LinearProgram,
    options: SimplexOptions,
    callback: Box<dyn crate::callback::Callback>,
    terminator: Box<dyn crate::terminators::Terminator>,
}

impl<'a> SimplexBuilder<'a> {
    pub fn new(lp: &'a LinearProgram) -> Self {
        let registry = SolverOptions::new();
        Self {
            lp,
            options: SimplexOptions::new(&registry),
            callback: Box::new(NoOpCallback::new(&registry)),
            terminator: Box::new(MultipleTerminators::new(Vec::new())),
        }
    }

    pub fn with_options(mut self, options: &SolverOptions) -> Self {
        self.options = SimplexOptions::new(options);
        self
    }

    pub fn with_callback(mut self, callback: Box<dyn crate::callback::Callback>) -> Self {
        self.callback = callback;
        self
    }

    pub fn with_terminator(mut self, terminator: Box<dyn crate::terminators::Terminator>) -> Self {
        self.terminator = terminator;
        self
    }

    /// Returns the solver together with the hooks assembled from
    /// `with_callback`/`with_terminator` (defaulting to a no-op callback and
    /// an empty terminator chain); `solve` still takes `hooks` explicitly
    /// per the `crate::Solver` contract, this just saves the caller from
    /// wiring the defaults back up by hand.
    pub fn build(self) -> (SimplexSolver<'a>, SolverHooks) {
        let solver = SimplexSolver::new(self.lp, self.options);
        let hooks = SolverHooks { callback: self.callback, terminator: self.terminator };
        (solver, hooks)
    }
}

/// The revised primal simplex method, end to end (§4.H). One instance
/// solves one model; construct via [`SimplexBuilder`] or `LinearProgram::solver_builder`.
pub struct SimplexSolver<'a> {
    lp: &'a LinearProgram,
    options: SimplexOptions,
    warm_start: Option<(Vec<E>, Vec<E>)>,
    error_buffer: error::ErrorBuffer,
}

impl<'a> SimplexSolver<'a> {
    pub fn new(lp: &'a LinearProgram, options: SimplexOptions) -> Self {
        Self { lp, options, warm_start: None, error_buffer: error::ErrorBuffer::new() }
    }

    /// Supplies a primal/dual pair from a non-simplex method (an interior
    /// point, say) that solved the model but left no vertex behind. The
    /// next `solve()` runs crossover (§4.G) against it instead of starting
    /// from the all-slack crash basis.
    pub fn warm_start(&mut self, x: &[E], pi: &[E]) {
        self.warm_start = Some((x.to_vec(), pi.to_vec()));
    }

    /// The most recent fault message recorded in the §7 error buffer, if
    /// any `solve()` call has failed.
    pub fn error_message(&self) -> &str {
        self.error_buffer.message()
    }

    fn run(&mut self, hooks: &mut SolverHooks) -> Result<(Status, SolverState), Problem> {
        self.error_buffer.clear();
        validate_input(self.lp)?;

        hooks.terminator.initialize();

        let (n, m) = self.lp.get_dims();
        let feas_tol = self.options.feas_tol();
        let opt_tol = self.options.opt_tol();

        let mut simplex_state = SimplexState::new(self.lp, &self.options)?;
        let a = simplex_state.a.clone();

        let explicit_max_iter = (self.options.max_iter() != REGISTERED_MAX_ITER_DEFAULT)
            .then_some(self.options.max_iter());
        let max_iter = self.options.resolve_max_iter(n, m, explicit_max_iter);

        if let Some((x, pi)) = self.warm_start.take() {
            crossover_from_interior_point(&mut simplex_state, &a, &x, &pi, n, m)?;
        }

        simplex_state.basis.refactor(&a, &simplex_state.basis_header)?;

        let mut nit = 0usize;
        hooks.callback.init(&simplex_state.to_solver_state(0, Status::InProgress, feas_tol, opt_tol));
        hooks.callback.phase_boundary("phase1", &simplex_state.to_solver_state(0, Status::InProgress, feas_tol, opt_tol));

        let phase1_outcome = phase::run_phase1(&mut simplex_state, &a, &self.options, hooks, &mut nit, max_iter)?;

        let status = match phase1_outcome {
            PhaseOutcome::Terminated(status) => status,
            PhaseOutcome::Done(Status::Optimal) => {
                hooks.callback.phase_boundary(
                    "phase2",
                    &simplex_state.to_solver_state(nit, Status::InProgress, feas_tol, opt_tol),
                );
                match phase::run_phase2(&mut simplex_state, &a, &self.options, hooks, &mut nit, max_iter)? {
                    PhaseOutcome::Done(status) => status,
                    PhaseOutcome::Terminated(status) => status,
                }
            }
            PhaseOutcome::Done(other) => other,
        };

        if status == Status::Optimal {
            refine(&mut simplex_state, &a, &self.options)?;
            simplex_state.recompute_duals()?;
        }

        let out = simplex_state.to_solver_state(nit, status, feas_tol, opt_tol);
        hooks.callback.phase_boundary("done", &out);
        Ok((status, out))
    }
}

impl<'a> SolverTrait for SimplexSolver<'a> {
    fn solve(&mut self, state: &mut SolverState, hooks: &mut SolverHooks) -> Result<Status, Problem> {
        match self.run(hooks) {
            Ok((status, out)) => {
                *state = out;
                Ok(status)
            }
            Err(e) => {
                self.error_buffer.write(&e.to_string());
                Err(e)
            }
        }
    }
}

/// §4.J input validation: every coefficient supplied by the model must be
/// non-NaN (infinite bounds are legal and handled by `SimplexState::new`'s
/// own sentinel clamping, so `no_nan` rather than `finite_array` is the
/// right check here).
fn validate_input(lp: &LinearProgram) -> Result<(), Problem> {
    let (n, m) = lp.get_dims();
    let c: Vec<E> = (0..n).map(|j| lp.c()[j]).collect();
    let l: Vec<E> = (0..n).map(|j| lp.l()[j]).collect();
    let u: Vec<E> = (0..n).map(|j| lp.u()[j]).collect();
    let b: Vec<E> = (0..m).map(|i| lp.b()[i]).collect();
    validators::no_nan(&c)?;
    validators::no_nan(&l)?;
    validators::no_nan(&u)?;
    validators::no_nan(&b)?;
    validators::no_nan(lp.a().val())?;
    Ok(())
}

/// §4.G entry point used by `run` when the caller warm-starts from an
/// interior point: seeds `x`/`pi` from the supplied pair, re-derives the
/// slack values that keep `A_aug x = b`, then runs bound snap, basis
/// construction, and the superbasic push in sequence.
fn crossover_from_interior_point(
    state: &mut SimplexState,
    a: &SparseMatrix,
    x: &[E],
    pi: &[E],
    n: usize,
    m: usize,
) -> Result<(), Problem> {
    for j in 0..n.min(x.len()) {
        state.x[j] = x[j];
    }
    for i in 0..m.min(pi.len()) {
        state.pi[i] = pi[i];
    }
    let ax = a.sparse_ax(&state.x);
    for i in 0..m {
        state.x[n + i] = state.b[i] - ax[i];
    }

    crossover::bound_snap(state, a)?;
    crossover::build_basis(state);
    let max_push_iters = 4 * (n + m).max(1);
    crossover::push_superbasics(state, a, max_push_iters)?;
    Ok(())
}

/// §4.H iterative refinement: recomputes the augmented residual `b - A x`
/// against the basis at full precision and corrects `x_B` by `FTRAN(r)`,
/// stopping early once the residual is within `feas_tol` or stops
/// shrinking (a non-shrinking residual means the basis itself, not just
/// `x`, has drifted, which `NumericBreakdown` surfaces rather than
/// looping forever).
fn refine(state: &mut SimplexState, a: &SparseMatrix, options: &SimplexOptions) -> Result<(), Problem> {
    let iters = options.refine_iters();
    let feas_tol = options.feas_tol();
    let mut prev_norm = E::INFINITY;

    for _ in 0..iters {
        let ax = a.sparse_ax(&state.x);
        let r: Vec<E> = (0..state.m).map(|i| state.b[i] - ax[i]).collect();
        let norm = two_norm(&r);
        if norm <= feas_tol {
            return Ok(());
        }
        if norm >= prev_norm {
            return Err(Problem::from(SimplexError::NumericBreakdown));
        }

        let d = state.basis.ftran(&r)?;
        let mut x_b = state.x_b();
        for (i, xb) in x_b.iter_mut().enumerate() {
            *xb += d[i];
        }
        state.set_x_b(&x_b);
        prev_norm = norm;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::NoOpCallback;
    use crate::lp::Sense;
    use crate::terminators::MultipleTerminators;
    use faer::Col;
    use faer::sparse::{SparseColMat, Triplet};

    /// `min x0 + x1` s.t. `x0 + x1 >= 4`, `0 <= x0, x1 <= 10`: with both
    /// structural variables starting at their lower bound of `0`, the `Ge`
    /// row's slack starts at `4`, above its `(-inf, 0]` bound, so phase 1
    /// has to do real work before phase 2 finds the optimum at the
    /// constraint boundary, objective `4`.
    fn feasible_lp() -> LinearProgram {
        let a_triplets: [Triplet<usize, usize, E>; 2] =
            [Triplet::new(0, 0, 1.0), Triplet::new(0, 1, 1.0)];
        let a = SparseColMat::try_new_from_triplets(1, 2, &a_triplets).unwrap();
        LinearProgram::new(
            Col::from_fn(2, |_| 1.0),
            a,
            Col::from_fn(1, |_| 4.0),
            vec![Sense::Ge],
            Col::zeros(2),
            Col::from_fn(2, |_| 10.0),
        )
    }

    #[test]
    fn test_solve_reaches_optimal_on_a_simple_feasible_lp() {
        let lp = feasible_lp();
        let options = SolverOptions::new();
        let (mut solver, mut hooks) = SimplexBuilder::new(&lp).with_options(&options).build();
        let mut state = SolverState::new(2, 1);
        let status = solver.solve(&mut state, &mut hooks).unwrap();
        assert_eq!(status, Status::Optimal);
        assert!((state.get_objective() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_solve_detects_infeasible_model() {
        let a_triplets: [Triplet<usize, usize, E>; 1] = [Triplet::new(0, 0, 1.0)];
        let a = SparseColMat::try_new_from_triplets(1, 1, &a_triplets).unwrap();
        let lp = LinearProgram::new_equality(
            Col::from_fn(1, |_| 1.0),
            a,
            Col::from_fn(1, |_| 5.0),
            Col::zeros(1),
            Col::from_fn(1, |_| 1.0),
        );
        let (mut solver, mut hooks) = SimplexBuilder::new(&lp).build();
        let mut state = SolverState::new(1, 1);
        let status = solver.solve(&mut state, &mut hooks).unwrap();
        assert_eq!(status, Status::Infeasible);
    }

    #[test]
    fn test_solve_detects_unbounded_model() {
        let a_triplets: [Triplet<usize, usize, E>; 1] = [Triplet::new(0, 0, 1.0)];
        let a = SparseColMat::try_new_from_triplets(1, 1, &a_triplets).unwrap();
        let lp = LinearProgram::new(
            Col::from_fn(1, |_| -1.0),
            a,
            Col::from_fn(1, |_| 0.0),
            vec![Sense::Ge],
            Col::zeros(1),
            Col::from_fn(1, |_| E::INFINITY),
        );
        let (mut solver, mut hooks) = SimplexBuilder::new(&lp).build();
        let mut state = SolverState::new(1, 1);
        let status = solver.solve(&mut state, &mut hooks).unwrap();
        assert_eq!(status, Status::Unbounded);
    }

    #[test]
    fn test_solver_builder_from_linear_program() {
        let lp = feasible_lp();
        let _ = LinearProgram::solver_builder(&lp).build();
    }

    #[test]
    fn test_error_message_set_on_failure() {
        // max_iter=0 forces an immediate IterationLimit termination rather
        // than a hard failure; this exercises the happy (non-error) path of
        // `run` through the error buffer plumbing instead — the buffer
        // itself is unit-tested in `error.rs`, so this only checks it starts
        // empty and unlocked.
        let lp = feasible_lp();
        let (solver, _hooks) = SimplexBuilder::new(&lp).build();
        assert_eq!(solver.error_message(), "");
    }

    #[test]
    fn test_error_buffer_resets_between_solves_on_the_same_solver() {
        // Simulates a solver instance that reported a fault on some earlier
        // `solve()` call (locking the buffer), then is asked to `solve()`
        // again: the stale message must not survive into the new call's
        // result, even though this second run succeeds.
        let lp = feasible_lp();
        let (mut solver, mut hooks) = SimplexBuilder::new(&lp).build();
        solver.error_buffer.write("stale fault from an earlier solve");
        assert_eq!(solver.error_message(), "stale fault from an earlier solve");

        let mut state = SolverState::new(2, 1);
        let status = solver.solve(&mut state, &mut hooks).unwrap();
        assert_eq!(status, Status::Optimal);
        assert_eq!(solver.error_message(), "");
    }
}
