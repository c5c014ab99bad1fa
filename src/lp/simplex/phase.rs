//! §4.F phase driver: the inner `price -> ratio test -> pivot` loop run
//! under two different objectives (feasibility, then optimality), plus
//! anti-cycling perturbation and stall detection.
//!
//! Phase 1 cannot reuse Phase 2's incremental reduced-cost maintenance: its
//! cost vector (the sum-of-infeasibilities gradient) changes shape on every
//! pivot as basic variables cross in and out of their bounds, so its duals
//! are recomputed from scratch each iteration rather than patched
//! incrementally. Phase 2's cost vector is the model's own `c`, fixed for
//! the whole phase, so it uses the pricing engine's incremental update as
//! the hot path and only refreshes from scratch after a refactor.

use problemo::Problem;

use crate::{SolverHooks, Status};

use super::error::SimplexError;
use super::matrix::SparseMatrix;
use super::options::SimplexOptions;
use super::pivot::{self, PivotKind};
use super::ratio::{RatioResult, harris_ratio_test};
use super::state::SimplexState;

/// Basis snapshots are compared every this many iterations to detect a
/// stalled phase (§4.F "a basis snapshot is taken every `stall_window`
/// iterations").
const STALL_WINDOW: usize = 50;
/// Minimum objective improvement over a stall window before it counts as
/// progress.
const STALL_TOL: f64 = 1e-9;
/// Perturbation magnitude bound relative to `feas_tol` (§4.F).
const PERTURB_SCALE: f64 = 10.0;

pub enum PhaseOutcome {
    /// The phase's own termination condition was met; `status` is the
    /// phase-local verdict (`Optimal`/`Infeasible` for phase 1's feasible/
    /// infeasible split, `Optimal`/`Unbounded` for phase 2).
    Done(Status),
    /// The termination gate fired (limit or user cancellation); the driver
    /// must stop immediately and report this status.
    Terminated(Status),
}

/// Phase 1: minimizes the sum of basic-variable bound violations. Declares
/// feasibility found once pricing (against the infeasibility gradient)
/// finds nothing attractive and the residual infeasibility is within
/// `feas_tol`; otherwise the LP is `Infeasible`.
pub fn run_phase1(
    state: &mut SimplexState,
    a: &SparseMatrix,
    options: &SimplexOptions,
    hooks: &mut SolverHooks,
    nit: &mut usize,
    max_iter: usize,
) -> Result<PhaseOutcome, Problem> {
    let feas_tol = options.feas_tol();
    let opt_tol = options.opt_tol();
    let pivot_floor = options.pivot_floor();

    loop {
        if let Some(outcome) = poll_gate(state, hooks, *nit, max_iter, feas_tol, opt_tol)? {
            return Ok(outcome);
        }

        let costs1 = phase1_costs(state, feas_tol);
        recompute_duals_for(state, a, &costs1)?;

        let Some((entering, dir)) = state.pricing.select(&state.d, &state.status, state.ntot, state.n, opt_tol) else {
            return Ok(PhaseOutcome::Done(
                if state.primal_infeasibility(feas_tol) <= feas_tol { Status::Optimal } else { Status::Infeasible },
            ));
        };

        let alpha = state.basis.ftran(&col_dense(a, entering, state.m))?;
        match harris_ratio_test(state, &alpha, dir, feas_tol) {
            RatioResult::Unbounded => {
                // The composite infeasibility objective is bounded below by
                // zero; an unbounded step here means the basis has become
                // unreliable, not that the LP itself is unbounded.
                return Err(Problem::from(SimplexError::NumericBreakdown));
            }
            ratio @ RatioResult::Leaving { .. } => {
                apply_pivot(state, a, entering, dir, &alpha, &ratio, pivot_floor, options)?;
            }
        }

        *nit += 1;
        maybe_refactor(state, a, options)?;
    }
}

/// Phase 2: minimizes the model's own objective. Declares `Optimal` once
/// pricing finds no attractive variable, `Unbounded` if the ratio test
/// ever returns no leaving row.
pub fn run_phase2(
    state: &mut SimplexState,
    a: &SparseMatrix,
    options: &SimplexOptions,
    hooks: &mut SolverHooks,
    nit: &mut usize,
    max_iter: usize,
) -> Result<PhaseOutcome, Problem> {
    let feas_tol = options.feas_tol();
    let opt_tol = options.opt_tol();
    let pivot_floor = options.pivot_floor();

    state.recompute_duals()?;
    state.pricing.invalidate();

    let mut last_snapshot = state.snapshot();
    let mut last_obj = objective(state);
    let mut perturbation: Option<Vec<f64>> = None;
    let mut stalled_once = false;

    loop {
        if let Some(outcome) = poll_gate(state, hooks, *nit, max_iter, feas_tol, opt_tol)? {
            unperturb(state, &mut perturbation);
            return Ok(outcome);
        }

        let Some((entering, dir)) = state.pricing.select(&state.d, &state.status, state.ntot, state.n, opt_tol) else {
            unperturb(state, &mut perturbation);
            if perturbation.is_none() {
                cleanup(state, a, options)?;
            }
            return Ok(PhaseOutcome::Done(Status::Optimal));
        };

        let alpha = state.basis.ftran(&col_dense(a, entering, state.m))?;
        match harris_ratio_test(state, &alpha, dir, feas_tol) {
            RatioResult::Unbounded => {
                unperturb(state, &mut perturbation);
                return Ok(PhaseOutcome::Done(Status::Unbounded));
            }
            ratio @ RatioResult::Leaving { .. } => {
                apply_pivot(state, a, entering, dir, &alpha, &ratio, pivot_floor, options)?;
            }
        }

        *nit += 1;
        maybe_refactor(state, a, options)?;

        if *nit % STALL_WINDOW == 0 {
            let snapshot = state.snapshot();
            let obj = objective(state);
            let progressed = (last_obj - obj).abs() >= STALL_TOL || !state.equal(&last_snapshot, &snapshot);
            if !progressed {
                if perturbation.is_none() {
                    perturbation = Some(perturb(state, options));
                    stalled_once = true;
                } else if stalled_once {
                    return Err(Problem::from(SimplexError::NumericBreakdown));
                }
            }
            last_snapshot = snapshot;
            last_obj = obj;
        }
    }
}

fn apply_pivot(
    state: &mut SimplexState,
    a: &SparseMatrix,
    entering: usize,
    dir: f64,
    alpha: &[f64],
    ratio: &RatioResult,
    pivot_floor: f64,
    options: &SimplexOptions,
) -> Result<(), Problem> {
    match pivot::apply(state, a, entering, dir, alpha, ratio, pivot_floor) {
        Ok(outcome) => {
            if outcome.kind == PivotKind::Basic && outcome.refactor_pending {
                state.basis.refactor(a, &state.basis_header)?;
                state.pricing.invalidate();
                state.recompute_duals()?;
            }
            Ok(())
        }
        Err(e) => {
            // One refactor-and-retry on a recoverable numeric fault (§7
            // propagation policy), surfacing the error if the retry itself
            // fails.
            state.basis.refactor(a, &state.basis_header)?;
            state.pricing.invalidate();
            let _ = options;
            Err(e)
        }
    }
}

fn maybe_refactor(state: &mut SimplexState, a: &SparseMatrix, options: &SimplexOptions) -> Result<(), Problem> {
    if state.basis.needs_refactor(options.max_eta_updates()) {
        state.basis.refactor(a, &state.basis_header)?;
        state.pricing.invalidate();
        state.recompute_duals()?;
    }
    Ok(())
}

fn poll_gate(
    state: &SimplexState,
    hooks: &mut SolverHooks,
    nit: usize,
    max_iter: usize,
    feas_tol: f64,
    opt_tol: f64,
) -> Result<Option<PhaseOutcome>, Problem> {
    hooks.terminator.observe_iteration(nit);
    if let Some(status) = hooks.terminator.terminate() {
        return Ok(Some(PhaseOutcome::Terminated(status)));
    }
    if nit >= max_iter {
        return Ok(Some(PhaseOutcome::Terminated(Status::IterationLimit)));
    }
    let snapshot = state.to_solver_state(nit, Status::InProgress, feas_tol, opt_tol);
    hooks.callback.call(&snapshot);
    Ok(None)
}

fn objective(state: &SimplexState) -> f64 {
    (0..state.n).map(|j| state.c[j] * state.x[j]).sum()
}

/// §4.F "Phase 1 ... artificial objective whose gradient matches violated
/// bounds": `-1` on a basic variable below its lower bound (increasing it
/// reduces infeasibility), `+1` above its upper bound, `0` everywhere else
/// including all nonbasic positions (already sitting at a bound).
fn phase1_costs(state: &SimplexState, feas_tol: f64) -> Vec<f64> {
    let mut costs = vec![0.0; state.ntot];
    let x_b = state.x_b();
    for (i, &j) in state.basis_header.iter().enumerate() {
        if x_b[i] < state.l[j] - feas_tol {
            costs[j] = -1.0;
        } else if x_b[i] > state.u[j] + feas_tol {
            costs[j] = 1.0;
        }
    }
    costs
}

fn recompute_duals_for(state: &mut SimplexState, a: &SparseMatrix, costs: &[f64]) -> Result<(), Problem> {
    let c_b: Vec<f64> = state.basis_header.iter().map(|&j| costs[j]).collect();
    state.pi = state.basis.btran(&c_b)?;
    for j in 0..state.ntot {
        if state.row_of[j].is_some() {
            state.d[j] = 0.0;
        } else {
            let (rows, vals) = a.column(j);
            let aty: f64 = rows.iter().zip(vals).map(|(&i, &v)| v * state.pi[i]).sum();
            state.d[j] = costs[j] - aty;
        }
    }
    Ok(())
}

/// §4.F "Perturbation (anti-cycling)": bounded, deterministic per-variable
/// noise added to both bounds; returns the perturbation so it can be
/// removed bit-for-bit later. Seed combines the configured `seed` option
/// (or a process/thread-derived fallback) with the variable index so the
/// sequence is reproducible across identical runs of the same process.
fn perturb(state: &mut SimplexState, options: &SimplexOptions) -> Vec<f64> {
    let feas_tol = options.feas_tol();
    let bound = PERTURB_SCALE * feas_tol;
    let base_seed = resolve_seed(options.seed());

    let mut xi = vec![0.0; state.ntot];
    for j in 0..state.ntot {
        let mut rng = SplitMix64::new(base_seed ^ (j as u64).wrapping_mul(0x9E3779B97F4A7C15));
        let u = rng.next_unit();
        xi[j] = (2.0 * u - 1.0) * bound;
        state.l[j] += xi[j];
        state.u[j] += xi[j];
    }
    xi
}

/// Removes a perturbation previously returned by `perturb`, restoring
/// `l`/`u` to `l_orig`/`u_orig` exactly (not `l - xi`, to avoid
/// accumulating floating-point drift across perturb/unperturb cycles).
///
/// The delta used to decide whether `x` needs nudging back inside its
/// restored bound must be computed *before* the working bound is
/// overwritten — computing it after, against the already-restored value,
/// collapses the delta to zero (the Open Question's `cxf_cleanup_helper`
/// bug class).
fn unperturb(state: &mut SimplexState, perturbation: &mut Option<Vec<f64>>) {
    if perturbation.take().is_none() {
        return;
    }
    for j in 0..state.ntot {
        let old_l = state.l[j];
        let old_u = state.u[j];
        state.l[j] = state.l_orig[j];
        state.u[j] = state.u_orig[j];
        if state.row_of[j].is_none() {
            let delta_l = state.l[j] - old_l;
            let delta_u = state.u[j] - old_u;
            if state.x[j] == old_l {
                state.x[j] += delta_l;
            } else if state.x[j] == old_u {
                state.x[j] += delta_u;
            }
        }
    }
}

/// A handful of cleanup pivots after unperturbing, restoring exact
/// feasibility against the true bounds (§4.F "at most a small number of
/// cleanup iterations restore exact feasibility").
fn cleanup(state: &mut SimplexState, a: &SparseMatrix, options: &SimplexOptions) -> Result<(), Problem> {
    const MAX_CLEANUP_ITERS: usize = 20;
    let feas_tol = options.feas_tol();
    let pivot_floor = options.pivot_floor();

    for _ in 0..MAX_CLEANUP_ITERS {
        if state.primal_infeasibility(feas_tol) <= feas_tol {
            return Ok(());
        }
        let costs1 = phase1_costs(state, feas_tol);
        recompute_duals_for(state, a, &costs1)?;
        let opt_tol = options.opt_tol();
        let Some((entering, dir)) = state.pricing.select(&state.d, &state.status, state.ntot, state.n, opt_tol) else {
            return Ok(());
        };
        let alpha = state.basis.ftran(&col_dense(a, entering, state.m))?;
        match harris_ratio_test(state, &alpha, dir, feas_tol) {
            RatioResult::Unbounded => return Err(Problem::from(SimplexError::NumericBreakdown)),
            ratio @ RatioResult::Leaving { .. } => {
                apply_pivot(state, a, entering, dir, &alpha, &ratio, pivot_floor, options)?;
            }
        }
    }
    state.recompute_duals()?;
    Ok(())
}

fn resolve_seed(option_seed: i64) -> u64 {
    if option_seed >= 0 {
        return option_seed as u64;
    }
    let pid = std::process::id() as u64;
    let tid = std::thread::current().id();
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    use std::hash::{Hash, Hasher};
    tid.hash(&mut hasher);
    pid.hash(&mut hasher);
    hasher.finish()
}

struct SplitMix64(u64);

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    fn next_unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn col_dense(a: &SparseMatrix, j: usize, m: usize) -> Vec<f64> {
    let mut v = vec![0.0; m];
    let (rows, vals) = a.column(j);
    for (&i, &val) in rows.iter().zip(vals) {
        v[i] = val;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splitmix64_is_deterministic_and_bounded() {
        let mut a = SplitMix64::new(42);
        let mut b = SplitMix64::new(42);
        for _ in 0..10 {
            let (ua, ub) = (a.next_unit(), b.next_unit());
            assert_eq!(ua, ub);
            assert!((0.0..1.0).contains(&ua));
        }
    }

    #[test]
    fn test_phase1_costs_flags_only_violated_basics() {
        use crate::lp::simplex::basis::Basis;
        use crate::lp::simplex::pricing::{PricingEngine, PricingKind};
        use crate::lp::simplex::state::VariableStatus;

        let a = SparseMatrix::from_triplets(1, 2, &[(0, 0, 1.0), (0, 1, 1.0)]);
        let mut basis = Basis::new(1);
        basis.refactor(&a, &[1]).unwrap();
        let state = SimplexState {
            n: 1,
            m: 1,
            ntot: 2,
            a: SparseMatrix::from_triplets(1, 2, &[(0, 0, 1.0), (0, 1, 1.0)]),
            status: vec![VariableStatus::AtLower, VariableStatus::Basic],
            basis_header: vec![1],
            row_of: vec![None, Some(0)],
            x: vec![0.0, -3.0],
            c: vec![0.0, 0.0],
            b: vec![-3.0],
            l: vec![0.0, 0.0],
            u: vec![f64::INFINITY, f64::INFINITY],
            l_orig: vec![0.0, 0.0],
            u_orig: vec![f64::INFINITY, f64::INFINITY],
            d: vec![0.0, 0.0],
            pi: vec![0.0],
            basis,
            pricing: PricingEngine::new(PricingKind::Dantzig, 2, 1),
            work_counter: 0,
            perturbed: false,
            refactor_pending: false,
        };
        let costs = phase1_costs(&state, 1e-6);
        assert_eq!(costs[1], -1.0);
        assert_eq!(costs[0], 0.0);
    }
}
