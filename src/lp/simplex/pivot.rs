//! §4.E pivot executor: applies one accepted pivot (or a bound flip) to
//! the working state — primal values, basis header/status, eta file, and
//! pricing — and reports whether a refactor should run before the next
//! pivot.

use problemo::Problem;

use crate::E;

use super::matrix::SparseMatrix;
use super::ratio::RatioResult;
use super::state::{SimplexState, VariableStatus};
use super::validators::pivot_ok;

/// Outcome of one call to `apply`: either a genuine basis-changing pivot,
/// or one of the two variants that bypass the basis swap while still
/// updating `x`/`d`/flags (§4.E "Special variants").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotKind {
    Basic,
    BoundFlip,
}

pub struct PivotOutcome {
    pub kind: PivotKind,
    pub refactor_pending: bool,
}

/// Applies the pivot selected by pricing (`entering`, `dir`) and the ratio
/// test (`ratio`). `alpha = B^-1 A_{.entering}`, already computed by the
/// caller via FTRAN so the ratio test and the pivot share one FTRAN call.
pub fn apply(
    state: &mut SimplexState,
    a: &SparseMatrix,
    entering: usize,
    dir: E,
    alpha: &[E],
    ratio: &RatioResult,
    pivot_floor: E,
) -> Result<PivotOutcome, Problem> {
    let RatioResult::Leaving { row, pivot, theta } = ratio else {
        unreachable!("apply() must only be called with a Leaving ratio result")
    };
    let (row, pivot, theta) = (*row, *pivot, *theta);

    let leaving_var = state.basis_header[row];

    // Bound flip: the entering variable's own step would, if it ran to
    // completion, land it on its *other* finite bound before any basic
    // variable is displaced. Detected by comparing theta against the
    // entering variable's own bound-to-bound span.
    let entering_span = state.u[entering] - state.l[entering];
    if entering_span.is_finite() && theta >= entering_span - 1e-12 {
        return Ok(apply_bound_flip(state, alpha, entering, dir));
    }

    if !pivot_ok(pivot, pivot_floor) {
        return Err(Problem::from(super::error::SimplexError::NumericBreakdown));
    }

    // x_B -= alpha_eff * theta, x_entering += dir * theta.
    let mut x_b = state.x_b();
    for (i, xb) in x_b.iter_mut().enumerate() {
        *xb -= dir * alpha[i] * theta;
    }
    state.set_x_b(&x_b);
    state.x[entering] += dir * theta;

    let pivot_cost = {
        let (rows, _) = a.column(entering);
        rows.len()
    };

    state.pricing.update_after_pivot(
        &state.basis,
        &mut state.d,
        &state.row_of,
        state.ntot,
        state.m,
        a,
        entering,
        row,
        leaving_var,
        pivot,
    )?;

    state.basis.push_eta(row, alpha.to_vec(), pivot_floor)?;

    state.basis_header[row] = entering;
    state.row_of[entering] = Some(row);
    state.row_of[leaving_var] = None;
    state.status[entering] = VariableStatus::Basic;
    state.status[leaving_var] = leaving_status(state, leaving_var);
    state.x[leaving_var] = if state.status[leaving_var] == VariableStatus::AtUpper {
        state.u[leaving_var]
    } else {
        state.l[leaving_var]
    };

    state.work_counter += pivot_cost + state.ntot + 8;

    let refactor_pending = pivot.abs() < 10.0 * pivot_floor;
    state.refactor_pending = refactor_pending;

    Ok(PivotOutcome { kind: PivotKind::Basic, refactor_pending })
}

/// The leaving variable sits exactly on whichever finite bound its last
/// computed value is closest to; a variable with no finite bound at all
/// cannot leave the basis by hitting one, so this is only reached when at
/// least one side is finite (guaranteed by the ratio test only accepting
/// rows with a finite target on the binding side).
fn leaving_status(state: &SimplexState, j: usize) -> VariableStatus {
    let (l, u) = (state.l[j], state.u[j]);
    if l == u {
        VariableStatus::Fixed
    } else if !l.is_finite() {
        VariableStatus::AtUpper
    } else if !u.is_finite() {
        VariableStatus::AtLower
    } else if (state.x[j] - l).abs() <= (state.x[j] - u).abs() {
        VariableStatus::AtLower
    } else {
        VariableStatus::AtUpper
    }
}

/// Moves the entering variable directly from one finite bound to the
/// other without touching the basis: `x_B -= alpha * dir * span`,
/// `x_entering` flips, reduced costs are unaffected (no variable became
/// basic), and no eta is appended.
fn apply_bound_flip(state: &mut SimplexState, alpha: &[E], entering: usize, dir: E) -> PivotOutcome {
    let span = state.u[entering] - state.l[entering];
    let mut x_b = state.x_b();
    for (i, xb) in x_b.iter_mut().enumerate() {
        *xb -= alpha[i] * dir * span;
    }
    state.set_x_b(&x_b);
    state.x[entering] = if dir > 0.0 { state.u[entering] } else { state.l[entering] };
    state.status[entering] =
        if dir > 0.0 { VariableStatus::AtUpper } else { VariableStatus::AtLower };

    PivotOutcome { kind: PivotKind::BoundFlip, refactor_pending: false }
}

/// §4.G's "bound-move path": forces nonbasic variable `j` exactly onto
/// `target` and propagates the resulting shift into `x_B` via `alpha =
/// B^-1 A_{.j}`, without any ratio test — used by crossover's bound snap
/// (pass 2) where the move is known a priori to be small and safe.
pub fn bound_move(state: &mut SimplexState, alpha: &[E], j: usize, target: E) {
    let delta = target - state.x[j];
    let mut x_b = state.x_b();
    for (i, xb) in x_b.iter_mut().enumerate() {
        *xb -= alpha[i] * delta;
    }
    state.set_x_b(&x_b);
    state.x[j] = target;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::simplex::basis::Basis;
    use crate::lp::simplex::pricing::{PricingEngine, PricingKind};

    fn toy_state() -> SimplexState {
        let a = SparseMatrix::from_triplets(1, 2, &[(0, 0, 1.0), (0, 1, 1.0)]);
        let mut basis = Basis::new(1);
        basis.refactor(&a, &[1]).unwrap();
        SimplexState {
            n: 1,
            m: 1,
            ntot: 2,
            a,
            status: vec![VariableStatus::AtLower, VariableStatus::Basic],
            basis_header: vec![1],
            row_of: vec![None, Some(0)],
            x: vec![0.0, 5.0],
            c: vec![1.0, 0.0],
            b: vec![5.0],
            l: vec![0.0, 0.0],
            u: vec![E::INFINITY, E::INFINITY],
            l_orig: vec![0.0, 0.0],
            u_orig: vec![E::INFINITY, E::INFINITY],
            d: vec![1.0, 0.0],
            pi: vec![0.0],
            basis,
            pricing: PricingEngine::new(PricingKind::Dantzig, 2, 1),
            work_counter: 0,
            perturbed: false,
            refactor_pending: false,
        }
    }

    #[test]
    fn test_apply_basic_pivot_swaps_header() {
        let mut state = toy_state();
        let a = SparseMatrix::from_triplets(1, 2, &[(0, 0, 1.0), (0, 1, 1.0)]);
        let ratio = RatioResult::Leaving { row: 0, pivot: 1.0, theta: 5.0 };
        let outcome = apply(&mut state, &a, 0, 1.0, &[1.0], &ratio, 1e-10).unwrap();
        assert_eq!(outcome.kind, PivotKind::Basic);
        assert_eq!(state.basis_header[0], 0);
        assert_eq!(state.status[0], VariableStatus::Basic);
        assert_eq!(state.status[1], VariableStatus::AtLower);
        assert!((state.x[0] - 5.0).abs() < 1e-9);
        assert!((state.x[1] - 0.0).abs() < 1e-9);
    }
}
