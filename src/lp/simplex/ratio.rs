//! §4.D Harris two-pass ratio test: finds the leaving row for a given
//! entering column, tolerating small bound violations (down to
//! `-feas_tol`) so noise from earlier degenerate pivots doesn't block an
//! otherwise-valid step.

use crate::E;

use super::state::SimplexState;

pub enum RatioResult {
    Unbounded,
    Leaving { row: usize, pivot: E, theta: E },
}

/// `alpha = B^-1 A_{.entering}`; `dir` is the direction the entering
/// variable moves in (`+1` leaving its lower bound / decreasing from
/// `+inf` through a free variable, `-1` leaving its upper bound). Internally
/// this is folded into an effective column so every basic variable's
/// implied step is `x_b(i) -= alpha_eff[i] * theta` for `theta >= 0`, the
/// same convention `pivot.rs`/`crossover.rs` apply the accepted step under.
/// A positive `alpha_eff[i]` drives `x_b(i)` down towards its lower bound;
/// a negative one drives it up towards its upper bound.
pub fn harris_ratio_test(
    state: &SimplexState,
    alpha: &[E],
    dir: E,
    feas_tol: E,
) -> RatioResult {
    let alpha_eff: Vec<E> = alpha.iter().map(|&a| a * dir).collect();
    let tau = 10.0 * feas_tol;
    let x_b = state.x_b();

    // Pass 1: relaxed threshold, find theta_min.
    let mut theta_min = E::INFINITY;
    let mut any = false;
    for (i, &ai) in alpha_eff.iter().enumerate() {
        if ai.abs() <= tau {
            continue;
        }
        let j = state.basis_header[i];
        let theta = if ai > tau {
            let lj = state.l[j];
            if !lj.is_finite() {
                continue;
            }
            (x_b[i] - lj) / ai
        } else {
            let uj = state.u[j];
            if !uj.is_finite() {
                continue;
            }
            (x_b[i] - uj) / ai
        };
        if theta < -feas_tol {
            continue;
        }
        any = true;
        if theta < theta_min {
            theta_min = theta;
        }
    }

    if !any {
        return RatioResult::Unbounded;
    }
    if theta_min < 0.0 {
        theta_min = 0.0;
    }

    // Pass 2: among ratios within `feas_tol` of theta_min, pick the
    // largest |alpha_i| to keep the pivot numerically healthy. A
    // degenerate theta_min == 0 still runs this pass so the largest pivot
    // among the degenerate candidates wins.
    let mut best: Option<(usize, E)> = None;
    for (i, &ai) in alpha_eff.iter().enumerate() {
        if ai.abs() <= tau {
            continue;
        }
        let j = state.basis_header[i];
        let theta = if ai > tau {
            let lj = state.l[j];
            if !lj.is_finite() {
                continue;
            }
            (x_b[i] - lj) / ai
        } else {
            let uj = state.u[j];
            if !uj.is_finite() {
                continue;
            }
            (x_b[i] - uj) / ai
        };
        if theta < -feas_tol || theta > theta_min + feas_tol {
            continue;
        }
        if best.map_or(true, |(_, ba)| ai.abs() > ba.abs()) {
            best = Some((i, ai));
        }
    }

    match best {
        Some((row, pivot)) => RatioResult::Leaving { row, pivot, theta: theta_min.max(0.0) },
        None => RatioResult::Unbounded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::simplex::basis::Basis;
    use crate::lp::simplex::matrix::SparseMatrix;
    use crate::lp::simplex::pricing::{PricingEngine, PricingKind};
    use crate::lp::simplex::state::VariableStatus;

    fn toy_state() -> SimplexState {
        // One row, x0 + x1 = 5 (structural + slack basic in row 0), x1
        // (the slack) basic at 5 with bound [0, inf). Entering x0 with
        // alpha = [1] should hit the slack's lower bound at theta=5.
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
            d: vec![0.0, 0.0],
            pi: vec![0.0],
            basis,
            pricing: PricingEngine::new(PricingKind::Dantzig, 2, 1),
            work_counter: 0,
            perturbed: false,
            refactor_pending: false,
        }
    }

    #[test]
    fn test_ratio_test_basic_hits_lower_bound() {
        let state = toy_state();
        match harris_ratio_test(&state, &[1.0], 1.0, 1e-6) {
            RatioResult::Leaving { row, pivot, theta } => {
                assert_eq!(row, 0);
                assert_eq!(pivot, 1.0);
                assert!((theta - 5.0).abs() < 1e-9);
            }
            RatioResult::Unbounded => panic!("expected a leaving row"),
        }
    }

    #[test]
    fn test_ratio_test_unbounded_on_zero_column() {
        let state = toy_state();
        match harris_ratio_test(&state, &[0.0], 1.0, 1e-6) {
            RatioResult::Unbounded => {}
            RatioResult::Leaving { .. } => panic!("expected unbounded"),
        }
    }
}
