//! §4.J numerical validators: the small, cheap checks run at input
//! validation time and just before a bound flip.

use problemo::Problem;

use crate::E;

use super::error::SimplexError;
use super::matrix::SparseMatrix;
use super::state::SimplexState;

/// `Ok` iff every element of `v` is finite; otherwise `InvalidInput` with
/// the first offending position.
pub fn finite_array(v: &[E]) -> Result<(), Problem> {
    match v.iter().position(|x| !x.is_finite()) {
        None => Ok(()),
        Some(_) => Err(Problem::from(SimplexError::InvalidInput)),
    }
}

/// Subset check of `finite_array` that accepts `+-inf` (only NaN fails).
pub fn no_nan(v: &[E]) -> Result<(), Problem> {
    match v.iter().position(|x| x.is_nan()) {
        None => Ok(()),
        Some(_) => Err(Problem::from(SimplexError::InvalidInput)),
    }
}

/// `alpha` is not NaN and `|alpha| >= tol`.
pub fn pivot_ok(alpha: E, tol: E) -> bool {
    !alpha.is_nan() && alpha.abs() >= tol
}

/// §4.J "implied_bounds": tightens `(l_j, u_j)` by propagating every
/// constraint row that mentions `j`, using the dual bound sums of the
/// other columns in each row. For row `i` with `a_i^T x {<=,=,>=} b_i`,
/// isolating `x_j` gives
/// `a_ij x_j {<=,=,>=} b_i - sum_{k != j} a_ik x_k`,
/// whose right side is bounded by substituting each `x_k`'s finite bound
/// in the direction that makes the sum smallest (for an upper bound on
/// `x_j`) or largest (for a lower bound), depending on the sign of
/// `a_ij`. `l_hat_j > u_hat_j` on return signals infeasibility.
pub fn implied_bounds(state: &SimplexState, a: &SparseMatrix, j: usize) -> (E, E) {
    let mut l_hat = state.l[j];
    let mut u_hat = state.u[j];

    let (rows, _) = a.column(j);
    for &i in rows {
        let (cols, vals) = a.row(i);
        let a_ij = *vals.iter().zip(cols).find(|(_, &c)| c == j).map(|(v, _)| v).unwrap_or(&0.0);
        if a_ij == 0.0 {
            continue;
        }

        // `A_aug x = b` is an invariant of every reachable state (basic
        // values are always resolved to satisfy it), so row `i`'s RHS is
        // recoverable from the current iterate rather than needing its
        // own storage.
        let b_i: E = cols.iter().zip(vals).map(|(&k, &v)| v * state.x[k]).sum();

        let mut sum_min = 0.0; // smallest possible sum_{k != j} a_ik x_k
        let mut sum_max = 0.0; // largest possible
        let mut bounded = true;
        for (&k, &a_ik) in cols.iter().zip(vals) {
            if k == j || a_ik == 0.0 {
                continue;
            }
            let (lk, uk) = (state.l[k], state.u[k]);
            if !lk.is_finite() || !uk.is_finite() {
                bounded = false;
                break;
            }
            if a_ik > 0.0 {
                sum_min += a_ik * lk;
                sum_max += a_ik * uk;
            } else {
                sum_min += a_ik * uk;
                sum_max += a_ik * lk;
            }
        }
        if !bounded {
            continue;
        }

        // `a_ij x_j = b_i - sum_{k != j} a_ik x_k`, so `x_j` ranges over
        // `[b_i - sum_max, b_i - sum_min] / a_ij`.
        let (lo, hi) = if a_ij > 0.0 {
            ((b_i - sum_max) / a_ij, (b_i - sum_min) / a_ij)
        } else {
            ((b_i - sum_min) / a_ij, (b_i - sum_max) / a_ij)
        };
        l_hat = l_hat.max(lo);
        u_hat = u_hat.min(hi);
    }

    (l_hat, u_hat)
}
