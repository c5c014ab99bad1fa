//! §4.G crossover: converts an interior point (from a non-simplex method
//! that only handed the orchestrator a primal/dual pair, not a vertex)
//! into a basic feasible solution the phase driver can continue from.

use problemo::Problem;

use crate::E;

use super::matrix::SparseMatrix;
use super::pivot;
use super::ratio::{RatioResult, harris_ratio_test};
use super::state::{SimplexState, VariableStatus};

const SNAP_TOL: E = 1e-7;
const TINY_TOL: E = 1e-10;

/// §4.G "Bound snap": classifies every structural variable against its
/// bounds (pass 1), then nudges any AT_LOWER/AT_UPPER variable still off
/// its target bound by more than `TINY_TOL` exactly onto it (pass 2).
/// Idempotent by construction — a variable already within `TINY_TOL` of
/// its classified bound is left untouched, so re-running on the output is
/// a no-op (§8 round-trip law).
pub fn bound_snap(state: &mut SimplexState, a: &SparseMatrix) -> Result<(), Problem> {
    let mut moves = Vec::new();
    for j in 0..state.n {
        if state.row_of[j].is_some() {
            continue;
        }
        let (l, u) = (state.l[j], state.u[j]);
        let d_l = state.x[j] - l;
        let d_u = u - state.x[j];

        let target_status = if l == u {
            VariableStatus::Fixed
        } else if !l.is_finite() && !u.is_finite() {
            VariableStatus::Basic
        } else if l.is_finite() && d_l.abs() < SNAP_TOL {
            VariableStatus::AtLower
        } else if u.is_finite() && d_u.abs() < SNAP_TOL {
            VariableStatus::AtUpper
        } else {
            VariableStatus::Superbasic
        };
        state.status[j] = target_status;

        match target_status {
            VariableStatus::AtLower if (state.x[j] - l).abs() > TINY_TOL => moves.push((j, l)),
            VariableStatus::AtUpper if (state.x[j] - u).abs() > TINY_TOL => moves.push((j, u)),
            _ => {}
        }
    }

    for (j, target) in moves {
        let alpha = state.basis.ftran(&col_dense(a, j, state.m))?;
        pivot::bound_move(state, &alpha, j, target);
    }

    Ok(())
}

/// §4.G "Basis construction": slacks of inequality rows become basic
/// first; any remaining empty row takes a SUPERBASIC column (an equality
/// row's own slack is FIXED at zero and cannot serve); a still-empty row
/// after that is forced onto an arbitrary SUPERBASIC (or, failing that,
/// left to the orchestrator's artificial-basis fallback).
pub fn build_basis(state: &mut SimplexState) {
    let mut row_filled = vec![false; state.m];
    let mut basis_header = vec![usize::MAX; state.m];

    for i in 0..state.m {
        let slack = state.n + i;
        if state.status[slack] != VariableStatus::Fixed {
            basis_header[i] = slack;
            row_filled[i] = true;
            state.status[slack] = VariableStatus::Basic;
            state.row_of[slack] = Some(i);
        }
    }

    let mut superbasics: Vec<usize> =
        (0..state.n).filter(|&j| state.status[j] == VariableStatus::Superbasic).collect();

    for i in 0..state.m {
        if row_filled[i] {
            continue;
        }
        if let Some(j) = superbasics.pop() {
            basis_header[i] = j;
            row_filled[i] = true;
            state.status[j] = VariableStatus::Basic;
            state.row_of[j] = Some(i);
        } else {
            // No superbasic left to seed this row: fall back to the row's
            // own (fixed-at-zero) slack so the basis stays square; Phase 1
            // will treat its zero span as an equality it must hold exactly.
            let slack = state.n + i;
            basis_header[i] = slack;
            row_filled[i] = true;
            state.status[slack] = VariableStatus::Basic;
            state.row_of[slack] = Some(i);
        }
    }

    state.basis_header = basis_header;
}

/// §4.G "Push superbasics": drives each remaining SUPERBASIC variable to
/// its nearer bound, pivoting it out (or jumping it all the way via a
/// bound flip) up to `max_push_iters`; anything left over is forced onto
/// its target bound, possibly leaving residual infeasibility for Phase 2
/// to clean up.
pub fn push_superbasics(
    state: &mut SimplexState,
    a: &SparseMatrix,
    max_push_iters: usize,
) -> Result<(), Problem> {
    for _ in 0..max_push_iters {
        let Some(j) = (0..state.n).find(|&j| state.status[j] == VariableStatus::Superbasic)
        else {
            return Ok(());
        };

        let (l, u) = (state.l[j], state.u[j]);
        let dir = if (state.x[j] - l).abs() <= (u - state.x[j]).abs() { -1.0 } else { 1.0 };

        let alpha = state.basis.ftran(&col_dense(a, j, state.m))?;
        match harris_ratio_test(state, &alpha, dir, 1e-6) {
            RatioResult::Unbounded => {
                // Nothing stops a full jump to the chosen bound.
                let span = state.u[j] - state.l[j];
                if span.is_finite() {
                    let mut x_b = state.x_b();
                    for (i, xb) in x_b.iter_mut().enumerate() {
                        *xb -= alpha[i] * dir * span;
                    }
                    state.set_x_b(&x_b);
                    state.x[j] = if dir > 0.0 { state.u[j] } else { state.l[j] };
                }
                state.status[j] =
                    if dir > 0.0 { VariableStatus::AtUpper } else { VariableStatus::AtLower };
            }
            ratio @ RatioResult::Leaving { .. } => {
                pivot::apply(state, a, j, dir, &alpha, &ratio, 1e-10)?;
            }
        }
    }

    // Leftovers forced onto their chosen bound; Phase 2 cleans up any
    // resulting primal infeasibility.
    for j in 0..state.n {
        if state.status[j] == VariableStatus::Superbasic {
            let (l, u) = (state.l[j], state.u[j]);
            if (state.x[j] - l).abs() <= (u - state.x[j]).abs() && l.is_finite() {
                state.x[j] = l;
                state.status[j] = VariableStatus::AtLower;
            } else if u.is_finite() {
                state.x[j] = u;
                state.status[j] = VariableStatus::AtUpper;
            }
        }
    }
    Ok(())
}

fn col_dense(a: &SparseMatrix, j: usize, m: usize) -> Vec<E> {
    let mut v = vec![0.0; m];
    let (rows, vals) = a.column(j);
    for (&i, &val) in rows.iter().zip(vals) {
        v[i] = val;
    }
    v
}
