//! §3 data model: variable status, basis header, and the working primal/
//! dual/pricing vectors the rest of the core reads and mutates each pivot.
//!
//! The core never sees the model-builder's per-row senses directly — at
//! setup (`SimplexState::new`) every row gets a logical slack column
//! appended to the structural columns, so row `i` reads `a_i^T x + s_i =
//! b_i` uniformly and only the slack's bounds carry the sense:
//! `Le -> s_i in [0, inf)`, `Ge -> s_i in (-inf, 0]`, `Eq -> s_i` fixed at
//! zero. `A_aug = [A | I]` then has an identity submatrix for free, which
//! is exactly the all-slack crash basis the orchestrator starts from.

use faer::Col;
use problemo::Problem;

use crate::lp::{LinearProgram, Sense};
use crate::{E, Status};

use super::basis::Basis;
use super::error::SimplexError;
use super::matrix::SparseMatrix;
use super::options::SimplexOptions;
use super::pricing::{PricingEngine, PricingKind};

/// §3 "Variable status": BASIC additionally carries its basis row via
/// `SimplexState::row_of`; the partition of nonbasic variables lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableStatus {
    Basic,
    AtLower,
    AtUpper,
    Free,
    Fixed,
    Superbasic,
}

/// Owning container for one solve's working state (§9 "cyclic references":
/// components hold index-based back-pointers into this, nothing owns
/// another component's memory).
#[allow(non_snake_case)]
pub struct SimplexState {
    /// Structural variable count.
    pub n: usize,
    /// Row / slack count.
    pub m: usize,
    /// `n + m`, the augmented column count.
    pub ntot: usize,

    /// `[A | I]`, built once at setup; read-only for the rest of the solve.
    pub a: SparseMatrix,

    pub status: Vec<VariableStatus>,
    /// `basis_header[r]` is the variable index basic in row `r`.
    pub basis_header: Vec<usize>,
    /// Inverse of `basis_header`: `row_of[j] = Some(r)` iff `j` is basic.
    pub row_of: Vec<Option<usize>>,

    /// Current value of every variable (structural + slack).
    pub x: Vec<E>,
    /// Objective coefficients, zero-extended for slacks.
    pub c: Vec<E>,
    /// The augmented system's right-hand side, `A_aug x = b` (§4.H
    /// iterative refinement needs the true `b`, not a value recovered from
    /// the current, possibly drifted, `x`).
    pub b: Vec<E>,
    /// Working bounds, perturbed during anti-cycling (§4.F).
    pub l: Vec<E>,
    pub u: Vec<E>,
    /// Bounds as given by the model, restored by `unperturb`.
    pub l_orig: Vec<E>,
    pub u_orig: Vec<E>,

    /// Reduced costs `d_j = c_j - pi^T A_{.j}`.
    pub d: Vec<E>,
    /// Dual row values `pi = B^-T c_B`.
    pub pi: Vec<E>,

    pub basis: Basis,
    pub pricing: PricingEngine,

    /// §5's work accumulator, driving refactor triggers alongside eta length.
    pub work_counter: usize,
    pub perturbed: bool,
    pub refactor_pending: bool,
}

impl SimplexState {
    /// Builds `[A | I]`, the zero-extended objective, the slack bounds
    /// implied by each row's sense, and an initial all-slack basis with
    /// every structural variable nonbasic at its finite bound (or zero, if
    /// free/both-infinite).
    pub fn new(lp: &LinearProgram, options: &SimplexOptions) -> Result<Self, Problem> {
        let (n, m) = lp.get_dims();
        let ntot = n + m;
        let infinity = options.infinity();

        let mut c = vec![0.0; ntot];
        for j in 0..n {
            c[j] = lp.c()[j];
        }

        let mut l = vec![0.0; ntot];
        let mut u = vec![0.0; ntot];
        for j in 0..n {
            l[j] = sentinel(lp.l()[j], infinity);
            u[j] = sentinel(lp.u()[j], infinity);
            if l[j] > u[j] {
                return Err(Problem::from(SimplexError::InvalidInput));
            }
        }

        let a_sym = lp.a().symbolic();
        let col_ptr = a_sym.col_ptr();
        let row_idx = a_sym.row_idx();
        let values = lp.a().val();

        let mut triplets = Vec::with_capacity(values.len() + m);
        for j in 0..n {
            let (s, e) = (col_ptr[j], col_ptr[j + 1]);
            for k in s..e {
                triplets.push((row_idx[k], j, values[k]));
            }
        }
        // Row `i` reads `a_i^T x + s_i = b_i`; the RHS lives entirely in the
        // slack's initial value (set below from `b - A x_N`), so the
        // slack's *bounds* only need to carry the sense.
        for i in 0..m {
            triplets.push((i, n + i, 1.0));
            let (lo, hi) = match lp.senses()[i] {
                Sense::Le => (0.0, infinity),
                Sense::Ge => (-infinity, 0.0),
                Sense::Eq => (0.0, 0.0),
            };
            l[n + i] = lo;
            u[n + i] = hi;
        }

        let a = SparseMatrix::from_triplets(m, ntot, &triplets);

        let l_orig = l.clone();
        let u_orig = u.clone();

        let mut status = vec![VariableStatus::AtLower; ntot];
        let mut x = vec![0.0; ntot];
        for j in 0..n {
            let (lj, uj) = (l[j], u[j]);
            if lj.is_infinite() && uj.is_infinite() {
                status[j] = VariableStatus::Free;
                x[j] = 0.0;
            } else if lj == uj {
                status[j] = VariableStatus::Fixed;
                x[j] = lj;
            } else if lj.is_finite() {
                status[j] = VariableStatus::AtLower;
                x[j] = lj;
            } else {
                status[j] = VariableStatus::AtUpper;
                x[j] = uj;
            }
        }

        let mut basis_header = vec![0usize; m];
        let mut row_of = vec![None; ntot];
        for i in 0..m {
            let slack = n + i;
            basis_header[i] = slack;
            row_of[slack] = Some(i);
            status[slack] = VariableStatus::Basic;
        }

        let b: Vec<E> = (0..m).map(|i| sentinel(lp.b()[i], infinity)).collect();

        // x_B from b - A_structural x_N, i.e. the slack absorbing whatever
        // the fixed structural variables contribute.
        let ax = a.sparse_ax(&x);
        for i in 0..m {
            x[n + i] = b[i] - ax[i];
        }

        let pricing_kind = PricingKind::from_option(options.pricing(), n);
        let pricing = PricingEngine::new(pricing_kind, ntot, n);

        Ok(Self {
            n,
            m,
            ntot,
            a,
            status,
            basis_header,
            row_of,
            x,
            c,
            b,
            l,
            u,
            l_orig,
            u_orig,
            d: vec![0.0; ntot],
            pi: vec![0.0; m],
            basis: Basis::new(m),
            pricing,
            work_counter: 0,
            perturbed: false,
            refactor_pending: false,
        })
    }

    /// Copies `x_B` values out of the dense `x` array, in basis-row order.
    pub fn x_b(&self) -> Vec<E> {
        self.basis_header.iter().map(|&j| self.x[j]).collect()
    }

    pub fn set_x_b(&mut self, xb: &[E]) {
        for (r, &j) in self.basis_header.iter().enumerate() {
            self.x[j] = xb[r];
        }
    }

    /// Recomputes `pi = B^-T c_B` and `d_j = c_j - pi^T A_{.j}` from
    /// scratch; used after a refactor, when incremental pricing state is
    /// declared stale (§4.C "Invalidation").
    pub fn recompute_duals(&mut self) -> Result<(), Problem> {
        let c_b: Vec<E> = self.basis_header.iter().map(|&j| self.c[j]).collect();
        self.pi = self.basis.btran(&c_b)?;
        for j in 0..self.ntot {
            if self.row_of[j].is_some() {
                self.d[j] = 0.0;
            } else {
                let (rows, vals) = self.a.column(j);
                let aty: E = rows.iter().zip(vals).map(|(&i, &v)| v * self.pi[i]).sum();
                self.d[j] = self.c[j] - aty;
            }
        }
        Ok(())
    }

    /// Total primal infeasibility: sum of basic-variable bound violations
    /// (§4.F Phase 1's termination criterion, also used by stall detection).
    pub fn primal_infeasibility(&self, feas_tol: E) -> E {
        let x_b = self.x_b();
        self.basis_header
            .iter()
            .enumerate()
            .map(|(i, &j)| {
                let v = x_b[i];
                if v < self.l[j] - feas_tol {
                    self.l[j] - v
                } else if v > self.u[j] + feas_tol {
                    v - self.u[j]
                } else {
                    0.0
                }
            })
            .sum()
    }

    /// Largest attractive reduced cost still outstanding, `0.0` if none
    /// (used as the dual residual reported to callbacks).
    pub fn dual_infeasibility(&self, opt_tol: E) -> E {
        (0..self.ntot)
            .filter_map(|j| {
                super::pricing::PricingEngine::attractive_direction(j, &self.d, &self.status, opt_tol)
                    .map(|_| self.d[j].abs())
            })
            .fold(0.0, E::max)
    }

    /// Projects the internal working state into the public, callback-facing
    /// snapshot (`crate::SolverState`); the simplex core never exposes its
    /// basis header, eta file, or pricing weights directly (§9).
    pub fn to_solver_state(&self, nit: usize, status: Status, feas_tol: E, opt_tol: E) -> crate::SolverState {
        let mut solver_state = crate::SolverState::new(self.n, self.m);
        solver_state.set_status(status);
        solver_state.set_iteration(nit);
        solver_state.set_primal(Col::from_fn(self.n, |i| self.x[i]));
        solver_state.set_dual(Col::from_fn(self.m, |i| self.pi[i]));
        let obj_val: E = (0..self.n).map(|j| self.c[j] * self.x[j]).sum();
        solver_state.set_objective(obj_val);
        solver_state.set_residual(self.primal_infeasibility(feas_tol), self.dual_infeasibility(opt_tol));
        solver_state
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot { basis_header: self.basis_header.clone(), status: self.status.clone() }
    }

    pub fn equal(&self, a: &Snapshot, b: &Snapshot) -> bool {
        let _ = self;
        a.basis_header == b.basis_header && a.status == b.status
    }
}

fn sentinel(v: E, infinity: E) -> E {
    if v <= -infinity {
        E::NEG_INFINITY
    } else if v >= infinity {
        E::INFINITY
    } else {
        v
    }
}

/// A basis-header/status pair, comparable for cycling detection (§4.B
/// `snapshot`/`diff`/`equal`) and as the stall-window reference point
/// (§4.F "a basis snapshot is taken every `stall_window` iterations").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub basis_header: Vec<usize>,
    pub status: Vec<VariableStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lp::LinearProgram;
    use faer::sparse::{SparseColMat, Triplet};

    fn options() -> SimplexOptions {
        SimplexOptions::new(&crate::SolverOptions::new())
    }

    #[test]
    fn test_new_derives_slack_bounds_by_sense() {
        let a_triplets: [Triplet<usize, usize, E>; 2] =
            [Triplet::new(0, 0, 1.0), Triplet::new(1, 0, 1.0)];
        let a = SparseColMat::try_new_from_triplets(2, 1, &a_triplets).unwrap();
        let lp = LinearProgram::new(
            Col::from_fn(1, |_| 1.0),
            a,
            Col::from_fn(2, |i| [5.0, 5.0][i]),
            vec![Sense::Le, Sense::Ge],
            Col::zeros(1),
            Col::from_fn(1, |_| E::INFINITY),
        );
        let state = SimplexState::new(&lp, &options()).unwrap();
        assert_eq!(state.n, 1);
        assert_eq!(state.m, 2);
        // slack 0 (Le row): [0, inf)
        assert_eq!(state.l[1], 0.0);
        assert!(state.u[1].is_infinite() && state.u[1] > 0.0);
        // slack 1 (Ge row): (-inf, 0]
        assert!(state.l[2].is_infinite() && state.l[2] < 0.0);
        assert_eq!(state.u[2], 0.0);
    }

    #[test]
    fn test_new_fixes_equality_slack_at_zero() {
        let a_triplets: [Triplet<usize, usize, E>; 1] = [Triplet::new(0, 0, 1.0)];
        let a = SparseColMat::try_new_from_triplets(1, 1, &a_triplets).unwrap();
        let lp = LinearProgram::new_equality(
            Col::from_fn(1, |_| 1.0),
            a,
            Col::from_fn(1, |_| 3.0),
            Col::zeros(1),
            Col::from_fn(1, |_| E::INFINITY),
        );
        let state = SimplexState::new(&lp, &options()).unwrap();
        assert_eq!(state.l[1], 0.0);
        assert_eq!(state.u[1], 0.0);
        assert_eq!(state.status[1], VariableStatus::Fixed);
    }

    #[test]
    fn test_new_classifies_free_and_bounded_structurals() {
        let a_triplets: [Triplet<usize, usize, E>; 2] =
            [Triplet::new(0, 0, 1.0), Triplet::new(0, 1, 1.0)];
        let a = SparseColMat::try_new_from_triplets(1, 2, &a_triplets).unwrap();
        let lp = LinearProgram::new_equality(
            Col::from_fn(2, |_| 0.0),
            a,
            Col::from_fn(1, |_| 0.0),
            Col::from_fn(2, |i| [E::NEG_INFINITY, 2.0][i]),
            Col::from_fn(2, |i| [E::INFINITY, 5.0][i]),
        );
        let state = SimplexState::new(&lp, &options()).unwrap();
        assert_eq!(state.status[0], VariableStatus::Free);
        assert_eq!(state.status[1], VariableStatus::AtLower);
        assert_eq!(state.x[1], 2.0);
    }

    #[test]
    fn test_new_rejects_inverted_bounds() {
        let a_triplets: [Triplet<usize, usize, E>; 1] = [Triplet::new(0, 0, 1.0)];
        let a = SparseColMat::try_new_from_triplets(1, 1, &a_triplets).unwrap();
        let lp = LinearProgram::new_equality(
            Col::from_fn(1, |_| 1.0),
            a,
            Col::from_fn(1, |_| 0.0),
            Col::from_fn(1, |_| 5.0),
            Col::from_fn(1, |_| 1.0),
        );
        assert!(SimplexState::new(&lp, &options()).is_err());
    }

    #[test]
    fn test_initial_basis_is_all_slack_and_feasible_when_rhs_in_bounds() {
        let a_triplets: [Triplet<usize, usize, E>; 1] = [Triplet::new(0, 0, 1.0)];
        let a = SparseColMat::try_new_from_triplets(1, 1, &a_triplets).unwrap();
        let lp = LinearProgram::new(
            Col::from_fn(1, |_| 1.0),
            a,
            Col::from_fn(1, |_| 5.0),
            vec![Sense::Le],
            Col::zeros(1),
            Col::from_fn(1, |_| E::INFINITY),
        );
        let state = SimplexState::new(&lp, &options()).unwrap();
        assert_eq!(state.basis_header, vec![1]);
        assert_eq!(state.row_of[1], Some(0));
        assert_eq!(state.x[1], 5.0);
        assert_eq!(state.primal_infeasibility(1e-6), 0.0);
    }
}
