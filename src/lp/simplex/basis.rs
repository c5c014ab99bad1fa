//! Product-form-of-inverse basis (§4.A): an LU factorization of the basis
//! matrix at the last refactor, plus an eta file recording every pivot
//! applied since then. FTRAN and BTRAN both end up touching the LU solve
//! once and the eta file once per update, never re-factoring on every
//! iteration the way a dense `B^-1` would force.

use faer::sparse::{SparseColMat, Triplet};
use faer::{Mat, MatMut};
use problemo::Problem;

use crate::linalg::lu::SimplicialSparseLu;
use crate::linalg::solver::Solver;
use crate::{E, I};

use super::error::SimplexError;
use super::matrix::SparseMatrix;

/// One pivot's worth of update: row `r` became basic via the FTRAN'd column
/// `alpha = B^-1 A_{·q}`. `iteration` records the basis iteration at which
/// this eta was created (DATA MODEL §4.B: "Each eta also stores the basis
/// iteration at which it was created, for pricing invalidation checks").
struct Eta {
    r: usize,
    alpha: Vec<E>,
    iteration: usize,
}

/// Basis representation: an LU factorization of `B` at the last refactor,
/// plus the chain of etas applied since.
pub struct Basis {
    m: usize,
    lu: SimplicialSparseLu,
    etas: Vec<Eta>,
    /// Monotonically increasing pivot counter; stamped onto each eta as it
    /// is pushed and reset to 0 on `refactor`.
    iteration: usize,
}

impl Basis {
    pub fn new(m: usize) -> Self {
        Self { m, lu: SimplicialSparseLu::new(), etas: Vec::new(), iteration: 0 }
    }

    pub fn eta_len(&self) -> usize {
        self.etas.len()
    }

    pub fn needs_refactor(&self, max_eta_updates: usize) -> bool {
        self.etas.len() >= max_eta_updates
    }

    /// Refactors `B` from scratch given the columns of `a` named by
    /// `basis_header` (one column of `a`, keyed by structural/slack index,
    /// per basic row) and drops the eta file.
    pub fn refactor(&mut self, a: &SparseMatrix, basis_header: &[usize]) -> Result<(), Problem> {
        debug_assert_eq!(basis_header.len(), self.m);

        let mut triplets = Vec::new();
        for (col, &j) in basis_header.iter().enumerate() {
            let (rows, vals) = a.column(j);
            for (&i, &v) in rows.iter().zip(vals) {
                triplets.push(Triplet::new(i as I, col as I, v));
            }
        }
        let b = SparseColMat::try_new_from_triplets(self.m, self.m, &triplets)
            .map_err(|_| Problem::from(SimplexError::InvalidInput))?;

        self.lu.analyze(b.as_ref())?;
        self.lu
            .factorize(b.as_ref())
            .map_err(|_| Problem::from(SimplexError::NumericBreakdown))?;
        self.etas.clear();
        self.iteration = 0;
        Ok(())
    }

    /// FTRAN: solves `B w = v`. The LU solve against the last-refactored
    /// basis runs first, then etas are replayed in creation order (oldest
    /// pivot first) since each one records a change made *after* the
    /// previous basis state.
    pub fn ftran(&self, v: &[E]) -> Result<Vec<E>, Problem> {
        let rhs = Mat::from_fn(self.m, 1, |i, _| v[i]);
        let sol = self
            .lu
            .solve(rhs.as_ref())
            .map_err(|_| Problem::from(SimplexError::NumericBreakdown))?;
        let mut w: Vec<E> = (0..self.m).map(|i| sol[(i, 0)]).collect();

        for eta in &self.etas {
            let r = eta.r;
            let wr = w[r] / eta.alpha[r];
            for (i, &ai) in eta.alpha.iter().enumerate() {
                if i == r {
                    continue;
                }
                w[i] -= ai * wr;
            }
            w[r] = wr;
        }
        Ok(w)
    }

    /// BTRAN: solves `B^T y = c`. The transposed etas apply first, in
    /// *reverse* creation order (newest pivot first) — `B^-T` is the
    /// product of the individual `E_t^-T` factors applied right-to-left
    /// against `c`, with the LU transpose-solve (against the oldest,
    /// refactor-time basis) acting last.
    pub fn btran(&self, c: &[E]) -> Result<Vec<E>, Problem> {
        let mut v = c.to_vec();

        for eta in self.etas.iter().rev() {
            let r = eta.r;
            let vr_old = v[r];
            let s = dot(&eta.alpha, &v);
            v[r] = vr_old - (s - vr_old) / eta.alpha[r];
        }

        let mut sol = Mat::from_fn(self.m, 1, |i, _| v[i]);
        let mut sol_mut: MatMut<E> = sol.as_mut();
        self.lu
            .solve_transpose_in_place(&mut sol_mut)
            .map_err(|_| Problem::from(SimplexError::NumericBreakdown))?;
        Ok((0..self.m).map(|i| sol[(i, 0)]).collect())
    }

    /// Records the pivot that replaced row `r`'s basic variable, given the
    /// already-FTRAN'd entering column `alpha = B^-1 A_{·q}`. Rejects a
    /// pivot element below `pivot_floor` rather than poisoning the eta
    /// file with a near-singular update.
    pub fn push_eta(&mut self, r: usize, alpha: Vec<E>, pivot_floor: E) -> Result<(), Problem> {
        if alpha[r].abs() < pivot_floor {
            return Err(Problem::from(SimplexError::NumericBreakdown));
        }
        self.etas.push(Eta { r, alpha, iteration: self.iteration });
        self.iteration += 1;
        Ok(())
    }

    /// The basis iteration the most recently pushed eta was created at, or
    /// `None` if no eta has been pushed since the last refactor.
    pub fn last_eta_iteration(&self) -> Option<usize> {
        self.etas.last().map(|eta| eta.iteration)
    }
}

fn dot(x: &[E], y: &[E]) -> E {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_basis(m: usize) -> Basis {
        let mut basis = Basis::new(m);
        let triplets: Vec<_> = (0..m).map(|i| (i, i, 1.0)).collect();
        let a = SparseMatrix::from_triplets(m, m, &triplets);
        let header: Vec<usize> = (0..m).collect();
        basis.refactor(&a, &header).unwrap();
        basis
    }

    #[test]
    fn test_ftran_btran_identity() {
        let basis = identity_basis(3);
        let v = vec![1.0, 2.0, 3.0];
        assert_eq!(basis.ftran(&v).unwrap(), v);
        assert_eq!(basis.btran(&v).unwrap(), v);
    }

    #[test]
    fn test_eta_round_trip() {
        // Pivot row 1 on alpha = [1, 2, 1]: B' = B * E where E is the eta
        // matrix for (r=1, alpha). FTRAN(alpha) against the *updated* basis
        // must recover e_1, since alpha is by construction the column that
        // became basic in row 1.
        let mut basis = identity_basis(3);
        let alpha = vec![1.0, 2.0, 1.0];
        basis.push_eta(1, alpha.clone(), 1e-10).unwrap();
        assert_eq!(basis.eta_len(), 1);

        let w = basis.ftran(&alpha).unwrap();
        assert!((w[0] - 0.0).abs() < 1e-9);
        assert!((w[1] - 1.0).abs() < 1e-9);
        assert!((w[2] - 0.0).abs() < 1e-9);

        // BTRAN must be the adjoint operation: <B'^-1 x, y> == <x, B'^-T y>.
        let x = vec![0.3, -1.2, 2.5];
        let y = vec![1.1, 0.4, -0.7];
        let lhs = dot(&basis.ftran(&x).unwrap(), &y);
        let rhs = dot(&x, &basis.btran(&y).unwrap());
        assert!((lhs - rhs).abs() < 1e-9);
    }

    #[test]
    fn test_needs_refactor() {
        let mut basis = identity_basis(2);
        assert!(!basis.needs_refactor(2));
        basis.push_eta(0, vec![1.0, 0.0], 1e-10).unwrap();
        basis.push_eta(1, vec![0.0, 1.0], 1e-10).unwrap();
        assert!(basis.needs_refactor(2));
    }

    #[test]
    fn test_push_eta_rejects_tiny_pivot() {
        let mut basis = identity_basis(2);
        let err = basis.push_eta(0, vec![1e-12, 0.0], 1e-10);
        assert!(err.is_err());
    }

    #[test]
    fn test_eta_iteration_advances_and_resets_on_refactor() {
        let mut basis = identity_basis(2);
        assert_eq!(basis.last_eta_iteration(), None);

        basis.push_eta(0, vec![1.0, 0.0], 1e-10).unwrap();
        assert_eq!(basis.last_eta_iteration(), Some(0));

        basis.push_eta(1, vec![0.0, 1.0], 1e-10).unwrap();
        assert_eq!(basis.last_eta_iteration(), Some(1));

        let triplets: Vec<_> = (0..2).map(|i| (i, i, 1.0)).collect();
        let a = SparseMatrix::from_triplets(2, 2, &triplets);
        basis.refactor(&a, &[0, 1]).unwrap();
        assert_eq!(basis.last_eta_iteration(), None);

        basis.push_eta(0, vec![1.0, 0.0], 1e-10).unwrap();
        assert_eq!(basis.last_eta_iteration(), Some(0));
    }
}
