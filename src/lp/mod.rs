use faer::Col;
use faer::sparse::SparseColMat;

use crate::{E, I};

pub mod simplex;

/// The relational operator a constraint row enforces against its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// `a_i^T x <= b_i`
    Le,
    /// `a_i^T x = b_i`
    Eq,
    /// `a_i^T x >= b_i`
    Ge,
}

/// A linear program in general bounded-inequality form:
///
/// ```text
/// min  c^T x
/// s.t. a_i^T x {<=, =, >=} b_i   for each row i
///      l <= x <= u
/// ```
///
/// This is the model-builder's view; it carries one sense per row rather
/// than pre-augmented slacks. `lp::simplex` introduces slack columns
/// internally at setup time so that the core's own `SimplexState` is the
/// only place row senses turn into basic slack variables.
#[allow(non_snake_case)]
pub struct LinearProgram {
    /// Objective function coefficients.
    c: Col<E>,
    /// Constraint matrix (sparse, column-major).
    A: SparseColMat<I, E>,
    /// Right-hand side of each constraint row.
    b: Col<E>,
    /// Relational operator enforced by each row of `A`.
    senses: Vec<Sense>,
    /// Lower bounds on the variables.
    l: Col<E>,
    /// Upper bounds on the variables.
    u: Col<E>,
}

#[allow(non_snake_case)]
impl LinearProgram {
    /// Creates a new linear program from the objective, constraints, senses, and bounds.
    pub fn new(
        c: Col<E>,
        A: SparseColMat<I, E>,
        b: Col<E>,
        senses: Vec<Sense>,
        l: Col<E>,
        u: Col<E>,
    ) -> Self {
        assert_eq!(senses.len(), A.nrows(), "one sense per constraint row");
        assert_eq!(senses.len(), b.nrows(), "one sense per rhs entry");
        Self { c, A, b, senses, l, u }
    }

    /// Creates an equality-only linear program (`A x = b`), the common case
    /// for already-standardized models.
    pub fn new_equality(c: Col<E>, A: SparseColMat<I, E>, b: Col<E>, l: Col<E>, u: Col<E>) -> Self {
        let senses = vec![Sense::Eq; b.nrows()];
        Self::new(c, A, b, senses, l, u)
    }

    /// Returns the number of variables (columns of `A`).
    pub fn get_n_vars(&self) -> usize {
        self.c.nrows()
    }

    /// Returns the number of constraints (rows of `A`).
    pub fn get_n_cons(&self) -> usize {
        self.b.nrows()
    }

    /// Returns `(n_vars, n_cons)`.
    pub fn get_dims(&self) -> (usize, usize) {
        (self.get_n_vars(), self.get_n_cons())
    }

    pub fn c(&self) -> &Col<E> {
        &self.c
    }

    pub fn a(&self) -> &SparseColMat<I, E> {
        &self.A
    }

    pub fn b(&self) -> &Col<E> {
        &self.b
    }

    pub fn senses(&self) -> &[Sense] {
        &self.senses
    }

    pub fn l(&self) -> &Col<E> {
        &self.l
    }

    pub fn u(&self) -> &Col<E> {
        &self.u
    }

    /// Starting point for the builder that assembles a [`simplex::SimplexSolver`]
    /// for this model, e.g. `LinearProgram::solver_builder(&lp).with_options(&opts).build()`.
    pub fn solver_builder(lp: &LinearProgram) -> simplex::SimplexBuilder<'_> {
        simplex::SimplexBuilder::new(lp)
    }
}

#[cfg(test)]
mod test {
    use faer::sparse::Triplet;

    use super::*;

    #[test]
    fn test_dims() {
        let a_triplets: [Triplet<I, I, E>; 3] = [
            Triplet::new(0, 0, 1.),
            Triplet::new(0, 1, 1.),
            Triplet::new(1, 1, 1.),
        ];
        let a = SparseColMat::try_new_from_triplets(2, 2, a_triplets.as_slice()).unwrap();
        let lp = LinearProgram::new(
            Col::from_fn(2, |i| [1., 2.][i]),
            a,
            Col::from_fn(2, |i| [3., 4.][i]),
            vec![Sense::Le, Sense::Eq],
            Col::zeros(2),
            Col::from_fn(2, |_| E::INFINITY),
        );
        assert_eq!(lp.get_dims(), (2, 2));
        assert_eq!(lp.senses(), &[Sense::Le, Sense::Eq]);
    }
}
