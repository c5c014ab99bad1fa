//! §4.C pricing engine: selects the entering variable and maintains
//! reduced costs and steepest-edge weights across pivots.
//!
//! Strategies are a tagged union dispatched by `match` rather than a trait
//! object (§9 "Dynamic dispatch for pricing strategies... a small vtable
//! of (init, select, update, invalidate)") — `Devex` aliases to
//! `SteepestEdge` per §4.C, so the match has exactly three live arms.

use problemo::Problem;

use crate::E;

use super::basis::Basis;
use super::matrix::SparseMatrix;
use super::state::VariableStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingKind {
    Dantzig,
    Partial,
    SteepestEdge,
    Devex,
}

impl PricingKind {
    /// §6 `pricing` option: 0=auto, 1=partial, 2=steepest-edge, 3=devex.
    /// Auto picks Dantzig below 1,000 structural variables, partial pricing
    /// above it, matching §4.C's stated default split.
    pub fn from_option(code: u8, n_structural: usize) -> Self {
        match code {
            1 => PricingKind::Partial,
            2 => PricingKind::SteepestEdge,
            3 => PricingKind::Devex,
            _ => {
                if n_structural < 1_000 {
                    PricingKind::Dantzig
                } else {
                    PricingKind::Partial
                }
            }
        }
    }
}

pub struct PricingEngine {
    kind: PricingKind,
    /// Steepest-edge weights `gamma_j >= 1` after clamping (§4.C).
    weights: Vec<E>,
    /// Rotating partial-pricing section.
    section: usize,
    n_sections: usize,
    section_size: usize,
    /// `-1` once a bound/objective change or refactor invalidates the
    /// cached candidate list; the next `select` then performs a full scan.
    cached_count: i64,
}

const SMALL_FLOOR: E = 1.0;
const WEIGHT_CLAMP_TOL: E = 1e-10;

impl PricingEngine {
    pub fn new(kind: PricingKind, ntot: usize, n_structural: usize) -> Self {
        let n_sections = (n_structural as f64).sqrt().ceil().max(1.0) as usize;
        let section_size = n_structural.div_ceil(n_sections).max(1);
        Self {
            kind,
            weights: vec![SMALL_FLOOR; ntot],
            section: 0,
            n_sections,
            section_size,
            cached_count: -1,
        }
    }

    /// "Attractive" for minimization (§4.C): the direction nonbasic `j`
    /// would move in to reduce the objective, or `None` if it is already
    /// optimal within `opt_tol`. Takes the reduced-cost and status slices
    /// directly (rather than the whole state) so `select`, which borrows
    /// `state.pricing` mutably, can call it alongside other `state` fields
    /// without aliasing the struct that field lives in.
    pub(crate) fn attractive_direction(
        j: usize,
        d: &[E],
        status: &[VariableStatus],
        opt_tol: E,
    ) -> Option<E> {
        let dj = d[j];
        match status[j] {
            VariableStatus::AtLower => (dj < -opt_tol).then_some(1.0),
            VariableStatus::AtUpper => (dj > opt_tol).then_some(-1.0),
            VariableStatus::Free | VariableStatus::Superbasic => {
                if dj > opt_tol {
                    Some(-1.0)
                } else if dj < -opt_tol {
                    Some(1.0)
                } else {
                    None
                }
            }
            VariableStatus::Basic | VariableStatus::Fixed => None,
        }
    }

    fn score(&self, j: usize, d: &[E]) -> E {
        match self.kind {
            PricingKind::Dantzig | PricingKind::Partial => d[j].abs(),
            PricingKind::SteepestEdge | PricingKind::Devex => d[j].abs() / self.weights[j].sqrt(),
        }
    }

    /// Invalidated by a full refactor, a bound change, or an objective
    /// change (§4.C "Invalidation"): weights reset to 1 and the cached
    /// candidate list is dropped.
    pub fn invalidate(&mut self) {
        self.weights.fill(SMALL_FLOOR);
        self.cached_count = -1;
    }

    /// §4.C.2 two-phase pricing: a partial-section (or steepest-edge)
    /// scan first, falling back to a full scan only if the first pass
    /// finds nothing attractive. Optimality is declared only once both
    /// passes come up empty.
    ///
    /// Takes the `d`/`status`/`ntot`/`n` fields individually rather than
    /// `&SimplexState` so call sites of the shape `state.pricing.select(&state.d,
    /// ...)` borrow disjoint fields of `state` instead of aliasing the whole
    /// struct against the mutable `pricing` field.
    pub fn select(
        &mut self,
        d: &[E],
        status: &[VariableStatus],
        ntot: usize,
        n: usize,
        opt_tol: E,
    ) -> Option<(usize, E)> {
        if let PricingKind::Partial = self.kind {
            if let Some(found) = self.scan_section(d, status, n, opt_tol) {
                self.cached_count = 1;
                return Some(found);
            }
        }
        let found = self.scan_all(d, status, ntot, opt_tol);
        self.cached_count = if found.is_some() { 1 } else { 0 };
        found
    }

    fn scan_all(&self, d: &[E], status: &[VariableStatus], ntot: usize, opt_tol: E) -> Option<(usize, E)> {
        let mut best: Option<(usize, E, E)> = None;
        for j in 0..ntot {
            if let Some(dir) = Self::attractive_direction(j, d, status, opt_tol) {
                let s = self.score(j, d);
                if best.map_or(true, |(_, _, bs)| s > bs) {
                    best = Some((j, dir, s));
                }
            }
        }
        best.map(|(j, dir, _)| (j, dir))
    }

    fn scan_section(
        &mut self,
        d: &[E],
        status: &[VariableStatus],
        n: usize,
        opt_tol: E,
    ) -> Option<(usize, E)> {
        let start = self.section * self.section_size;
        let end = (start + self.section_size).min(n);
        self.section = (self.section + 1) % self.n_sections.max(1);
        if start >= end {
            return None;
        }
        let mut best: Option<(usize, E, E)> = None;
        for j in start..end {
            if let Some(dir) = Self::attractive_direction(j, d, status, opt_tol) {
                let s = self.score(j, d);
                if best.map_or(true, |(_, _, bs)| s > bs) {
                    best = Some((j, dir, s));
                }
            }
        }
        best.map(|(j, dir, _)| (j, dir))
    }

    /// §4.C "State updates after a pivot": reduced-cost update, the
    /// Goldfarb-Reid steepest-edge recurrence (clamped at `>= 1`), and the
    /// entering/leaving weight swap from the Open Questions note (§9):
    /// `gamma_{b_old} = (1/alpha_r)^2 * ||FTRAN(e_r)||^2`, computed
    /// explicitly rather than left unspecified as the source does.
    /// Takes `basis`/`d`/`row_of`/`ntot`/`m` as separate borrows of the
    /// caller's state (rather than `&mut SimplexState`) for the same
    /// disjoint-field reason as `select`: the caller is always
    /// `state.pricing.update_after_pivot(&state.basis, &mut state.d, ...)`.
    #[allow(clippy::too_many_arguments)]
    pub fn update_after_pivot(
        &mut self,
        basis: &Basis,
        d: &mut [E],
        row_of: &[Option<usize>],
        ntot: usize,
        m: usize,
        a: &SparseMatrix,
        entering: usize,
        leaving_row: usize,
        leaving_var: usize,
        pivot: E,
    ) -> Result<(), Problem> {
        let beta = basis.btran(&unit(leaving_row, m))?;
        let alpha_row = a.sparse_xta(&beta);

        let d_enter = d[entering];
        for j in 0..ntot {
            if row_of[j].is_some() {
                continue;
            }
            d[j] -= (d_enter / pivot) * alpha_row[j];
        }
        d[entering] = 0.0;

        if matches!(self.kind, PricingKind::SteepestEdge | PricingKind::Devex) {
            let gamma_enter = self.weights[entering];
            let tau = gamma_enter / (pivot * pivot);
            // §9 Open Question: the leaving variable's weight is handwaved
            // in the source; computed explicitly here from `FTRAN(e_r)`
            // against the pre-pivot basis rather than left undefined.
            let ftran_er = basis.ftran(&unit(leaving_row, m))?;
            let ftran_er_norm_sq: E = ftran_er.iter().map(|v| v * v).sum::<E>() / (pivot * pivot);
            for j in 0..ntot {
                if row_of[j].is_some() {
                    continue;
                }
                let aj = alpha_row[j];
                if aj == 0.0 {
                    continue;
                }
                let (rows, vals) = a.column(j);
                let rho_j: E = rows.iter().zip(vals).map(|(&i, &v)| beta[i] * v).sum();
                let mut gamma = self.weights[j] - 2.0 * aj * rho_j + aj * aj * tau;
                if gamma <= WEIGHT_CLAMP_TOL {
                    gamma = SMALL_FLOOR;
                }
                self.weights[j] = gamma;
            }
            self.weights[leaving_var] = (ftran_er_norm_sq).max(SMALL_FLOOR);
        }

        self.cached_count = -1;
        Ok(())
    }
}

fn unit(r: usize, m: usize) -> Vec<E> {
    let mut e = vec![0.0; m];
    e[r] = 1.0;
    e
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_kind_from_option() {
        assert_eq!(PricingKind::from_option(0, 10), PricingKind::Dantzig);
        assert_eq!(PricingKind::from_option(0, 5000), PricingKind::Partial);
        assert_eq!(PricingKind::from_option(2, 10), PricingKind::SteepestEdge);
    }

    #[test]
    fn test_weight_clamp() {
        let engine = PricingEngine::new(PricingKind::SteepestEdge, 4, 4);
        assert!(engine.weights.iter().all(|&g| g >= 1.0));
    }
}
