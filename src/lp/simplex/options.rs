//! §6's tunable-parameter table, registered into the crate-wide option
//! registry via `macros::options`, the same pattern every other solver in
//! this crate uses for its own knobs.

use macros::{explicit_options, use_option};

use crate::E;

#[explicit_options]
#[use_option(name = "feas_tol", type_ = f64, default = "1e-6", description = "Primal feasibility tolerance")]
#[use_option(name = "opt_tol", type_ = f64, default = "1e-6", description = "Dual / reduced-cost tolerance")]
#[use_option(name = "pivot_floor", type_ = f64, default = "1e-10", description = "Minimum acceptable |pivot element|")]
#[use_option(name = "infinity", type_ = f64, default = "1e100", description = "Sentinel bound magnitude")]
#[use_option(name = "max_iter", type_ = usize, default = "100000", description = "Simplex iteration cap; overridden at init_state by 2*(n+m)*100 unless set explicitly")]
#[use_option(name = "time_limit", type_ = f64, default = "inf", description = "Wall-time cap in seconds")]
#[use_option(name = "pricing", type_ = u8, default = "0", description = "0=auto, 1=partial, 2=steepest-edge, 3=devex")]
#[use_option(name = "max_eta_updates", type_ = usize, default = "100", description = "Eta-file length before a forced refactor")]
#[use_option(name = "refine_iters", type_ = usize, default = "2", description = "Iterative-refinement pass limit")]
#[use_option(name = "seed", type_ = i64, default = "-1", description = "Perturbation/random seed (-1 = auto)")]
#[use_option(name = "verbose", type_ = u8, default = "1", description = "Log level (0 silent, 1 normal, 2 debug)")]
pub struct SimplexOptions {}

impl SimplexOptions {
    pub fn new(options: &crate::SolverOptions) -> Self {
        Self { options: options.into() }
    }

    pub fn feas_tol(&self) -> E {
        self.options.feas_tol
    }

    pub fn opt_tol(&self) -> E {
        self.options.opt_tol
    }

    pub fn pivot_floor(&self) -> E {
        self.options.pivot_floor
    }

    pub fn infinity(&self) -> E {
        self.options.infinity
    }

    /// Raw registry value. Use `resolve_max_iter` at `init_state` to apply
    /// the §6 size-dependent default when the caller never set this
    /// explicitly (the registry can only carry a static literal default).
    pub fn max_iter(&self) -> usize {
        self.options.max_iter
    }

    pub fn time_limit(&self) -> f64 {
        self.options.time_limit
    }

    pub fn pricing(&self) -> u8 {
        self.options.pricing
    }

    pub fn max_eta_updates(&self) -> usize {
        self.options.max_eta_updates
    }

    pub fn refine_iters(&self) -> usize {
        self.options.refine_iters
    }

    pub fn seed(&self) -> i64 {
        self.options.seed
    }

    pub fn verbose(&self) -> u8 {
        self.options.verbose
    }

    /// §10.3: `max_iter`'s registry default (100_000) is a placeholder; the
    /// real default is `2*(n+m)*100`. The orchestrator calls this once
    /// during `init_state`, passing `explicit` only if the caller actually
    /// overrode `max_iter` via `crate::SolverOptions::set_option`.
    pub fn resolve_max_iter(&self, n: usize, m: usize, explicit: Option<usize>) -> usize {
        explicit.unwrap_or(2 * (n + m) * 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = crate::SolverOptions::new();
        let opts = SimplexOptions::new(&registry);
        assert_eq!(opts.feas_tol(), 1e-6);
        assert_eq!(opts.opt_tol(), 1e-6);
        assert_eq!(opts.pivot_floor(), 1e-10);
        assert_eq!(opts.max_eta_updates(), 100);
        assert_eq!(opts.refine_iters(), 2);
        assert_eq!(opts.seed(), -1);
        assert_eq!(opts.resolve_max_iter(10, 5, None), 2 * 15 * 100);
        assert_eq!(opts.resolve_max_iter(10, 5, Some(42)), 42);
    }
}
