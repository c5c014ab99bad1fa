use macros::build_option_enum;

use crate::{SolverOptions, SolverState};

/// Hook invoked once per solver iteration for logging, monitoring, or early stopping.
pub trait Callback {
    /// Creates a new callback from solver options.
    fn new(options: &SolverOptions) -> Self
    where
        Self: Sized;

    /// Called once before the first iteration.
    fn init(&mut self, _state: &SolverState) {}

    /// Called at the end of each iteration with the current solver state.
    fn call(&mut self, state: &SolverState);

    /// Called at most once per phase transition (entering phase 1, entering
    /// phase 2, and once more when the solve finishes), identified by
    /// `phase` (`"phase1"`, `"phase2"`, `"done"`). Most callbacks have
    /// nothing extra to do here beyond what `call` already reports.
    fn phase_boundary(&mut self, _phase: &str, _state: &SolverState) {}
}

/// A callback that does nothing. Use when no per-iteration output is needed.
pub struct NoOpCallback {}

impl Callback for NoOpCallback {
    fn new(_options: &SolverOptions) -> Self {
        Self {}
    }

    fn call(&mut self, _state: &SolverState) {
        // Do nothing
    }
}

/// Prints the objective value and feasibility residuals each iteration.
pub struct ConvergenceOutput {}

impl Callback for ConvergenceOutput {
    fn new(_options: &SolverOptions) -> Self {
        Self {}
    }

    fn call(&mut self, state: &SolverState) {
        let txt = format!(
            "| {:4}: | {:<14.6e} | {:<8.2e} | {:<8.2e} |",
            state.get_iteration(),
            state.get_objective(),
            state.get_primal_infeasibility(),
            state.get_dual_infeasibility(),
        );
        println!("{}", txt);
    }
}

/// Logs phase transitions (feasibility search vs. optimization) without
/// printing per-iteration noise, for callers who only care about the
/// coarse-grained solve structure.
pub struct PhaseBoundaryCallback {}

impl Callback for PhaseBoundaryCallback {
    fn new(_options: &SolverOptions) -> Self {
        Self {}
    }

    fn call(&mut self, _state: &SolverState) {
        // Per-iteration output is intentionally left to `ConvergenceOutput`.
    }

    fn phase_boundary(&mut self, phase: &str, state: &SolverState) {
        println!(
            "-- entering {phase} at iteration {} (obj={:.6e}) --",
            state.get_iteration(),
            state.get_objective()
        );
    }
}

build_option_enum!(
    trait_ = Callback,
    name = "Callbacks",
    variants = (NoOpCallback, ConvergenceOutput, PhaseBoundaryCallback),
    new_arguments = (&SolverOptions,),
    doc_header = "An enum representing different callbacks for the optimization solver. Each variant corresponds to a specific callback strategy."
);
