//! End-to-end solve benchmarks against real Netlib LP relaxation cases,
//! fetched and cached by `loaders::sif::netlib`.
//!
//! There is only one solver in this crate now, so unlike a benchmark
//! matrix that compares several solver backends against each other, this
//! just times `SimplexSolver::solve` case by case.

use copters::Solver as _;
use copters::interface::sif::TryFromSIF;
use copters::lp::LinearProgram;
use copters::{SolverHooks, SolverState};

fn solve_case(case_name: &str) -> Result<(), String> {
    let sif = loaders::sif::netlib::get_case(case_name).map_err(|e| e.to_string())?;
    let lp = LinearProgram::try_from_sif(&sif).map_err(|e| e.to_string())?;
    let (n, m) = lp.get_dims();

    let (mut solver, mut hooks) = LinearProgram::solver_builder(&lp).build();
    let mut state = SolverState::new(n, m);
    solver.solve(&mut state, &mut hooks).map_err(|e| e.to_string())?;
    Ok(())
}

macro_rules! netlib_benches {
    (@bench $case:ident = $name:literal) => {
        #[divan::bench]
        fn $case() -> Result<(), String> {
            solve_case($name)
        }
    };
    (@bench $case:ident) => {
        #[divan::bench]
        fn $case() -> Result<(), String> {
            solve_case(stringify!($case))
        }
    };
    ($($case:ident $(= $name:literal)?),* $(,)?) => {
        $(
            netlib_benches!(@bench $case $(= $name)?);
        )*
    };
}

// A modest cross-section of Netlib cases, from tiny (`afiro`) to the
// largest relaxations that are still practical to fetch and solve in a
// benchmark run. Add more as the solver's performance envelope grows.
netlib_benches!(
    afiro,
    adlittle,
    share2b,
    scagr7,
    sc105,
    sc50b,
    kb2,
    blend,
    bore3d,
    scsd1,
    sctap1,
    share1b,
    standata,
    lotfi,
    brandy,
    finnis,
    scagr25,
    bnl1,
    fit1d,
    ship08s,
    grow15,
    ganges,
    fv47_25 = "25fv47",
    d2q06c,
);
