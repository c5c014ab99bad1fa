pub mod lu;
pub mod solver;

#[cfg(feature = "pardiso")]
pub mod pardiso;
