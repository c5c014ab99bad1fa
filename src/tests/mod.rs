#[cfg(feature = "sif")]
pub mod netlib;
