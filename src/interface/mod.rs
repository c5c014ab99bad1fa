//! Model-builder collaborators that produce a [`crate::lp::LinearProgram`]
//! from an external file format. No on-disk format or wire protocol is part
//! of the solver core itself; these are thin, optional adapters gated by
//! their own Cargo features.

#[cfg(feature = "sif")]
pub mod sif;
