//! Thin re-export crate: `options` carries the proc macros that back this
//! crate's option registry (`explicit_options`, `use_option`,
//! `build_options!`, `build_option_enum!`); everything else in the crate
//! reaches them through `macros::...` rather than depending on `options`
//! directly, matching how `src/lib.rs` and `src/lp/simplex/options.rs`
//! already refer to them.

pub use options::*;
