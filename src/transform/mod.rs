//! Structural passes applied to a freshly ingested tree.
//!
//! Passes run in a fixed order: [`splice::resolve_splices`] copies shared
//! fragments into place, then [`qualify::qualify`] rewrites relative
//! references so the evaluator can resolve them from the root.

pub mod qualify;
pub mod splice;

pub use qualify::{qualify, qualify_text};
pub use splice::{SpliceResult, resolve_splices};
