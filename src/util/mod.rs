//! Utility types and functions for meshtrace.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - [`Bounds`], [`Transform`] and math type re-exports from glam

mod error;
mod math;

pub use error::*;
pub use math::*;
