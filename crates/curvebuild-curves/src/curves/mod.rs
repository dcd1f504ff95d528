//! Concrete curve implementations.
//!
//! - [`InterpolatedCurve`]: node times and values with an interpolation method
//! - [`FlatCurve`]: a single constant value

mod flat;
mod interpolated;

pub use flat::FlatCurve;
pub use interpolated::InterpolatedCurve;
