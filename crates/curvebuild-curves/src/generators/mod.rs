//! Curve generators: parameter vectors to curves.
//!
//! A generator is the parameterization of one curve. Calibration uses it in
//! three steps:
//!
//! 1. [`CurveGenerator::final_generator`] fixes anything that depends on the
//!    calibration instruments, such as node times at instrument maturities.
//! 2. [`CurveGenerator::initial_guess`] maps instrument-level rate guesses
//!    into the generator's parameter space.
//! 3. [`CurveGenerator::build`] turns a trial parameter vector into a curve,
//!    many times per solve.
//!
//! Generators are immutable; `build` is a pure function of its input.

mod constant;
mod interpolated;

pub use constant::ConstantGenerator;
pub use interpolated::InterpolatedGenerator;

use std::fmt;
use std::sync::Arc;

use crate::error::CurveResult;
use crate::traits::Curve;

/// The parameterization of a curve.
pub trait CurveGenerator: Send + Sync + fmt::Debug {
    /// Number of parameters, once known.
    ///
    /// `None` for generators whose size is fixed by `final_generator`.
    fn parameter_count(&self) -> Option<usize>;

    /// Returns the generator adapted to the calibration instruments, given
    /// their pillar times in instrument order.
    fn final_generator(&self, node_times: &[f64]) -> CurveResult<Arc<dyn CurveGenerator>>;

    /// Maps raw rate guesses, one per instrument, into parameter space.
    fn initial_guess(&self, rates: &[f64]) -> CurveResult<Vec<f64>>;

    /// Builds the curve for a parameter vector.
    fn build(&self, parameters: &[f64]) -> CurveResult<Arc<dyn Curve>>;
}
