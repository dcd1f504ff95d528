//! Interpolation methods for curve construction.
//!
//! # Available Methods
//!
//! - [`LinearInterpolator`]: Piecewise linear, typically on zero rates
//! - [`LogLinearInterpolator`]: Linear on the logarithm, typically on discount
//!   factors or index levels (piecewise constant forwards)
//! - [`CubicSpline`]: Natural cubic spline, C2 smooth
//!
//! Every interpolator is linear or log-linear in its node values, so besides
//! the value and slope it can report [`Interpolator::node_weights`]: the
//! partial derivatives of the interpolated value with respect to each node
//! value. Curve sensitivities to their parameters are built from these.

mod cubic_spline;
mod linear;
mod log_linear;

pub use cubic_spline::CubicSpline;
pub use linear::LinearInterpolator;
pub use log_linear::LogLinearInterpolator;

use crate::error::{MathError, MathResult};

/// Trait for interpolation methods.
pub trait Interpolator: Send + Sync {
    /// Returns the interpolated value at x.
    fn interpolate(&self, x: f64) -> MathResult<f64>;

    /// Returns the first derivative at x.
    fn derivative(&self, x: f64) -> MathResult<f64>;

    /// Returns the partial derivatives of the interpolated value at x with
    /// respect to each node value, in node order.
    fn node_weights(&self, x: f64) -> MathResult<Vec<f64>>;

    /// Returns true if extrapolation is allowed.
    fn allows_extrapolation(&self) -> bool {
        false
    }

    /// Returns the minimum x value in the data.
    fn min_x(&self) -> f64;

    /// Returns the maximum x value in the data.
    fn max_x(&self) -> f64;

    /// Checks if x is within the interpolation range.
    fn in_range(&self, x: f64) -> bool {
        x >= self.min_x() && x <= self.max_x()
    }
}

/// Checks the node layout shared by every interpolator.
pub(crate) fn validate_nodes(xs: &[f64], ys: &[f64], required: usize) -> MathResult<()> {
    if xs.len() < required {
        return Err(MathError::insufficient_data(required, xs.len()));
    }
    if xs.len() != ys.len() {
        return Err(MathError::invalid_input(format!(
            "xs and ys must have same length: {} vs {}",
            xs.len(),
            ys.len()
        )));
    }
    if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
        return Err(MathError::non_finite("interpolation nodes"));
    }
    if xs.windows(2).any(|w| w[1] <= w[0]) {
        return Err(MathError::invalid_input(
            "x values must be strictly increasing",
        ));
    }
    Ok(())
}

/// Finds the index i such that xs[i] <= x < xs[i+1], clamped to the end segments.
pub(crate) fn find_segment(xs: &[f64], x: f64) -> usize {
    match xs.binary_search_by(|probe| probe.partial_cmp(&x).unwrap_or(std::cmp::Ordering::Equal))
    {
        Ok(i) => i.min(xs.len() - 2),
        Err(i) => (i.saturating_sub(1)).min(xs.len() - 2),
    }
}

pub(crate) fn check_range(xs: &[f64], x: f64, allow_extrapolation: bool) -> MathResult<()> {
    let (min, max) = (xs[0], xs[xs.len() - 1]);
    if !allow_extrapolation && (x < min || x > max) {
        return Err(MathError::ExtrapolationNotAllowed { x, min, max });
    }
    Ok(())
}
