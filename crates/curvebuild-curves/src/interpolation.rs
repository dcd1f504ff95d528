//! Interpolation methods for curve node values.

use std::sync::Arc;

use curvebuild_math::interpolation::{
    CubicSpline, Interpolator, LinearInterpolator, LogLinearInterpolator,
};
use serde::{Deserialize, Serialize};

use crate::error::{CurveError, CurveResult};

/// Interpolation applied to a curve's stored values (whatever their
/// [`CurveValueType`](crate::value_type::CurveValueType)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InterpolationMethod {
    /// Linear on the stored values.
    #[default]
    Linear,

    /// Linear on the logarithm of the stored values.
    LogLinear,

    /// Natural cubic spline on the stored values.
    CubicSpline,
}

impl InterpolationMethod {
    /// Minimum number of nodes the interpolator accepts.
    #[must_use]
    pub fn minimum_points(&self) -> usize {
        match self {
            Self::Linear | Self::LogLinear => 2,
            Self::CubicSpline => 3,
        }
    }

    /// Returns true if this method produces smooth curves.
    #[must_use]
    pub fn is_smooth(&self) -> bool {
        matches!(self, Self::CubicSpline)
    }

    /// Builds an interpolator over the nodes, extrapolation disabled.
    pub(crate) fn interpolator(
        &self,
        xs: Vec<f64>,
        ys: Vec<f64>,
    ) -> CurveResult<Arc<dyn Interpolator>> {
        let map = |e: curvebuild_math::MathError| CurveError::interpolation_error(e.to_string());
        Ok(match self {
            Self::Linear => Arc::new(LinearInterpolator::new(xs, ys).map_err(map)?),
            Self::LogLinear => Arc::new(LogLinearInterpolator::new(xs, ys).map_err(map)?),
            Self::CubicSpline => Arc::new(CubicSpline::new(xs, ys).map_err(map)?),
        })
    }
}

impl std::fmt::Display for InterpolationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Linear => "Linear",
            Self::LogLinear => "Log-Linear",
            Self::CubicSpline => "Cubic Spline",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_points() {
        assert_eq!(InterpolationMethod::Linear.minimum_points(), 2);
        assert_eq!(InterpolationMethod::CubicSpline.minimum_points(), 3);
    }

    #[test]
    fn test_interpolator_errors_are_mapped() {
        let result = InterpolationMethod::LogLinear.interpolator(vec![1.0, 2.0], vec![1.0, -1.0]);
        assert!(matches!(result, Err(CurveError::InterpolationError { .. })));
    }

    #[test]
    fn test_serde_roundtrip() {
        let json = serde_json::to_string(&InterpolationMethod::CubicSpline).unwrap();
        assert_eq!(json, "\"CubicSpline\"");
    }
}
