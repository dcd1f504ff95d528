//! Curves interpolated between node values.

use std::sync::Arc;

use curvebuild_math::interpolation::Interpolator;

use crate::error::{CurveError, CurveResult};
use crate::interpolation::InterpolationMethod;
use crate::traits::Curve;
use crate::value_type::CurveValueType;

/// A curve defined by values at node times.
///
/// The node values are the curve's parameters. Between nodes the configured
/// [`InterpolationMethod`] applies. Outside the nodes the curve is flat in
/// its stored value, except for discount factor curves which extrapolate at
/// the zero rate of the nearest node (`P(t) = P(t_a)^(t / t_a)`), so that
/// `P(0) = 1` holds before the first node.
///
/// A curve with a single node is flat.
#[derive(Clone)]
pub struct InterpolatedCurve {
    times: Vec<f64>,
    values: Vec<f64>,
    value_type: CurveValueType,
    method: InterpolationMethod,
    interpolator: Option<Arc<dyn Interpolator>>,
}

impl std::fmt::Debug for InterpolatedCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpolatedCurve")
            .field("times", &self.times)
            .field("values", &self.values)
            .field("value_type", &self.value_type)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

impl InterpolatedCurve {
    /// Creates a new interpolated curve.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no nodes, lengths differ, a time is
    /// negative or not strictly increasing, a value is non-finite, or a value
    /// is non-positive where the value type or interpolation needs positive
    /// values.
    pub fn new(
        times: Vec<f64>,
        values: Vec<f64>,
        value_type: CurveValueType,
        method: InterpolationMethod,
    ) -> CurveResult<Self> {
        if times.is_empty() {
            return Err(CurveError::insufficient_points(1, 0));
        }
        if times.len() != values.len() {
            return Err(CurveError::invalid_value(format!(
                "times ({}) and values ({}) must have same length",
                times.len(),
                values.len()
            )));
        }
        if let Some(t) = times.iter().find(|t| !t.is_finite() || **t < 0.0) {
            return Err(CurveError::invalid_value(format!(
                "node time {t} must be finite and non-negative"
            )));
        }
        for i in 1..times.len() {
            if times[i] <= times[i - 1] {
                return Err(CurveError::non_monotonic_times(i, times[i - 1], times[i]));
            }
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(CurveError::invalid_value(format!("node value {v} is not finite")));
        }
        let needs_positive = value_type.requires_positive() || method == InterpolationMethod::LogLinear;
        if needs_positive {
            if let Some(v) = values.iter().find(|v| **v <= 0.0) {
                return Err(CurveError::invalid_value(format!(
                    "{value_type} curve with {method} interpolation needs positive values, got {v}"
                )));
            }
        }
        if value_type == CurveValueType::DiscountFactor && times.len() == 1 && times[0] == 0.0 {
            return Err(CurveError::invalid_value(
                "single-node discount factor curve needs a positive node time",
            ));
        }

        let interpolator = if times.len() == 1 {
            None
        } else {
            if times.len() < method.minimum_points() {
                return Err(CurveError::insufficient_points(
                    method.minimum_points(),
                    times.len(),
                ));
            }
            Some(method.interpolator(times.clone(), values.clone())?)
        };

        Ok(Self {
            times,
            values,
            value_type,
            method,
            interpolator,
        })
    }

    /// Returns a curve with the same nodes and new values.
    pub fn with_values(&self, values: Vec<f64>) -> CurveResult<Self> {
        Self::new(self.times.clone(), values, self.value_type, self.method)
    }

    /// Node times.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Node values.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Interpolation method.
    #[must_use]
    pub fn method(&self) -> InterpolationMethod {
        self.method
    }

    /// Node used for extrapolation at `t`, if `t` is outside the nodes.
    fn extrapolation_anchor(&self, t: f64) -> Option<usize> {
        let last = self.times.len() - 1;
        if self.interpolator.is_none() || t < self.times[0] {
            Some(0)
        } else if t > self.times[last] {
            Some(last)
        } else {
            None
        }
    }

    /// Ratio `t / t_a` for zero-rate extrapolation of discount factors.
    fn anchor_exponent(&self, anchor: usize, t: f64) -> Option<f64> {
        let ta = self.times[anchor];
        (self.value_type == CurveValueType::DiscountFactor && ta > 0.0).then(|| t / ta)
    }
}

impl Curve for InterpolatedCurve {
    fn value_type(&self) -> CurveValueType {
        self.value_type
    }

    fn value(&self, t: f64) -> CurveResult<f64> {
        match (self.extrapolation_anchor(t), &self.interpolator) {
            (Some(a), _) => Ok(match self.anchor_exponent(a, t) {
                Some(exponent) => self.values[a].powf(exponent),
                None => self.values[a],
            }),
            (None, Some(interp)) => interp
                .interpolate(t)
                .map_err(|e| CurveError::interpolation_error(e.to_string())),
            (None, None) => Ok(self.values[0]),
        }
    }

    fn parameter_count(&self) -> usize {
        self.values.len()
    }

    fn value_sensitivity(&self, t: f64) -> CurveResult<Vec<f64>> {
        match (self.extrapolation_anchor(t), &self.interpolator) {
            (Some(a), _) => {
                let mut weights = vec![0.0; self.values.len()];
                weights[a] = match self.anchor_exponent(a, t) {
                    Some(exponent) => exponent * self.values[a].powf(exponent - 1.0),
                    None => 1.0,
                };
                Ok(weights)
            }
            (None, Some(interp)) => interp
                .node_weights(t)
                .map_err(|e| CurveError::interpolation_error(e.to_string())),
            (None, None) => Ok(vec![1.0]),
        }
    }
}
