//! Generators for interpolated curves.

use std::sync::Arc;

use super::CurveGenerator;
use crate::curves::InterpolatedCurve;
use crate::error::{CurveError, CurveResult};
use crate::interpolation::InterpolationMethod;
use crate::traits::Curve;
use crate::value_type::CurveValueType;

/// Generator of [`InterpolatedCurve`]s whose parameters are the node values.
///
/// Without explicit node times, the final generator puts one node at each
/// calibration instrument's pillar time.
///
/// # Example
///
/// ```rust
/// use curvebuild_curves::generators::{CurveGenerator, InterpolatedGenerator};
/// use curvebuild_curves::interpolation::InterpolationMethod;
/// use curvebuild_curves::value_type::CurveValueType;
///
/// let generator = InterpolatedGenerator::new(CurveValueType::DiscountFactor, InterpolationMethod::LogLinear);
/// let concrete = generator.final_generator(&[1.0, 2.0]).unwrap();
/// let guess = concrete.initial_guess(&[0.02, 0.02]).unwrap();
/// assert!((guess[1] - (-0.04_f64).exp()).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedGenerator {
    value_type: CurveValueType,
    method: InterpolationMethod,
    node_times: Option<Vec<f64>>,
    base_level: Option<f64>,
}

impl InterpolatedGenerator {
    /// Creates a generator with nodes at the instruments' pillars.
    #[must_use]
    pub fn new(value_type: CurveValueType, method: InterpolationMethod) -> Self {
        Self {
            value_type,
            method,
            node_times: None,
            base_level: None,
        }
    }

    /// Fixes the node times regardless of the instruments.
    #[must_use]
    pub fn with_node_times(mut self, node_times: Vec<f64>) -> Self {
        self.node_times = Some(node_times);
        self
    }

    /// Sets the index level at t = 0 that rate guesses grow from on a
    /// price index curve.
    #[must_use]
    pub fn with_base_level(mut self, base_level: f64) -> Self {
        self.base_level = Some(base_level);
        self
    }

    /// Node times, if fixed.
    #[must_use]
    pub fn node_times(&self) -> Option<&[f64]> {
        self.node_times.as_deref()
    }

    /// Value type of the generated curves.
    #[must_use]
    pub fn value_type(&self) -> CurveValueType {
        self.value_type
    }

    fn nodes(&self) -> CurveResult<&[f64]> {
        self.node_times.as_deref().ok_or_else(|| {
            CurveError::invalid_value("interpolated generator has no node times; call final_generator")
        })
    }
}

impl CurveGenerator for InterpolatedGenerator {
    fn parameter_count(&self) -> Option<usize> {
        self.node_times.as_ref().map(Vec::len)
    }

    fn final_generator(&self, node_times: &[f64]) -> CurveResult<Arc<dyn CurveGenerator>> {
        if self.node_times.is_some() {
            return Ok(Arc::new(self.clone()));
        }
        Ok(Arc::new(self.clone().with_node_times(node_times.to_vec())))
    }

    fn initial_guess(&self, rates: &[f64]) -> CurveResult<Vec<f64>> {
        let nodes = self.nodes()?;
        if rates.len() != nodes.len() {
            return Err(CurveError::invalid_value(format!(
                "{} rate guesses for {} nodes",
                rates.len(),
                nodes.len()
            )));
        }
        rates
            .iter()
            .zip(nodes)
            .map(|(r, t)| {
                self.value_type.from_rate(*r, *t, self.base_level).ok_or_else(|| {
                    CurveError::invalid_value(
                        "rate guesses on a price index curve need a base level",
                    )
                })
            })
            .collect()
    }

    fn build(&self, parameters: &[f64]) -> CurveResult<Arc<dyn Curve>> {
        let curve = InterpolatedCurve::new(
            self.nodes()?.to_vec(),
            parameters.to_vec(),
            self.value_type,
            self.method,
        )?;
        Ok(Arc::new(curve))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_nodes_from_instruments() {
        let generator = InterpolatedGenerator::new(CurveValueType::ZeroRate, InterpolationMethod::Linear);
        assert_eq!(generator.parameter_count(), None);
        assert!(generator.build(&[0.01, 0.02]).is_err());

        let concrete = generator.final_generator(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(concrete.parameter_count(), Some(3));

        let curve = concrete.build(&[0.01, 0.02, 0.03]).unwrap();
        assert_relative_eq!(curve.zero_rate(2.5).unwrap(), 0.025, epsilon = 1e-12);
    }

    #[test]
    fn test_fixed_nodes_survive_final_generator() {
        let generator = InterpolatedGenerator::new(CurveValueType::ZeroRate, InterpolationMethod::Linear)
            .with_node_times(vec![0.5, 5.0]);
        let concrete = generator.final_generator(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(concrete.parameter_count(), Some(2));
    }

    #[test]
    fn test_build_is_deterministic() {
        let generator = InterpolatedGenerator::new(CurveValueType::DiscountFactor, InterpolationMethod::LogLinear)
            .with_node_times(vec![1.0, 2.0]);
        let a = generator.build(&[0.98, 0.95]).unwrap();
        let b = generator.build(&[0.98, 0.95]).unwrap();
        assert_eq!(
            a.discount_factor(1.3).unwrap().to_bits(),
            b.discount_factor(1.3).unwrap().to_bits()
        );
    }

    #[test]
    fn test_guess_length_checked() {
        let generator = InterpolatedGenerator::new(CurveValueType::ZeroRate, InterpolationMethod::Linear)
            .with_node_times(vec![1.0, 2.0]);
        assert!(generator.initial_guess(&[0.01]).is_err());
    }

    #[test]
    fn test_price_index_guess_grows_from_base_level() {
        let generator = InterpolatedGenerator::new(CurveValueType::PriceIndex, InterpolationMethod::Linear)
            .with_node_times(vec![1.0, 5.0]);
        assert!(generator.initial_guess(&[0.02, 0.02]).is_err());

        let guess = generator
            .with_base_level(300.0)
            .initial_guess(&[0.02, 0.03])
            .unwrap();
        assert_relative_eq!(guess[0], 306.0, epsilon = 1e-12);
        assert_relative_eq!(guess[1], 300.0 * 1.03_f64.powi(5), epsilon = 1e-9);
    }

    #[test]
    fn test_negative_node_rejected_at_build() {
        let generator = InterpolatedGenerator::new(CurveValueType::ZeroRate, InterpolationMethod::Linear)
            .with_node_times(vec![-1.0, 2.0]);
        assert!(generator.build(&[0.01, 0.02]).is_err());
    }
}
