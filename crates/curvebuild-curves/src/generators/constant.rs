//! Generator for flat curves.

use std::sync::Arc;

use super::CurveGenerator;
use crate::curves::FlatCurve;
use crate::error::{CurveError, CurveResult};
use crate::traits::Curve;
use crate::value_type::CurveValueType;

/// Generator of one-parameter [`FlatCurve`]s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantGenerator {
    value_type: CurveValueType,
}

impl ConstantGenerator {
    /// Creates a flat zero rate or price index generator.
    #[must_use]
    pub fn new(value_type: CurveValueType) -> Self {
        Self { value_type }
    }
}

impl CurveGenerator for ConstantGenerator {
    fn parameter_count(&self) -> Option<usize> {
        Some(1)
    }

    fn final_generator(&self, _node_times: &[f64]) -> CurveResult<Arc<dyn CurveGenerator>> {
        Ok(Arc::new(*self))
    }

    fn initial_guess(&self, rates: &[f64]) -> CurveResult<Vec<f64>> {
        match rates {
            [rate] if self.value_type == CurveValueType::ZeroRate => Ok(vec![*rate]),
            [_] => Err(CurveError::invalid_value(format!(
                "rate guesses do not map onto a flat {} curve",
                self.value_type
            ))),
            _ => Err(CurveError::invalid_value(format!(
                "constant generator takes one guess, got {}",
                rates.len()
            ))),
        }
    }

    fn build(&self, parameters: &[f64]) -> CurveResult<Arc<dyn Curve>> {
        match parameters {
            [value] => Ok(Arc::new(FlatCurve::new(*value, self.value_type)?)),
            _ => Err(CurveError::invalid_value(format!(
                "constant generator takes one parameter, got {}",
                parameters.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_generator() {
        let generator = ConstantGenerator::new(CurveValueType::ZeroRate);
        let curve = generator.build(&[0.02]).unwrap();
        assert_eq!(curve.zero_rate(10.0).unwrap(), 0.02);
        assert!(generator.build(&[0.02, 0.03]).is_err());
        assert!(generator.initial_guess(&[]).is_err());
        assert_eq!(generator.initial_guess(&[0.02]).unwrap(), vec![0.02]);
    }

    #[test]
    fn test_flat_index_takes_parameter_guesses_only() {
        let generator = ConstantGenerator::new(CurveValueType::PriceIndex);
        assert!(generator.initial_guess(&[0.02]).is_err());
        assert_eq!(generator.build(&[300.0]).unwrap().index_level(5.0).unwrap(), 300.0);
    }
}
