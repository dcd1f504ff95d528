//! Flat curves.

use crate::error::{CurveError, CurveResult};
use crate::traits::Curve;
use crate::value_type::CurveValueType;

/// A curve with one constant value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatCurve {
    value: f64,
    value_type: CurveValueType,
}

impl FlatCurve {
    /// Creates a flat zero rate or price index curve.
    ///
    /// # Errors
    ///
    /// Returns an error for discount factor curves (a constant discount
    /// factor violates `P(0) = 1`), non-finite values, and non-positive
    /// index levels.
    pub fn new(value: f64, value_type: CurveValueType) -> CurveResult<Self> {
        if value_type == CurveValueType::DiscountFactor {
            return Err(CurveError::invalid_value(
                "a flat curve cannot hold a discount factor; use a flat zero rate",
            ));
        }
        if !value.is_finite() || (value_type.requires_positive() && value <= 0.0) {
            return Err(CurveError::invalid_value(format!(
                "invalid flat {value_type} value {value}"
            )));
        }
        Ok(Self { value, value_type })
    }
}

impl Curve for FlatCurve {
    fn value_type(&self) -> CurveValueType {
        self.value_type
    }

    fn value(&self, _t: f64) -> CurveResult<f64> {
        Ok(self.value)
    }

    fn parameter_count(&self) -> usize {
        1
    }

    fn value_sensitivity(&self, _t: f64) -> CurveResult<Vec<f64>> {
        Ok(vec![1.0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_zero_curve() {
        let curve = FlatCurve::new(0.03, CurveValueType::ZeroRate).unwrap();
        assert_relative_eq!(curve.discount_factor(2.0).unwrap(), (-0.06_f64).exp());
        assert_relative_eq!(
            curve.discount_factor_sensitivity(2.0).unwrap()[0],
            -2.0 * (-0.06_f64).exp()
        );
    }

    #[test]
    fn test_flat_rejects_discount_factor() {
        assert!(FlatCurve::new(0.97, CurveValueType::DiscountFactor).is_err());
        assert!(FlatCurve::new(-1.0, CurveValueType::PriceIndex).is_err());
    }
}
