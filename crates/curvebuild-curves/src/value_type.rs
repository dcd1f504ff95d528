//! What a curve's values represent.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Describes what the stored node values of a curve represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurveValueType {
    /// Continuously compounded zero rate: P(t) = exp(-r(t) t).
    #[default]
    ZeroRate,
    /// Discount factor P(t), positive with P(0) = 1.
    DiscountFactor,
    /// Price index level I(t), e.g. a CPI projection.
    PriceIndex,
}

impl CurveValueType {
    /// Maps a raw market rate guess at time `t` into this value space.
    ///
    /// Zero rates pass through and discount factors become `exp(-r t)`.
    /// Price index levels grow from `base_level` at the annual rate,
    /// `I0 (1 + r)^t`; without a base level there is no mapping.
    #[must_use]
    pub fn from_rate(&self, rate: f64, t: f64, base_level: Option<f64>) -> Option<f64> {
        match self {
            Self::ZeroRate => Some(rate),
            Self::DiscountFactor => Some((-rate * t).exp()),
            Self::PriceIndex => base_level.map(|base| base * (1.0 + rate).powf(t)),
        }
    }

    /// Returns true if values of this type must be strictly positive.
    #[must_use]
    pub fn requires_positive(&self) -> bool {
        matches!(self, Self::DiscountFactor | Self::PriceIndex)
    }
}

impl fmt::Display for CurveValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroRate => write!(f, "ZeroRate"),
            Self::DiscountFactor => write!(f, "DiscountFactor"),
            Self::PriceIndex => write!(f, "PriceIndex"),
        }
    }
}
