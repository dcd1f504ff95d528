//! Lookup keys for curves in a provider.
//!
//! Instruments never name curves directly. They reference a currency (for
//! discounting), a rate index (for projection) or a price index, and the
//! [`CurveProvider`](crate::provider::CurveProvider) resolves each key to a
//! curve name.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new key.
            #[must_use]
            pub fn new(code: impl Into<String>) -> Self {
                Self(code.into())
            }

            /// Returns the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_key!(
    /// Currency code, e.g. `USD`.
    Currency
);

string_key!(
    /// Interest rate index, e.g. `USD-LIBOR-3M` or `USD-SOFR`.
    RateIndex
);

string_key!(
    /// Price index, e.g. `US-CPI-U`.
    PriceIndex
);

/// The role a calibrated curve plays in the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurveRole {
    /// Discounting for all cash flows in a currency.
    Discounting(Currency),
    /// Forward projection of a rate index.
    Forward(RateIndex),
    /// Projection of a price index level.
    PriceIndex(PriceIndex),
}

impl fmt::Display for CurveRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discounting(ccy) => write!(f, "discounting {ccy}"),
            Self::Forward(index) => write!(f, "forward {index}"),
            Self::PriceIndex(index) => write!(f, "price index {index}"),
        }
    }
}
