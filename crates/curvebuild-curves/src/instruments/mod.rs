//! Reference calibration instruments.
//!
//! [`RateInstrument`] is a tagged enum of the usual curve-building
//! instruments, expressed in year fractions from the valuation date. Each
//! variant names the roles it reads (a currency for discounting, a rate or
//! price index for projection); [`RateInstrumentCalculator`] resolves those
//! through the provider and prices the variant with a single `match`.
//!
//! # Available Instruments
//!
//! - [`RateInstrument::Deposit`]: simple-rate deposit on the discount curve
//! - [`RateInstrument::Fra`]: forward rate agreement on an index curve
//! - [`RateInstrument::OvernightSwap`]: fixed vs compounded overnight index
//! - [`RateInstrument::IborSwap`]: fixed vs term index
//! - [`RateInstrument::ZeroCouponInflationSwap`]: fixed growth vs price index

mod calculator;

pub use calculator::RateInstrumentCalculator;

use serde::{Deserialize, Serialize};

use crate::error::{CurveError, CurveResult};
use crate::keys::{Currency, PriceIndex, RateIndex};

/// A curve calibration instrument with its market quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RateInstrument {
    /// Deposit from `start` to `end` at a simple `rate`.
    Deposit {
        /// Discounting currency.
        currency: Currency,
        /// Start time in years.
        start: f64,
        /// End time in years.
        end: f64,
        /// Quoted simple rate.
        rate: f64,
    },

    /// Forward rate agreement on `index` over `[start, end]`, paid at `end`.
    Fra {
        /// Discounting currency.
        currency: Currency,
        /// Projected index.
        index: RateIndex,
        /// Accrual start in years.
        start: f64,
        /// Accrual end in years.
        end: f64,
        /// Quoted FRA rate.
        rate: f64,
    },

    /// Fixed leg against compounded overnight `index`, both on the fixed schedule.
    OvernightSwap {
        /// Discounting currency.
        currency: Currency,
        /// Overnight index.
        index: RateIndex,
        /// Start time in years.
        start: f64,
        /// End time in years.
        end: f64,
        /// Fixed payments per year.
        fixed_frequency: u32,
        /// Quoted fixed rate.
        rate: f64,
    },

    /// Fixed leg against term `index`.
    IborSwap {
        /// Discounting currency.
        currency: Currency,
        /// Term index of the floating leg.
        index: RateIndex,
        /// Start time in years.
        start: f64,
        /// End time in years.
        end: f64,
        /// Fixed payments per year.
        fixed_frequency: u32,
        /// Floating payments per year.
        float_frequency: u32,
        /// Quoted fixed rate.
        rate: f64,
    },

    /// Zero-coupon inflation swap: `(1 + rate)^T` against `I(T) / base_index`.
    ZeroCouponInflationSwap {
        /// Discounting currency.
        currency: Currency,
        /// Price index.
        index: PriceIndex,
        /// Maturity in years.
        maturity: f64,
        /// Index level at inception.
        base_index: f64,
        /// Quoted annual breakeven rate.
        rate: f64,
    },
}

impl RateInstrument {
    /// Creates a deposit.
    #[must_use]
    pub fn deposit(currency: Currency, start: f64, end: f64, rate: f64) -> Self {
        Self::Deposit {
            currency,
            start,
            end,
            rate,
        }
    }

    /// Creates an FRA.
    #[must_use]
    pub fn fra(currency: Currency, index: RateIndex, start: f64, end: f64, rate: f64) -> Self {
        Self::Fra {
            currency,
            index,
            start,
            end,
            rate,
        }
    }

    /// Creates an overnight index swap.
    #[must_use]
    pub fn overnight_swap(
        currency: Currency,
        index: RateIndex,
        start: f64,
        end: f64,
        fixed_frequency: u32,
        rate: f64,
    ) -> Self {
        Self::OvernightSwap {
            currency,
            index,
            start,
            end,
            fixed_frequency,
            rate,
        }
    }

    /// Creates a fixed vs term index swap.
    #[must_use]
    pub fn ibor_swap(
        currency: Currency,
        index: RateIndex,
        start: f64,
        end: f64,
        fixed_frequency: u32,
        float_frequency: u32,
        rate: f64,
    ) -> Self {
        Self::IborSwap {
            currency,
            index,
            start,
            end,
            fixed_frequency,
            float_frequency,
            rate,
        }
    }

    /// Creates a zero-coupon inflation swap.
    #[must_use]
    pub fn zero_coupon_inflation_swap(
        currency: Currency,
        index: PriceIndex,
        maturity: f64,
        base_index: f64,
        rate: f64,
    ) -> Self {
        Self::ZeroCouponInflationSwap {
            currency,
            index,
            maturity,
            base_index,
            rate,
        }
    }

    /// The market quote.
    #[must_use]
    pub fn quote(&self) -> f64 {
        match self {
            Self::Deposit { rate, .. }
            | Self::Fra { rate, .. }
            | Self::OvernightSwap { rate, .. }
            | Self::IborSwap { rate, .. }
            | Self::ZeroCouponInflationSwap { rate, .. } => *rate,
        }
    }

    /// Returns the instrument with a different market quote.
    #[must_use]
    pub fn with_quote(&self, quote: f64) -> Self {
        let mut bumped = self.clone();
        match &mut bumped {
            Self::Deposit { rate, .. }
            | Self::Fra { rate, .. }
            | Self::OvernightSwap { rate, .. }
            | Self::IborSwap { rate, .. }
            | Self::ZeroCouponInflationSwap { rate, .. } => *rate = quote,
        }
        bumped
    }

    /// Last time at which the instrument reads a curve.
    #[must_use]
    pub fn maturity(&self) -> f64 {
        match self {
            Self::Deposit { end, .. }
            | Self::Fra { end, .. }
            | Self::OvernightSwap { end, .. }
            | Self::IborSwap { end, .. } => *end,
            Self::ZeroCouponInflationSwap { maturity, .. } => *maturity,
        }
    }

    /// Short description, e.g. `IRS USD-LIBOR-3M 0.00-5.00 @ 4.5000%`.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Deposit {
                currency,
                start,
                end,
                rate,
            } => format!("DEP {currency} {start:.2}-{end:.2} @ {:.4}%", rate * 100.0),
            Self::Fra {
                index,
                start,
                end,
                rate,
                ..
            } => format!("FRA {index} {start:.2}-{end:.2} @ {:.4}%", rate * 100.0),
            Self::OvernightSwap {
                index,
                start,
                end,
                rate,
                ..
            } => format!("OIS {index} {start:.2}-{end:.2} @ {:.4}%", rate * 100.0),
            Self::IborSwap {
                index,
                start,
                end,
                rate,
                ..
            } => format!("IRS {index} {start:.2}-{end:.2} @ {:.4}%", rate * 100.0),
            Self::ZeroCouponInflationSwap {
                index,
                maturity,
                rate,
                ..
            } => format!("ZCIS {index} {maturity:.2} @ {:.4}%", rate * 100.0),
        }
    }

    /// Checks times, frequencies and the base index.
    pub fn validate(&self) -> CurveResult<()> {
        let check_period = |start: f64, end: f64| {
            if !(start.is_finite() && end.is_finite()) || start < 0.0 || end <= start {
                return Err(CurveError::invalid_instrument(format!(
                    "{}: period [{start}, {end}] must satisfy 0 <= start < end",
                    self.label()
                )));
            }
            Ok(())
        };
        let check_frequency = |frequency: u32| {
            if frequency == 0 {
                return Err(CurveError::invalid_instrument(format!(
                    "{}: payment frequency must be positive",
                    self.label()
                )));
            }
            Ok(())
        };

        if !self.quote().is_finite() {
            return Err(CurveError::invalid_instrument(format!(
                "{}: quote is not finite",
                self.label()
            )));
        }

        match self {
            Self::Deposit { start, end, .. } | Self::Fra { start, end, .. } => {
                check_period(*start, *end)
            }
            Self::OvernightSwap {
                start,
                end,
                fixed_frequency,
                ..
            } => {
                check_period(*start, *end)?;
                check_frequency(*fixed_frequency)
            }
            Self::IborSwap {
                start,
                end,
                fixed_frequency,
                float_frequency,
                ..
            } => {
                check_period(*start, *end)?;
                check_frequency(*fixed_frequency)?;
                check_frequency(*float_frequency)
            }
            Self::ZeroCouponInflationSwap {
                maturity,
                base_index,
                ..
            } => {
                check_period(0.0, *maturity)?;
                if *base_index <= 0.0 || !base_index.is_finite() {
                    return Err(CurveError::invalid_instrument(format!(
                        "{}: base index must be positive",
                        self.label()
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Equal accrual periods covering `[start, end]` at `frequency` per year.
pub(crate) fn schedule(start: f64, end: f64, frequency: u32) -> Vec<(f64, f64)> {
    let count = (((end - start) * f64::from(frequency)).round() as usize).max(1);
    let tau = (end - start) / count as f64;
    (0..count)
        .map(|i| {
            let s = start + tau * i as f64;
            let e = if i + 1 == count { end } else { s + tau };
            (s, e)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_schedule() {
        let periods = schedule(0.0, 2.0, 2);
        assert_eq!(periods.len(), 4);
        assert_relative_eq!(periods[1].0, 0.5);
        assert_relative_eq!(periods[3].1, 2.0);

        // Short instruments get a single period.
        assert_eq!(schedule(0.0, 0.25, 1).len(), 1);
    }

    #[test]
    fn test_quote_and_maturity() {
        let swap = RateInstrument::ibor_swap(
            Currency::new("USD"),
            RateIndex::new("USD-LIBOR-3M"),
            0.0,
            5.0,
            1,
            4,
            0.045,
        );
        assert_relative_eq!(swap.quote(), 0.045);
        assert_relative_eq!(swap.maturity(), 5.0);
        assert_relative_eq!(swap.with_quote(0.05).quote(), 0.05);
        assert!(swap.label().starts_with("IRS USD-LIBOR-3M"));
    }

    #[test]
    fn test_validation() {
        let usd = Currency::new("USD");
        assert!(RateInstrument::deposit(usd.clone(), 0.0, 1.0, 0.02).validate().is_ok());
        assert!(RateInstrument::deposit(usd.clone(), 1.0, 1.0, 0.02).validate().is_err());
        assert!(RateInstrument::overnight_swap(usd.clone(), RateIndex::new("FF"), 0.0, 1.0, 0, 0.02)
            .validate()
            .is_err());
        assert!(RateInstrument::zero_coupon_inflation_swap(
            usd,
            PriceIndex::new("CPI"),
            5.0,
            0.0,
            0.02
        )
        .validate()
        .is_err());
    }
}
