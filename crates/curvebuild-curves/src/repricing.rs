//! Repricing validation of calibrated curves.
//!
//! After calibration every instrument of every block is repriced against the
//! final provider. A calibrated set that cannot reprice its own inputs
//! within tolerance is wrong, whatever the solver reported.
//!
//! ```text
//! error = |par spread|     passed = error <= tolerance
//! ```

use std::fmt;

use crate::calculator::ParSpreadCalculator;
use crate::calibration::CalibrationBlock;
use crate::error::CurveResult;
use crate::provider::CurveProvider;

/// Result of repricing one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct RepricingCheck {
    /// Instrument description.
    pub instrument_id: String,

    /// Curve the instrument calibrates.
    pub curve: String,

    /// Par spread against the calibrated curves.
    pub par_spread: f64,

    /// Absolute error, `|par_spread|`.
    pub error: f64,

    /// Tolerance applied.
    pub tolerance: f64,

    /// Whether the instrument passed.
    pub passed: bool,
}

impl RepricingCheck {
    /// Creates a check from a par spread.
    #[must_use]
    pub fn new(
        instrument_id: impl Into<String>,
        curve: impl Into<String>,
        par_spread: f64,
        tolerance: f64,
    ) -> Self {
        let error = par_spread.abs();
        Self {
            instrument_id: instrument_id.into(),
            curve: curve.into(),
            par_spread,
            error,
            tolerance,
            passed: error <= tolerance,
        }
    }
}

impl fmt::Display for RepricingCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.passed { "✓" } else { "✗" };
        write!(
            f,
            "{} [{}] {} | Spread: {:.2e} (tol: {:.2e})",
            status, self.curve, self.instrument_id, self.par_spread, self.tolerance
        )
    }
}

/// Repricing checks of every calibration instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct RepricingReport {
    checks: Vec<RepricingCheck>,
    max_error: f64,
    rms_error: f64,
    passed_count: usize,
}

impl RepricingReport {
    /// Creates a report from individual checks.
    #[must_use]
    pub fn new(checks: Vec<RepricingCheck>) -> Self {
        let max_error = checks.iter().map(|c| c.error).fold(0.0_f64, f64::max);
        let rms_error = if checks.is_empty() {
            0.0
        } else {
            let sum_sq: f64 = checks.iter().map(|c| c.error * c.error).sum();
            (sum_sq / checks.len() as f64).sqrt()
        };
        let passed_count = checks.iter().filter(|c| c.passed).count();
        Self {
            checks,
            max_error,
            rms_error,
            passed_count,
        }
    }

    /// Reprices every instrument of `blocks` against `provider`.
    pub fn reprice<I, C>(
        blocks: &[CalibrationBlock<I>],
        provider: &CurveProvider,
        calculator: &C,
        tolerance: f64,
    ) -> CurveResult<Self>
    where
        C: ParSpreadCalculator<I>,
    {
        let mut checks = Vec::new();
        for block in blocks {
            for bundle in block.curves() {
                for instrument in bundle.instruments() {
                    checks.push(RepricingCheck::new(
                        calculator.label(instrument),
                        bundle.name(),
                        calculator.par_spread(instrument, provider)?,
                        tolerance,
                    ));
                }
            }
        }
        Ok(Self::new(checks))
    }

    /// Returns whether every instrument passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.passed_count == self.checks.len()
    }

    /// Individual checks in calibration order.
    #[must_use]
    pub fn checks(&self) -> &[RepricingCheck] {
        &self.checks
    }

    /// Largest absolute par spread.
    #[must_use]
    pub fn max_error(&self) -> f64 {
        self.max_error
    }

    /// Root mean square par spread.
    #[must_use]
    pub fn rms_error(&self) -> f64 {
        self.rms_error
    }

    /// Number of instruments that passed.
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.passed_count
    }

    /// Number of instruments that failed.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.checks.len() - self.passed_count
    }

    /// Number of instruments checked.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.checks.len()
    }

    /// Checks that failed.
    #[must_use]
    pub fn failed_checks(&self) -> Vec<&RepricingCheck> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }
}

impl fmt::Display for RepricingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Repricing Report")?;
        writeln!(f, "================")?;
        writeln!(f, "Status: {}", if self.is_valid() { "PASSED" } else { "FAILED" })?;
        writeln!(f, "Instruments: {}/{} passed", self.passed_count, self.checks.len())?;
        writeln!(f, "Max Error: {:.2e}", self.max_error)?;
        writeln!(f, "RMS Error: {:.2e}", self.rms_error)?;

        if !self.checks.is_empty() {
            writeln!(f)?;
            writeln!(f, "Details:")?;
            for check in &self.checks {
                writeln!(f, "  {check}")?;
            }
        }
        Ok(())
    }
}
