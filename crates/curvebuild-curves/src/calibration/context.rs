//! State threaded through blocks and units.

use std::fmt;

use super::building_block::{CurveBuildingBlock, CurveBuildingBlockBundle};
use super::jacobian::extend_bundle;
use crate::provider::CurveProvider;

/// Diagnostics of one solved unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitReport {
    /// Block index.
    pub block: usize,
    /// Unit index within the block.
    pub unit: usize,
    /// Curves solved by the unit.
    pub curves: Vec<String>,
    /// Root finder iterations.
    pub iterations: u32,
    /// Residual norm at the solution.
    pub residual_norm: f64,
}

impl fmt::Display for UnitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block {} unit {} [{}]: {} iterations, residual {:.2e}",
            self.block,
            self.unit,
            self.curves.join(", "),
            self.iterations,
            self.residual_norm
        )
    }
}

/// Known curves, their Jacobian records and the units solved so far.
///
/// Never modified in place: each solved unit produces a new context.
#[derive(Debug, Clone, Default)]
pub struct CalibrationContext {
    provider: CurveProvider,
    bundle: CurveBuildingBlockBundle,
    reports: Vec<UnitReport>,
}

impl CalibrationContext {
    /// Starts from known curves and their records.
    #[must_use]
    pub fn new(provider: CurveProvider, bundle: CurveBuildingBlockBundle) -> Self {
        Self {
            provider,
            bundle,
            reports: Vec::new(),
        }
    }

    /// Every curve known so far.
    #[must_use]
    pub fn provider(&self) -> &CurveProvider {
        &self.provider
    }

    /// Jacobian records known so far.
    #[must_use]
    pub fn bundle(&self) -> &CurveBuildingBlockBundle {
        &self.bundle
    }

    /// Reports of the units solved so far.
    #[must_use]
    pub fn reports(&self) -> &[UnitReport] {
        &self.reports
    }

    /// Returns the context after a solved unit.
    #[must_use]
    pub fn extend(
        &self,
        provider: CurveProvider,
        records: Vec<CurveBuildingBlock>,
        report: UnitReport,
    ) -> Self {
        let mut reports = self.reports.clone();
        reports.push(report);
        Self {
            provider,
            bundle: extend_bundle(&self.bundle, records),
            reports,
        }
    }

    /// Splits into provider, bundle and reports.
    #[must_use]
    pub fn into_parts(self) -> (CurveProvider, CurveBuildingBlockBundle, Vec<UnitReport>) {
        (self.provider, self.bundle, self.reports)
    }
}
