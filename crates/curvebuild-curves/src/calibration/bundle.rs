//! Calibration inputs: single-curve bundles, units and blocks.
//!
//! A [`CalibrationBlock`] owns an arena of [`SingleCurveBundle`]s. Each
//! [`CalibrationUnit`] names the arena entries it solves jointly, so the
//! unit/curve/instrument nesting never has to be kept in parallel arrays.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{CurveError, CurveResult};
use crate::generators::CurveGenerator;
use crate::keys::CurveRole;

/// Starting point for a curve's parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum InitialGuess {
    /// Parameters in the curve's own value space.
    Parameters(Vec<f64>),
    /// One rate per instrument, mapped through the final generator.
    Rates(Vec<f64>),
}

impl InitialGuess {
    /// Number of guesses.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Parameters(v) | Self::Rates(v) => v.len(),
        }
    }

    /// Returns true if there are no guesses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One curve with the instruments that calibrate it.
#[derive(Debug, Clone)]
pub struct SingleCurveBundle<I> {
    name: String,
    instruments: Vec<I>,
    initial_guess: InitialGuess,
    generator: Arc<dyn CurveGenerator>,
    roles: Vec<CurveRole>,
}

impl<I> SingleCurveBundle<I> {
    /// Creates a bundle.
    pub fn new(
        name: impl Into<String>,
        instruments: Vec<I>,
        initial_guess: InitialGuess,
        generator: Arc<dyn CurveGenerator>,
    ) -> Self {
        Self {
            name: name.into(),
            instruments,
            initial_guess,
            generator,
            roles: Vec::new(),
        }
    }

    /// Registers the calibrated curve under `role` in the provider.
    #[must_use]
    pub fn with_role(mut self, role: CurveRole) -> Self {
        self.roles.push(role);
        self
    }

    /// Curve name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Calibration instruments, one per parameter.
    #[must_use]
    pub fn instruments(&self) -> &[I] {
        &self.instruments
    }

    /// Initial guess.
    #[must_use]
    pub fn initial_guess(&self) -> &InitialGuess {
        &self.initial_guess
    }

    /// Curve generator.
    #[must_use]
    pub fn generator(&self) -> &Arc<dyn CurveGenerator> {
        &self.generator
    }

    /// Roles to register.
    #[must_use]
    pub fn roles(&self) -> &[CurveRole] {
        &self.roles
    }

    /// Number of instruments.
    #[must_use]
    pub fn instrument_count(&self) -> usize {
        self.instruments.len()
    }

    /// Checks that the system for this curve is square.
    pub fn validate(&self) -> CurveResult<()> {
        if self.name.is_empty() {
            return Err(CurveError::malformed_bundle("", "curve name is empty"));
        }
        if self.instruments.is_empty() {
            return Err(CurveError::malformed_bundle(
                &self.name,
                "no calibration instruments",
            ));
        }
        if self.initial_guess.len() != self.instruments.len() {
            return Err(CurveError::malformed_bundle(
                &self.name,
                format!(
                    "initial guess has {} entries for {} instruments",
                    self.initial_guess.len(),
                    self.instruments.len()
                ),
            ));
        }
        if let Some(count) = self.generator.parameter_count() {
            if count != self.instruments.len() {
                return Err(CurveError::malformed_bundle(
                    &self.name,
                    format!(
                        "generator has {count} parameters for {} instruments",
                        self.instruments.len()
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Curves solved as one coupled system, by index into the block arena.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CalibrationUnit {
    curves: Vec<usize>,
}

impl CalibrationUnit {
    /// Creates a unit from arena indices.
    #[must_use]
    pub fn new(curves: Vec<usize>) -> Self {
        Self { curves }
    }

    /// Arena indices in solve order.
    #[must_use]
    pub fn curves(&self) -> &[usize] {
        &self.curves
    }
}

/// An ordered sequence of units sharing one arena of curves.
#[derive(Debug, Clone)]
pub struct CalibrationBlock<I> {
    curves: Vec<SingleCurveBundle<I>>,
    units: Vec<CalibrationUnit>,
}

impl<I> Default for CalibrationBlock<I> {
    fn default() -> Self {
        Self {
            curves: Vec::new(),
            units: Vec::new(),
        }
    }
}

impl<I> CalibrationBlock<I> {
    /// Creates an empty block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a unit made of `bundles`.
    #[must_use]
    pub fn with_unit(mut self, bundles: Vec<SingleCurveBundle<I>>) -> Self {
        let start = self.curves.len();
        let indices = (start..start + bundles.len()).collect();
        self.curves.extend(bundles);
        self.units.push(CalibrationUnit::new(indices));
        self
    }

    /// Builds a block from an explicit arena and units.
    #[must_use]
    pub fn from_parts(curves: Vec<SingleCurveBundle<I>>, units: Vec<CalibrationUnit>) -> Self {
        Self { curves, units }
    }

    /// Curve arena.
    #[must_use]
    pub fn curves(&self) -> &[SingleCurveBundle<I>] {
        &self.curves
    }

    /// Units in solve order.
    #[must_use]
    pub fn units(&self) -> &[CalibrationUnit] {
        &self.units
    }

    /// Bundles of one unit, in order.
    pub fn unit_bundles(&self, unit: &CalibrationUnit) -> CurveResult<Vec<&SingleCurveBundle<I>>> {
        unit.curves
            .iter()
            .map(|&i| {
                self.curves.get(i).ok_or_else(|| {
                    CurveError::malformed_bundle(
                        format!("arena[{i}]"),
                        format!("index out of range for {} curves", self.curves.len()),
                    )
                })
            })
            .collect()
    }

    /// Checks every bundle, unit and the arena bookkeeping.
    pub fn validate(&self) -> CurveResult<()> {
        let mut names = HashSet::new();
        for bundle in &self.curves {
            bundle.validate()?;
            if !names.insert(bundle.name()) {
                return Err(CurveError::duplicate_curve(bundle.name()));
            }
        }

        let mut used = vec![false; self.curves.len()];
        for (u, unit) in self.units.iter().enumerate() {
            if unit.curves.is_empty() {
                return Err(CurveError::malformed_bundle(
                    format!("unit {u}"),
                    "unit has no curves",
                ));
            }
            for bundle_index in &unit.curves {
                match used.get_mut(*bundle_index) {
                    None => {
                        return Err(CurveError::malformed_bundle(
                            format!("unit {u}"),
                            format!("curve index {bundle_index} out of range"),
                        ))
                    }
                    Some(true) => {
                        return Err(CurveError::malformed_bundle(
                            format!("unit {u}"),
                            format!("curve index {bundle_index} used twice"),
                        ))
                    }
                    Some(flag) => *flag = true,
                }
            }
        }
        Ok(())
    }
}
