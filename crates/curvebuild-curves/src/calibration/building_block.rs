//! Jacobian records of calibrated curves.
//!
//! A [`CurveBuildingBlock`] keeps two matrices for one curve:
//!
//! - the **direct Jacobian**: d(par spread of the curve's instruments) /
//!   d(parameters), over the parameters of the curves its unit depends on
//!   followed by the unit's own parameters
//! - the **transition matrix**: d(curve parameters) / d(market quotes), over
//!   the quotes of every curve it depends on transitively
//!
//! Column ranges of both are described by a [`ParameterLayout`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use nalgebra::DMatrix;

use crate::error::{CurveError, CurveResult};

/// One named range of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LayoutEntry {
    name: String,
    start: usize,
    count: usize,
}

/// Ordered mapping from curve names to column ranges.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParameterLayout {
    entries: Vec<LayoutEntry>,
}

impl ParameterLayout {
    /// Creates an empty layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `count` columns for `name`.
    ///
    /// Appending a name twice with the same count is a no-op.
    pub fn push(&mut self, name: &str, count: usize) -> CurveResult<()> {
        if let Some(existing) = self.entries.iter().find(|e| e.name == name) {
            if existing.count == count {
                return Ok(());
            }
            return Err(CurveError::invalid_value(format!(
                "curve '{name}' appears with {} and {count} parameters",
                existing.count
            )));
        }
        let start = self.total();
        self.entries.push(LayoutEntry {
            name: name.to_string(),
            start,
            count,
        });
        Ok(())
    }

    /// First column of `name`.
    #[must_use]
    pub fn start(&self, name: &str) -> Option<usize> {
        self.entry(name).map(|e| e.start)
    }

    /// Number of columns of `name`.
    #[must_use]
    pub fn parameter_count(&self, name: &str) -> Option<usize> {
        self.entry(name).map(|e| e.count)
    }

    /// Returns true if `name` has columns.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Total number of columns.
    #[must_use]
    pub fn total(&self) -> usize {
        self.entries.last().map_or(0, |e| e.start + e.count)
    }

    /// Curve names in column order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// (name, start, count) in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, usize)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.start, e.count))
    }

    /// Number of curves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no curves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, name: &str) -> Option<&LayoutEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

impl fmt::Display for ParameterLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(name, start, count)| format!("{name}[{start}..{}]", start + count))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Jacobian record of one calibrated curve.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveBuildingBlock {
    curve: String,
    direct_layout: ParameterLayout,
    direct_jacobian: DMatrix<f64>,
    input_layout: ParameterLayout,
    transition: DMatrix<f64>,
}

impl CurveBuildingBlock {
    /// Creates a record, checking the matrix shapes against the layouts.
    pub fn new(
        curve: impl Into<String>,
        direct_layout: ParameterLayout,
        direct_jacobian: DMatrix<f64>,
        input_layout: ParameterLayout,
        transition: DMatrix<f64>,
    ) -> CurveResult<Self> {
        let curve = curve.into();
        if direct_jacobian.ncols() != direct_layout.total()
            || transition.ncols() != input_layout.total()
        {
            return Err(CurveError::invalid_value(format!(
                "'{curve}': matrix columns do not match layouts ({} vs {}, {} vs {})",
                direct_jacobian.ncols(),
                direct_layout.total(),
                transition.ncols(),
                input_layout.total()
            )));
        }
        if direct_jacobian.nrows() != transition.nrows() {
            return Err(CurveError::invalid_value(format!(
                "'{curve}': {} instrument rows but {} parameter rows",
                direct_jacobian.nrows(),
                transition.nrows()
            )));
        }
        Ok(Self {
            curve,
            direct_layout,
            direct_jacobian,
            input_layout,
            transition,
        })
    }

    /// Curve name.
    #[must_use]
    pub fn curve(&self) -> &str {
        &self.curve
    }

    /// Number of parameters (and calibration instruments) of the curve.
    #[must_use]
    pub fn size(&self) -> usize {
        self.transition.nrows()
    }

    /// Columns of the direct Jacobian.
    #[must_use]
    pub fn direct_layout(&self) -> &ParameterLayout {
        &self.direct_layout
    }

    /// d(par spreads) / d(parameters of the unit and its dependencies).
    #[must_use]
    pub fn direct_jacobian(&self) -> &DMatrix<f64> {
        &self.direct_jacobian
    }

    /// Columns of the transition matrix.
    #[must_use]
    pub fn input_layout(&self) -> &ParameterLayout {
        &self.input_layout
    }

    /// d(parameters) / d(market quotes of every transitive input).
    #[must_use]
    pub fn transition(&self) -> &DMatrix<f64> {
        &self.transition
    }

    /// First transition column of input curve `name`.
    #[must_use]
    pub fn start(&self, name: &str) -> Option<usize> {
        self.input_layout.start(name)
    }

    /// Number of market quotes of input curve `name`.
    #[must_use]
    pub fn parameter_count(&self, name: &str) -> Option<usize> {
        self.input_layout.parameter_count(name)
    }

    /// Input curves in column order, including the curve itself.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.input_layout.names()
    }

    /// Direct Jacobian columns for the parameters of `name`.
    #[must_use]
    pub fn direct_sensitivity(&self, name: &str) -> Option<DMatrix<f64>> {
        let start = self.direct_layout.start(name)?;
        let count = self.direct_layout.parameter_count(name)?;
        Some(self.direct_jacobian.columns(start, count).into_owned())
    }

    /// Transition columns for the market quotes of `name`.
    #[must_use]
    pub fn quote_sensitivity(&self, name: &str) -> Option<DMatrix<f64>> {
        let start = self.input_layout.start(name)?;
        let count = self.input_layout.parameter_count(name)?;
        Some(self.transition.columns(start, count).into_owned())
    }
}

/// Jacobian records keyed by curve name, in calibration order.
#[derive(Debug, Clone, Default)]
pub struct CurveBuildingBlockBundle {
    blocks: HashMap<String, Arc<CurveBuildingBlock>>,
    order: Vec<String>,
}

impl CurveBuildingBlockBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the record of a curve.
    pub fn insert(&mut self, block: Arc<CurveBuildingBlock>) {
        let name = block.curve().to_string();
        if self.blocks.insert(name.clone(), block).is_none() {
            self.order.push(name);
        }
    }

    /// Record of a curve.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<CurveBuildingBlock>> {
        self.blocks.get(name)
    }

    /// Returns true if the curve has a record.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    /// Curve names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns a bundle with the records of both; `other` wins on conflicts.
    #[must_use]
    pub fn merged_with(&self, other: &CurveBuildingBlockBundle) -> Self {
        let mut merged = self.clone();
        for name in &other.order {
            if let Some(block) = other.blocks.get(name) {
                merged.insert(Arc::clone(block));
            }
        }
        merged
    }
}
