//! Sensitivities keyed by curve name.

use std::fmt;

use nalgebra::DVector;

use crate::error::{CurveError, CurveResult};

/// A gradient split by curve: for each curve name, the partial derivatives
/// with respect to that curve's parameters (or, after conversion, its
/// market quotes).
///
/// Curves keep the order in which they were first added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSensitivity {
    entries: Vec<(String, DVector<f64>)>,
}

impl ParameterSensitivity {
    /// Creates an empty sensitivity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `values` to the entry for `name`, creating it if needed.
    pub fn add(&mut self, name: &str, values: &DVector<f64>) -> CurveResult<()> {
        self.add_scaled(name, values.as_slice(), 1.0)
    }

    /// Adds `weight * values` to the entry for `name`.
    pub fn add_scaled(&mut self, name: &str, values: &[f64], weight: f64) -> CurveResult<()> {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => {
                if existing.len() != values.len() {
                    return Err(CurveError::invalid_value(format!(
                        "sensitivity to '{name}' has {} entries, adding {}",
                        existing.len(),
                        values.len()
                    )));
                }
                for (e, v) in existing.iter_mut().zip(values) {
                    *e += weight * v;
                }
            }
            None => {
                let scaled = DVector::from_iterator(values.len(), values.iter().map(|v| weight * v));
                self.entries.push((name.to_string(), scaled));
            }
        }
        Ok(())
    }

    /// Sensitivity to one curve.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DVector<f64>> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Curve names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Iterates over (curve name, sensitivity) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DVector<f64>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of curves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entries across curves.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, v)| v.sum()).sum()
    }
}

impl fmt::Display for ParameterSensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, values) in &self.entries {
            let formatted: Vec<String> = values.iter().map(|v| format!("{v:.6e}")).collect();
            writeln!(f, "{name}: [{}]", formatted.join(", "))?;
        }
        Ok(())
    }
}
