//! The curve provider: every curve known at a point of the calibration.
//!
//! A [`CurveProvider`] is persistent and immutable. Every change (adding a
//! curve, registering a role, replacing parameters) returns a new provider
//! and leaves the original untouched. Curves are shared behind `Arc`, so an
//! extension copies names and pointers only.
//!
//! Curves are found by name, or by role: the discounting curve of a
//! currency, the forward curve of a rate index, or the projection curve of a
//! price index. Lookups of unknown names or roles fail with
//! [`CurveError::UnresolvableDependency`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{CurveError, CurveResult};
use crate::generators::CurveGenerator;
use crate::keys::{Currency, CurveRole, PriceIndex, RateIndex};
use crate::traits::Curve;

/// A curve together with the generator and parameters that produced it.
#[derive(Debug, Clone)]
pub struct ParameterizedCurve {
    name: String,
    generator: Arc<dyn CurveGenerator>,
    parameters: Vec<f64>,
    curve: Arc<dyn Curve>,
}

impl ParameterizedCurve {
    /// Builds the curve from a generator and parameters.
    pub fn new(
        name: impl Into<String>,
        generator: Arc<dyn CurveGenerator>,
        parameters: Vec<f64>,
    ) -> CurveResult<Self> {
        let curve = generator.build(&parameters)?;
        Ok(Self {
            name: name.into(),
            generator,
            parameters,
            curve,
        })
    }

    /// Rebuilds the curve from new parameters.
    pub fn with_parameters(&self, parameters: Vec<f64>) -> CurveResult<Self> {
        if parameters.len() != self.parameters.len() {
            return Err(CurveError::invalid_value(format!(
                "curve '{}' has {} parameters, got {}",
                self.name,
                self.parameters.len(),
                parameters.len()
            )));
        }
        Self::new(self.name.clone(), Arc::clone(&self.generator), parameters)
    }

    /// Curve name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The generator the curve was built with.
    #[must_use]
    pub fn generator(&self) -> &Arc<dyn CurveGenerator> {
        &self.generator
    }

    /// Curve parameters.
    #[must_use]
    pub fn parameters(&self) -> &[f64] {
        &self.parameters
    }

    /// The curve itself.
    #[must_use]
    pub fn curve(&self) -> &dyn Curve {
        self.curve.as_ref()
    }
}

/// An immutable set of named curves with role lookups.
#[derive(Debug, Clone, Default)]
pub struct CurveProvider {
    curves: HashMap<String, Arc<ParameterizedCurve>>,
    order: Vec<String>,
    discounting: HashMap<Currency, String>,
    forwards: HashMap<RateIndex, String>,
    price_indices: HashMap<PriceIndex, String>,
}

impl CurveProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a provider with `curve` added, replacing any curve of the
    /// same name in place.
    #[must_use]
    pub fn with_curve(&self, curve: ParameterizedCurve) -> Self {
        let mut next = self.clone();
        next.insert(Arc::new(curve));
        next
    }

    /// Returns a provider with `role` resolved to the curve `name`.
    pub fn with_role(&self, role: &CurveRole, name: &str) -> CurveResult<Self> {
        if !self.contains(name) {
            return Err(CurveError::unresolvable(name));
        }
        let mut next = self.clone();
        next.assign(role, name);
        Ok(next)
    }

    /// Returns a provider with the named curve rebuilt from new parameters.
    pub fn with_parameters(&self, name: &str, parameters: Vec<f64>) -> CurveResult<Self> {
        let rebuilt = self.curve(name)?.with_parameters(parameters)?;
        Ok(self.with_curve(rebuilt))
    }

    /// Returns a provider holding the curves and roles of both; `other` wins
    /// on conflicts.
    #[must_use]
    pub fn merged_with(&self, other: &CurveProvider) -> Self {
        let mut next = self.clone();
        for name in &other.order {
            if let Some(curve) = other.curves.get(name) {
                next.insert(Arc::clone(curve));
            }
        }
        for (role, name) in other.roles() {
            next.assign(&role, &name);
        }
        next
    }

    fn insert(&mut self, curve: Arc<ParameterizedCurve>) {
        let name = curve.name().to_string();
        if self.curves.insert(name.clone(), curve).is_none() {
            self.order.push(name);
        }
    }

    fn assign(&mut self, role: &CurveRole, name: &str) {
        let name = name.to_string();
        match role {
            CurveRole::Discounting(ccy) => {
                self.discounting.insert(ccy.clone(), name);
            }
            CurveRole::Forward(index) => {
                self.forwards.insert(index.clone(), name);
            }
            CurveRole::PriceIndex(index) => {
                self.price_indices.insert(index.clone(), name);
            }
        }
    }

    /// Returns true if a curve of this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.curves.contains_key(name)
    }

    /// Curve names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Position of a curve in insertion order.
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    /// Number of curves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the provider holds no curves.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Looks up a curve by name.
    pub fn curve(&self, name: &str) -> CurveResult<&ParameterizedCurve> {
        self.curves
            .get(name)
            .map(|c| &**c)
            .ok_or_else(|| CurveError::unresolvable(name))
    }

    /// Name of the curve playing `role`.
    pub fn name_for_role(&self, role: &CurveRole) -> CurveResult<&str> {
        let name = match role {
            CurveRole::Discounting(ccy) => self.discounting.get(ccy),
            CurveRole::Forward(index) => self.forwards.get(index),
            CurveRole::PriceIndex(index) => self.price_indices.get(index),
        };
        name.map(String::as_str)
            .ok_or_else(|| CurveError::unresolvable(role.to_string()))
    }

    /// Curve playing `role`.
    pub fn curve_for_role(&self, role: &CurveRole) -> CurveResult<&ParameterizedCurve> {
        self.curve(self.name_for_role(role)?)
    }

    /// Discounting curve of a currency.
    pub fn discount_curve(&self, currency: &Currency) -> CurveResult<&ParameterizedCurve> {
        self.curve_for_role(&CurveRole::Discounting(currency.clone()))
    }

    /// Forward curve of a rate index.
    pub fn forward_curve(&self, index: &RateIndex) -> CurveResult<&ParameterizedCurve> {
        self.curve_for_role(&CurveRole::Forward(index.clone()))
    }

    /// Projection curve of a price index.
    pub fn price_index_curve(&self, index: &PriceIndex) -> CurveResult<&ParameterizedCurve> {
        self.curve_for_role(&CurveRole::PriceIndex(index.clone()))
    }

    /// All registered roles with their curve names.
    #[must_use]
    pub fn roles(&self) -> Vec<(CurveRole, String)> {
        let mut roles: Vec<(CurveRole, String)> = self
            .discounting
            .iter()
            .map(|(k, v)| (CurveRole::Discounting(k.clone()), v.clone()))
            .chain(
                self.forwards
                    .iter()
                    .map(|(k, v)| (CurveRole::Forward(k.clone()), v.clone())),
            )
            .chain(
                self.price_indices
                    .iter()
                    .map(|(k, v)| (CurveRole::PriceIndex(k.clone()), v.clone())),
            )
            .collect();
        roles.sort_by(|a, b| a.0.to_string().cmp(&b.0.to_string()));
        roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::ConstantGenerator;
    use crate::value_type::CurveValueType;
    use approx::assert_relative_eq;

    fn flat(name: &str, rate: f64) -> ParameterizedCurve {
        ParameterizedCurve::new(
            name,
            Arc::new(ConstantGenerator::new(CurveValueType::ZeroRate)),
            vec![rate],
        )
        .unwrap()
    }

    #[test]
    fn test_copy_on_extend() {
        let usd = Currency::new("USD");
        let base = CurveProvider::new().with_curve(flat("USD-OIS", 0.02));
        let extended = base
            .with_role(&CurveRole::Discounting(usd.clone()), "USD-OIS")
            .unwrap();

        assert!(base.discount_curve(&usd).is_err());
        assert_eq!(extended.discount_curve(&usd).unwrap().name(), "USD-OIS");
    }

    #[test]
    fn test_with_parameters_replaces_in_place() {
        let provider = CurveProvider::new()
            .with_curve(flat("A", 0.01))
            .with_curve(flat("B", 0.02));
        let bumped = provider.with_parameters("A", vec![0.05]).unwrap();

        assert_eq!(bumped.names().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_relative_eq!(bumped.curve("A").unwrap().curve().zero_rate(1.0).unwrap(), 0.05);
        assert_relative_eq!(provider.curve("A").unwrap().curve().zero_rate(1.0).unwrap(), 0.01);
        assert!(provider.with_parameters("A", vec![0.05, 0.06]).is_err());
    }

    #[test]
    fn test_unresolvable_lookups() {
        let provider = CurveProvider::new().with_curve(flat("A", 0.01));
        assert!(matches!(
            provider.curve("Z"),
            Err(CurveError::UnresolvableDependency { .. })
        ));
        assert!(matches!(
            provider.forward_curve(&RateIndex::new("EURIBOR-6M")),
            Err(CurveError::UnresolvableDependency { .. })
        ));
        assert!(provider
            .with_role(&CurveRole::Discounting(Currency::new("USD")), "Z")
            .is_err());
    }

    #[test]
    fn test_merge() {
        let eur = Currency::new("EUR");
        let left = CurveProvider::new().with_curve(flat("A", 0.01));
        let right = CurveProvider::new()
            .with_curve(flat("A", 0.03))
            .with_curve(flat("B", 0.02))
            .with_role(&CurveRole::Discounting(eur.clone()), "B")
            .unwrap();

        let merged = left.merged_with(&right);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.curve("A").unwrap().parameters(), &[0.03]);
        assert_eq!(merged.discount_curve(&eur).unwrap().name(), "B");
        assert_eq!(merged.roles().len(), 1);
    }
}
