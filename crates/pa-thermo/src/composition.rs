//! Reconciliation of user compositions against the simulator's component registry.
//!
//! The simulator's composition call takes a dense vector ordered like the
//! environment's component list. Agents supply a `name -> fraction` map using
//! whatever capitalisation they like, so names are matched case-insensitively
//! and each fraction is written into the slot of its registry index.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use pa_core::numeric::{FRACTION_SUM_TOLERANCE, nearly_equal};
use serde::{Deserialize, Serialize};

use crate::error::{CompositionError, CompositionResult};

/// How the values of a composition request are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositionBasis {
    /// Mole fractions summing to one.
    #[default]
    MoleFraction,
    /// Component mass flows in kg/hr; converted to mole fractions before use.
    MassFlowKgHr,
}

impl fmt::Display for CompositionBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MoleFraction => write!(f, "mole fraction"),
            Self::MassFlowKgHr => write!(f, "mass flow (kg/hr)"),
        }
    }
}

/// Composition aligned to the registry order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedComposition {
    /// One entry per registered component; 0.0 where nothing matched.
    pub vector: Vec<f64>,
    /// Input names (as spelled by the caller) that found a registry slot.
    pub matched: BTreeSet<String>,
    /// Input names with no registry slot. Their fractions are dropped.
    pub unmatched: BTreeSet<String>,
}

impl ResolvedComposition {
    pub fn is_complete(&self) -> bool {
        self.unmatched.is_empty()
    }

    /// Sum of the vector actually handed to the simulator.
    pub fn resolved_sum(&self) -> f64 {
        self.vector.iter().sum()
    }
}

/// Sum of the raw fraction values.
pub fn composition_sum(composition: &BTreeMap<String, f64>) -> f64 {
    composition.values().sum()
}

/// Check that fractions sum to one within 0.001, returning the sum.
pub fn validate_fraction_sum(composition: &BTreeMap<String, f64>) -> CompositionResult<f64> {
    let sum = composition_sum(composition);
    if nearly_equal(sum, 1.0, FRACTION_SUM_TOLERANCE) {
        Ok(sum)
    } else {
        Err(CompositionError::SumMismatch { sum })
    }
}

/// Build the registry-ordered composition vector.
///
/// The sum check runs on the raw input before any matching, so an input that
/// sums to one but names an unknown component still succeeds; the dropped
/// name is reported through `unmatched` only.
///
/// When two input keys differ only by case they land in the same slot and the
/// later key (in map order) overwrites the earlier one.
pub fn resolve_composition<S: AsRef<str>>(
    composition: &BTreeMap<String, f64>,
    registered_names: &[S],
) -> CompositionResult<ResolvedComposition> {
    validate_fraction_sum(composition)?;

    if registered_names.is_empty() {
        return Err(CompositionError::NoComponentsRegistered);
    }

    let registry: Vec<String> = registered_names
        .iter()
        .map(|name| name.as_ref().to_lowercase())
        .collect();

    let mut vector = vec![0.0; registry.len()];
    let mut matched = BTreeSet::new();
    let mut unmatched = BTreeSet::new();

    for (user_name, &fraction) in composition {
        let key = user_name.to_lowercase();
        match registry.iter().position(|name| *name == key) {
            Some(index) => {
                vector[index] = fraction;
                matched.insert(user_name.clone());
            }
            None => {
                unmatched.insert(user_name.clone());
            }
        }
    }

    Ok(ResolvedComposition {
        vector,
        matched,
        unmatched,
    })
}

/// Convert component mass flows to mole fractions.
///
/// `x_i = (m_i / M_i) / Σ (m_j / M_j)` with `M` in kg/kmol. The units of the
/// mass flows cancel, so any consistent mass-flow unit works.
pub fn mass_flows_to_mole_fractions<F>(
    mass_flows: &BTreeMap<String, f64>,
    mut molar_mass_of: F,
) -> CompositionResult<BTreeMap<String, f64>>
where
    F: FnMut(&str) -> Option<f64>,
{
    let mut moles = BTreeMap::new();
    let mut total = 0.0;

    for (name, &mass) in mass_flows {
        if !mass.is_finite() || mass < 0.0 {
            return Err(CompositionError::InvalidMassFlow {
                name: name.clone(),
                value: mass,
            });
        }
        let mw = molar_mass_of(name)
            .filter(|mw| mw.is_finite() && *mw > 0.0)
            .ok_or_else(|| CompositionError::UnknownMolarMass { name: name.clone() })?;
        let n = mass / mw;
        total += n;
        moles.insert(name.clone(), n);
    }

    if total <= 0.0 {
        return Err(CompositionError::EmptyMassFlow);
    }

    Ok(moles
        .into_iter()
        .map(|(name, n)| (name, n / total))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comp(items: &[(&str, f64)]) -> BTreeMap<String, f64> {
        items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn sum_error_wins_over_registry() {
        let input = comp(&[("Methane", 0.5), ("Ethane", 0.3)]);
        for registry in [vec![], vec!["Methane", "Ethane"]] {
            match resolve_composition(&input, &registry) {
                Err(CompositionError::SumMismatch { sum }) => assert!((sum - 0.8).abs() < 1e-12),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn empty_registry_is_rejected() {
        let input = comp(&[("Methane", 0.6), ("Ethane", 0.4)]);
        let registry: [&str; 0] = [];
        assert_eq!(
            resolve_composition(&input, &registry),
            Err(CompositionError::NoComponentsRegistered)
        );
    }

    #[test]
    fn case_insensitive_match_in_registry_order() {
        let input = comp(&[("methane", 0.5), ("ETHANE", 0.5)]);
        let resolved = resolve_composition(&input, &["Methane", "Ethane", "Propane"]).unwrap();
        assert_eq!(resolved.vector, vec![0.5, 0.5, 0.0]);
        assert_eq!(
            resolved.matched,
            BTreeSet::from(["methane".to_string(), "ETHANE".to_string()])
        );
        assert!(resolved.unmatched.is_empty());
        assert!(resolved.is_complete());
    }

    #[test]
    fn unmatched_is_reported_not_raised() {
        let input = comp(&[("Methane", 0.7), ("Xenon", 0.3)]);
        let resolved = resolve_composition(&input, &["Methane", "Ethane"]).unwrap();
        assert_eq!(resolved.vector, vec![0.7, 0.0]);
        assert_eq!(resolved.unmatched, BTreeSet::from(["Xenon".to_string()]));
        assert!((resolved.resolved_sum() - 0.7).abs() < 1e-12);
    }

    #[test]
    fn case_duplicates_share_a_slot() {
        // "Methane" sorts before "methane"; the later key wins the slot
        let input = comp(&[("Methane", 0.4), ("methane", 0.6)]);
        let resolved = resolve_composition(&input, &["Methane"]).unwrap();
        assert_eq!(resolved.vector, vec![0.6]);
        assert_eq!(resolved.matched.len(), 2);
    }

    #[test]
    fn tolerance_boundary() {
        let registry = ["A", "B"];
        assert!(resolve_composition(&comp(&[("A", 0.5), ("B", 0.5005)]), &registry).is_ok());
        assert!(resolve_composition(&comp(&[("A", 0.5), ("B", 0.502)]), &registry).is_err());
    }

    #[test]
    fn mass_flows_convert_with_molecular_weights() {
        // equal masses of methane (16) and oxygen (32) -> 2:1 molar
        let flows = comp(&[("Methane", 32.0), ("Oxygen", 32.0)]);
        let fractions = mass_flows_to_mole_fractions(&flows, |name| match name {
            "Methane" => Some(16.0),
            "Oxygen" => Some(32.0),
            _ => None,
        })
        .unwrap();
        assert!((fractions["Methane"] - 2.0 / 3.0).abs() < 1e-12);
        assert!((fractions["Oxygen"] - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn mass_flow_errors() {
        let flows = comp(&[("Unobtainium", 1.0)]);
        assert!(matches!(
            mass_flows_to_mole_fractions(&flows, |_| None),
            Err(CompositionError::UnknownMolarMass { name }) if name == "Unobtainium"
        ));

        let flows = comp(&[("Water", 0.0)]);
        assert_eq!(
            mass_flows_to_mole_fractions(&flows, |_| Some(18.0)),
            Err(CompositionError::EmptyMassFlow)
        );

        let flows = comp(&[("Water", -1.0)]);
        assert!(matches!(
            mass_flows_to_mole_fractions(&flows, |_| Some(18.0)),
            Err(CompositionError::InvalidMassFlow { .. })
        ));
    }
}
