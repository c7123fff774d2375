//! pa-thermo: unit conversion and composition handling for procagent.
//!
//! Provides:
//! - Conversion of user-facing units (°C, kPa, kmol/hr, ...) to the SI values
//!   the simulator expects
//! - Reconciliation of a `name -> fraction` composition against the
//!   simulator's ordered component registry
//! - Mass-flow to mole-fraction conversion using molecular weights
//! - A small catalog of common process components with molar masses
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use pa_thermo::{convert_units, resolve_composition};
//!
//! let t_k = convert_units(43.0, "C", "temperature").unwrap();
//! assert!((t_k - 316.15).abs() < 1e-9);
//!
//! let comp = BTreeMap::from([("methane".to_string(), 0.5), ("ETHANE".to_string(), 0.5)]);
//! let resolved = resolve_composition(&comp, &["Methane", "Ethane", "Propane"]).unwrap();
//! assert_eq!(resolved.vector, vec![0.5, 0.5, 0.0]);
//! ```

pub mod catalog;
pub mod composition;
pub mod error;
pub mod units;

// Re-exports for ergonomics
pub use catalog::{ComponentCatalogEntry, catalog, lookup_component, molar_mass};
pub use composition::{
    CompositionBasis, ResolvedComposition, composition_sum, mass_flows_to_mole_fractions,
    resolve_composition, validate_fraction_sum,
};
pub use error::{CompositionError, CompositionResult, UnitError, UnitResult};
pub use units::{
    FlowBasis, FlowRate, QuantityKind, convert_units, flow, pressure, temperature, to_si,
};
