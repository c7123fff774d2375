//! Conversion and composition errors.

use thiserror::Error;

/// Result type for unit conversion.
pub type UnitResult<T> = Result<T, UnitError>;

/// Result type for composition handling.
pub type CompositionResult<T> = Result<T, CompositionError>;

/// Errors raised while converting a value to SI.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    /// Quantity kind is not one of temperature / pressure / flow.
    #[error("Unknown unit type: {kind}")]
    UnknownQuantityKind { kind: String },

    /// Unit is not registered under the requested kind.
    #[error("Unknown {kind} unit: {unit}")]
    UnknownUnit { unit: String, kind: String },
}

/// Errors raised while reconciling a composition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositionError {
    /// Raw fractions do not sum to one within tolerance.
    #[error("Composition must sum to 1.0, got {sum:.4}")]
    SumMismatch { sum: f64 },

    /// The simulator environment has no components yet.
    #[error("No components in environment. Add components first.")]
    NoComponentsRegistered,

    /// Molecular weight needed for a mass-to-mole conversion is missing.
    #[error("Unknown molar mass for component '{name}'")]
    UnknownMolarMass { name: String },

    /// A mass flow is negative or not finite.
    #[error("Invalid mass flow for component '{name}': {value}")]
    InvalidMassFlow { name: String, value: f64 },

    /// Mass flows add up to nothing.
    #[error("Total mass flow must be positive")]
    EmptyMassFlow,
}
