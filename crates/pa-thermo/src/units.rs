//! Conversion of user-facing units to SI.
//!
//! The simulator stores every stream property in SI base units: kelvin, pascal,
//! mol/s for molar flow and kg/s for mass flow. Agents talk in engineering units,
//! so every property-setting tool passes its value through [`convert_units`]
//! first.
//!
//! Unit symbols are matched exactly (`"kPa"`, not `"kpa"`).

use std::fmt;
use std::str::FromStr;

use pa_core::units::{MassRate, Pressure, SECONDS_PER_HOUR, Temperature, k, kgps, pa};
use serde::{Deserialize, Serialize};

use crate::error::{UnitError, UnitResult};

/// Quantity family a unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityKind {
    /// Canonical: K
    Temperature,
    /// Canonical: Pa (absolute)
    Pressure,
    /// Canonical: mol/s or kg/s, depending on the unit's basis
    Flow,
}

const TEMPERATURE_UNITS: &[&str] = &["K", "C", "F", "R"];
const PRESSURE_UNITS: &[&str] = &["Pa", "kPa", "bar", "atm", "psi", "kg/cm2", "kg/cm2(g)"];
const FLOW_UNITS: &[&str] = &["mol/s", "kmol/hr", "kg/s", "kg/hr"];

/// One standard atmosphere in Pa, the reference for gauge units.
const ATMOSPHERE_PA: f64 = 101_325.0;

impl QuantityKind {
    pub const ALL: [QuantityKind; 3] = [Self::Temperature, Self::Pressure, Self::Flow];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Pressure => "pressure",
            Self::Flow => "flow",
        }
    }

    /// Unit symbols accepted for this kind.
    pub fn units(self) -> &'static [&'static str] {
        match self {
            Self::Temperature => TEMPERATURE_UNITS,
            Self::Pressure => PRESSURE_UNITS,
            Self::Flow => FLOW_UNITS,
        }
    }
}

impl fmt::Display for QuantityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuantityKind {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "temperature" => Ok(Self::Temperature),
            "pressure" => Ok(Self::Pressure),
            "flow" => Ok(Self::Flow),
            other => Err(UnitError::UnknownQuantityKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Convert `value` expressed in `unit` to the SI base unit of `kind`.
///
/// `kind` is one of `"temperature"`, `"pressure"` or `"flow"`.
pub fn convert_units(value: f64, unit: &str, kind: &str) -> UnitResult<f64> {
    let kind: QuantityKind = kind.parse()?;
    to_si(value, unit, kind)
}

/// Typed variant of [`convert_units`].
pub fn to_si(value: f64, unit: &str, kind: QuantityKind) -> UnitResult<f64> {
    match kind {
        QuantityKind::Temperature => kelvin(value, unit),
        QuantityKind::Pressure => pascal(value, unit),
        QuantityKind::Flow => flow(value, unit).map(|rate| rate.si_value()),
    }
}

/// Temperature as a typed SI quantity.
pub fn temperature(value: f64, unit: &str) -> UnitResult<Temperature> {
    kelvin(value, unit).map(k)
}

/// Absolute pressure as a typed SI quantity.
pub fn pressure(value: f64, unit: &str) -> UnitResult<Pressure> {
    pascal(value, unit).map(pa)
}

fn kelvin(x: f64, unit: &str) -> UnitResult<f64> {
    match unit {
        "K" => Ok(x),
        "C" => Ok(x + 273.15),
        "F" => Ok((x - 32.0) * 5.0 / 9.0 + 273.15),
        "R" => Ok(x * 5.0 / 9.0),
        _ => Err(unknown_unit(unit, QuantityKind::Temperature)),
    }
}

fn pascal(x: f64, unit: &str) -> UnitResult<f64> {
    match unit {
        "Pa" => Ok(x),
        "kPa" => Ok(x * 1000.0),
        "bar" => Ok(x * 100_000.0),
        "atm" => Ok(x * ATMOSPHERE_PA),
        "psi" => Ok(x * 6894.76),
        "kg/cm2" => Ok(x * 98_066.5),
        // gauge -> absolute
        "kg/cm2(g)" => Ok(x * 98_066.5 + ATMOSPHERE_PA),
        _ => Err(unknown_unit(unit, QuantityKind::Pressure)),
    }
}

fn unknown_unit(unit: &str, kind: QuantityKind) -> UnitError {
    UnitError::UnknownUnit {
        unit: unit.to_string(),
        kind: kind.as_str().to_string(),
    }
}

/// Whether a flow unit measures moles or mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowBasis {
    Molar,
    Mass,
}

impl FlowBasis {
    pub fn of_unit(unit: &str) -> UnitResult<Self> {
        match unit {
            "mol/s" | "kmol/hr" => Ok(Self::Molar),
            "kg/s" | "kg/hr" => Ok(Self::Mass),
            _ => Err(unknown_unit(unit, QuantityKind::Flow)),
        }
    }

    /// SI unit symbol for this basis.
    pub fn si_unit(self) -> &'static str {
        match self {
            Self::Molar => "mol/s",
            Self::Mass => "kg/s",
        }
    }
}

impl fmt::Display for FlowBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Molar => write!(f, "molar"),
            Self::Mass => write!(f, "mass"),
        }
    }
}

/// A flow rate in SI, tagged with its basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FlowRate {
    /// mol/s
    Molar(f64),
    Mass(MassRate),
}

impl FlowRate {
    pub fn basis(&self) -> FlowBasis {
        match self {
            Self::Molar(_) => FlowBasis::Molar,
            Self::Mass(_) => FlowBasis::Mass,
        }
    }

    /// Raw SI value (mol/s or kg/s).
    pub fn si_value(&self) -> f64 {
        match self {
            Self::Molar(v) => *v,
            Self::Mass(m) => m.value,
        }
    }
}

/// Flow rate converted to SI; the basis follows from the unit.
pub fn flow(x: f64, unit: &str) -> UnitResult<FlowRate> {
    match unit {
        "mol/s" => Ok(FlowRate::Molar(x)),
        "kmol/hr" => Ok(FlowRate::Molar(x * 1000.0 / SECONDS_PER_HOUR)),
        "kg/s" => Ok(FlowRate::Mass(kgps(x))),
        "kg/hr" => Ok(FlowRate::Mass(kgps(x / SECONDS_PER_HOUR))),
        _ => Err(unknown_unit(unit, QuantityKind::Flow)),
    }
}
