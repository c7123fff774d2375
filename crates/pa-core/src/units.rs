// pa-core/src/units.rs

use uom::si::f64::{
    MassRate as UomMassRate, Pressure as UomPressure,
    ThermodynamicTemperature as UomThermodynamicTemperature,
};

// Public canonical unit types (SI, f64)
pub type MassRate = UomMassRate;
pub type Pressure = UomPressure;
pub type Temperature = UomThermodynamicTemperature;

/// Seconds per hour, used by the per-hour flow units.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn kgps(v: f64) -> MassRate {
    use uom::si::mass_rate::kilogram_per_second;
    MassRate::new::<kilogram_per_second>(v)
}

/// Reporting conversions back to the units the agent talks in.
pub mod report {
    use super::*;

    #[inline]
    pub fn celsius(t: Temperature) -> f64 {
        use uom::si::thermodynamic_temperature::degree_celsius;
        t.get::<degree_celsius>()
    }

    #[inline]
    pub fn kilopascal(p: Pressure) -> f64 {
        use uom::si::pressure::kilopascal;
        p.get::<kilopascal>()
    }

    #[inline]
    pub fn kilogram_per_hour(m: MassRate) -> f64 {
        use uom::si::mass_rate::kilogram_per_second;
        m.get::<kilogram_per_second>() * SECONDS_PER_HOUR
    }

    /// mol/s -> kmol/hr
    #[inline]
    pub fn kmol_per_hour(mol_per_s: f64) -> f64 {
        mol_per_s * SECONDS_PER_HOUR / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_round_trip() {
        assert!((report::celsius(k(373.15)) - 100.0).abs() < 1e-9);
        assert!((report::kilopascal(pa(101_325.0)) - 101.325).abs() < 1e-9);
        assert!((report::kilogram_per_hour(kgps(1.0)) - 3600.0).abs() < 1e-9);
        assert!((report::kmol_per_hour(1.0) - 3.6).abs() < 1e-12);
    }
}
