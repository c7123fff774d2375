//! Common process components and their molecular weights.
//!
//! Names follow the simulator's species naming (`"Carbon Dioxide"`,
//! `"Hydrogen Sulfide"`, `"MDEA"`); lookups also accept formulas and aliases.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentCatalogEntry {
    pub canonical_name: &'static str,
    pub formula: &'static str,
    /// kg/kmol
    pub molar_mass: f64,
    pub aliases: &'static [&'static str],
}

impl ComponentCatalogEntry {
    /// Exact (case-insensitive) match on name, formula or alias.
    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.trim();
        self.canonical_name.eq_ignore_ascii_case(name)
            || self.formula.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
    }

    /// Substring search used for listings.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_ascii_lowercase();
        if query.is_empty() {
            return true;
        }

        self.canonical_name.to_ascii_lowercase().contains(&query)
            || self.formula.to_ascii_lowercase().contains(&query)
            || self
                .aliases
                .iter()
                .any(|alias| alias.to_ascii_lowercase().contains(&query))
    }
}

const fn entry(
    canonical_name: &'static str,
    formula: &'static str,
    molar_mass: f64,
    aliases: &'static [&'static str],
) -> ComponentCatalogEntry {
    ComponentCatalogEntry {
        canonical_name,
        formula,
        molar_mass,
        aliases,
    }
}

const CATALOG: [ComponentCatalogEntry; 24] = [
    entry("Methane", "CH4", 16.043, &["C1"]),
    entry("Ethane", "C2H6", 30.069, &["C2"]),
    entry("Propane", "C3H8", 44.096, &["C3"]),
    entry("n-Butane", "nC4H10", 58.122, &["Butane", "nC4"]),
    entry("Isobutane", "iC4H10", 58.122, &["i-Butane", "iC4"]),
    entry("n-Pentane", "nC5H12", 72.149, &["Pentane", "nC5"]),
    entry("Isopentane", "iC5H12", 72.149, &["i-Pentane", "iC5"]),
    entry("n-Hexane", "C6H14", 86.175, &["Hexane", "nC6"]),
    entry("Ethylene", "C2H4", 28.054, &["Ethene"]),
    entry("Propylene", "C3H6", 42.081, &["Propene"]),
    entry("Nitrogen", "N2", 28.013, &[]),
    entry("Oxygen", "O2", 31.999, &[]),
    entry("Hydrogen", "H2", 2.016, &[]),
    entry("Helium", "He", 4.003, &[]),
    entry("Argon", "Ar", 39.948, &[]),
    entry("Water", "H2O", 18.015, &[]),
    entry("Carbon Dioxide", "CO2", 44.010, &["CarbonDioxide"]),
    entry("Carbon Monoxide", "CO", 28.010, &["CarbonMonoxide"]),
    entry("Hydrogen Sulfide", "H2S", 34.081, &["HydrogenSulfide"]),
    entry("Sulfur Dioxide", "SO2", 64.064, &["SulfurDioxide"]),
    entry("Ammonia", "NH3", 17.031, &[]),
    entry("MDEA", "C5H13NO2", 119.163, &["Methyldiethanolamine"]),
    entry("DEA", "C4H11NO2", 105.136, &["Diethanolamine"]),
    entry("MEA", "C2H7NO", 61.083, &["Monoethanolamine"]),
];

pub fn catalog() -> &'static [ComponentCatalogEntry] {
    &CATALOG
}

pub fn lookup_component(name: &str) -> Option<&'static ComponentCatalogEntry> {
    CATALOG.iter().find(|entry| entry.matches_name(name))
}

/// Molecular weight in kg/kmol, if the component is known.
pub fn molar_mass(name: &str) -> Option<f64> {
    lookup_component(name).map(|entry| entry.molar_mass)
}
