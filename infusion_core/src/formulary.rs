//! Drug formulary: the built-in table, TOML loading and validation.
//!
//! The formulary is plain data. The engine never names a drug; everything
//! drug-specific (units, ranges, bands, syringe size) lives here and can be
//! replaced wholesale with a TOML file.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cached default formulary - built once and shared by every evaluation
static DEFAULT_FORMULARY: Lazy<Formulary> = Lazy::new(build_default_formulary_internal);

/// Get a reference to the cached default formulary
pub fn default_formulary() -> &'static Formulary {
    &DEFAULT_FORMULARY
}

/// Builds a fresh copy of the default formulary
///
/// **Note**: For production use, prefer `default_formulary()` which returns a
/// cached reference. This function is retained for tests and for exporting
/// the table as a starting point for a custom formulary file.
pub fn build_default_formulary() -> Formulary {
    build_default_formulary_internal()
}

/// An immutable set of drug profiles, in declaration order
#[derive(Clone, Debug, PartialEq)]
pub struct Formulary {
    drugs: Vec<DrugProfile>,
}

/// On-disk layout: one `[[drug]]` table per profile
#[derive(Debug, Serialize, Deserialize)]
struct FormularyFile {
    #[serde(rename = "drug", default)]
    drugs: Vec<DrugProfile>,
}

// Standard neonatal/paediatric weight bands, as half-open intervals
const UNDER_1KG: (&str, f64, Option<f64>) = ("<1kg", 0.0, Some(1.0));
const FROM_1KG: (&str, f64, Option<f64>) = ("1-2.4kg", 1.0, Some(2.5));
const FROM_2_5KG: (&str, f64, Option<f64>) = ("≥2.5kg", 2.5, None);

fn bands(under_1: &[f64], from_1: &[f64], from_2_5: &[f64]) -> Vec<WeightBand> {
    [(UNDER_1KG, under_1), (FROM_1KG, from_1), (FROM_2_5KG, from_2_5)]
        .into_iter()
        .map(|((label, min, max), options)| WeightBand::new(label, min, max, options))
        .collect()
}

fn mg_drug(
    name: &str,
    unit: DoseUnit,
    range: Option<(f64, f64)>,
    weight_bands: Vec<WeightBand>,
) -> DrugProfile {
    DrugProfile {
        name: name.into(),
        unit,
        dosing_range: range.map(|(min, max)| DosingRange::new(min, max)),
        concentration_unit: ConcentrationUnit::Mg,
        preparation_volume_ml: 25.0,
        weight_bands,
    }
}

/// Internal function that actually builds the formulary
fn build_default_formulary_internal() -> Formulary {
    use DoseUnit::*;

    let drugs = vec![
        // ====================================================================
        // Inotropes and vasopressors
        // ====================================================================
        mg_drug(
            "Adrenaline",
            McgPerKgPerMin,
            Some((0.01, 1.0)),
            bands(&[0.3, 1.25], &[0.6, 2.5], &[1.25, 5.0]),
        ),
        mg_drug(
            "Noradrenaline",
            McgPerKgPerMin,
            Some((0.02, 1.0)),
            bands(&[0.3, 1.25], &[0.6, 2.5], &[1.25, 5.0]),
        ),
        mg_drug(
            "Dopamine",
            McgPerKgPerMin,
            Some((7.5, 20.0)),
            bands(&[15.0, 50.0], &[30.0, 100.0], &[75.0, 200.0]),
        ),
        mg_drug(
            "Dobutamine",
            McgPerKgPerMin,
            Some((5.0, 20.0)),
            bands(&[15.0, 50.0], &[30.0, 100.0], &[75.0, 200.0]),
        ),
        mg_drug(
            "Milrinone",
            McgPerKgPerMin,
            Some((0.25, 0.75)),
            bands(&[1.0], &[2.0], &[2.5, 5.0]),
        ),
        // Range set locally by the prescribing team
        mg_drug(
            "Alprostadil",
            McgPerKgPerMin,
            None,
            bands(&[0.05], &[0.1], &[0.25]),
        ),
        // ====================================================================
        // Sedation, analgesia and paralysis
        // ====================================================================
        mg_drug(
            "Rocuronium",
            McgPerKgPerHour,
            Some((300.0, 600.0)),
            bands(&[10.0], &[25.0], &[50.0]),
        ),
        mg_drug(
            "Morphine",
            McgPerKgPerHour,
            Some((10.0, 40.0)),
            bands(&[0.5], &[1.0], &[2.5, 5.0]),
        ),
        mg_drug(
            "Fentanyl",
            McgPerKgPerHour,
            Some((0.5, 4.0)),
            bands(&[0.025], &[0.05], &[0.1, 0.25]),
        ),
        // ====================================================================
        // Insulin: options are units, made up to 50 mL
        // ====================================================================
        DrugProfile {
            name: "Insulin".into(),
            unit: UnitsPerKgPerHour,
            dosing_range: Some(DosingRange::new(0.01, 0.1)),
            concentration_unit: ConcentrationUnit::Units,
            preparation_volume_ml: 50.0,
            weight_bands: bands(&[5.0], &[10.0], &[10.0, 25.0]),
        },
    ];

    Formulary { drugs }
}

impl Formulary {
    /// Build a formulary from profiles, rejecting inconsistent tables
    pub fn new(drugs: Vec<DrugProfile>) -> Result<Self> {
        let formulary = Formulary { drugs };
        let errors = formulary.validate();
        if !errors.is_empty() {
            return Err(Error::FormularyValidation(errors.join("; ")));
        }
        Ok(formulary)
    }

    #[cfg(test)]
    pub(crate) fn new_unchecked(drugs: Vec<DrugProfile>) -> Self {
        Formulary { drugs }
    }

    /// Parse and validate a TOML formulary
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: FormularyFile = toml::from_str(contents)?;
        Self::new(file.drugs)
    }

    /// Load and validate a TOML formulary file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let formulary = Self::from_toml_str(&contents)?;
        tracing::info!(
            "Loaded formulary with {} drugs from {:?}",
            formulary.len(),
            path
        );
        Ok(formulary)
    }

    /// Serialize to the same TOML layout `from_toml_str` reads
    pub fn to_toml_string(&self) -> Result<String> {
        let file = FormularyFile {
            drugs: self.drugs.clone(),
        };
        toml::to_string_pretty(&file)
            .map_err(|e| Error::Other(format!("Failed to serialize formulary: {}", e)))
    }

    /// Exact, case-sensitive lookup by drug name
    pub fn lookup(&self, name: &str) -> Option<&DrugProfile> {
        self.drugs.iter().find(|drug| drug.name == name)
    }

    /// Drug names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drugs.iter().map(|d| d.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Profiles in declaration order
    pub fn profiles(&self) -> &[DrugProfile] {
        &self.drugs
    }

    pub fn len(&self) -> usize {
        self.drugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drugs.is_empty()
    }

    /// Validate the formulary for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.drugs.is_empty() {
            errors.push("Formulary has no drugs".to_string());
        }

        for (idx, drug) in self.drugs.iter().enumerate() {
            let name = &drug.name;

            if name.trim().is_empty() {
                errors.push(format!("Drug #{} has empty name", idx + 1));
            }
            if self.drugs[..idx].iter().any(|d| &d.name == name) {
                errors.push(format!("Duplicate drug '{}'", name));
            }

            if let Some(range) = drug.dosing_range {
                if !range.min.is_finite() || !range.max.is_finite() {
                    errors.push(format!("Drug '{}': dosing range is not finite", name));
                } else if range.min > range.max {
                    errors.push(format!(
                        "Drug '{}': dosing range min {} > max {}",
                        name, range.min, range.max
                    ));
                }
            }

            if !(drug.preparation_volume_ml > 0.0) {
                errors.push(format!(
                    "Drug '{}': preparation volume {} mL must be positive",
                    name, drug.preparation_volume_ml
                ));
            }

            let units_dose = drug.unit.is_unit_based();
            let units_options = drug.concentration_unit == ConcentrationUnit::Units;
            if units_dose != units_options {
                errors.push(format!(
                    "Drug '{}': dose unit {} does not fit {} concentrations",
                    name,
                    drug.unit,
                    drug.concentration_unit.as_str()
                ));
            }

            errors.extend(validate_bands(name, &drug.weight_bands));
        }

        errors
    }
}

/// Bands must tile `[0, ∞)` in declared order with no gap and no overlap
fn validate_bands(drug: &str, bands: &[WeightBand]) -> Vec<String> {
    let mut errors = Vec::new();

    let (first, last) = match (bands.first(), bands.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => {
            errors.push(format!("Drug '{}' has no weight bands", drug));
            return errors;
        }
    };

    if first.min_kg != 0.0 {
        errors.push(format!(
            "Drug '{}': first band '{}' starts at {} kg, not 0",
            drug, first.label, first.min_kg
        ));
    }
    if last.max_kg.is_some() {
        errors.push(format!(
            "Drug '{}': last band '{}' must be open-ended",
            drug, last.label
        ));
    }

    for pair in bands.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        match prev.max_kg {
            None => errors.push(format!(
                "Drug '{}': band '{}' is open-ended but followed by '{}'",
                drug, prev.label, next.label
            )),
            Some(max) if max < next.min_kg => errors.push(format!(
                "Drug '{}': gap between '{}' and '{}' ({} to {} kg)",
                drug, prev.label, next.label, max, next.min_kg
            )),
            Some(max) if max > next.min_kg => errors.push(format!(
                "Drug '{}': bands '{}' and '{}' overlap",
                drug, prev.label, next.label
            )),
            Some(_) => {}
        }
    }

    for band in bands {
        // Only a missing max_kg may be unbounded
        let finite_max = band.max_kg.map_or(true, f64::is_finite);
        if !band.min_kg.is_finite() || !finite_max {
            errors.push(format!(
                "Drug '{}': band '{}' has a non-finite bound",
                drug, band.label
            ));
        }
        if let Some(max) = band.max_kg {
            if max <= band.min_kg {
                errors.push(format!(
                    "Drug '{}': band '{}' is empty ({} to {} kg)",
                    drug, band.label, band.min_kg, max
                ));
            }
        }
        if band.concentration_options.is_empty() {
            errors.push(format!(
                "Drug '{}': band '{}' has no concentration options",
                drug, band.label
            ));
        }
        for option in &band.concentration_options {
            if !(*option > 0.0) || !option.is_finite() {
                errors.push(format!(
                    "Drug '{}': band '{}' has non-positive concentration {}",
                    drug, band.label, option
                ));
            }
        }
    }

    errors
}
