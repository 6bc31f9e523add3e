//! Core domain types for the Infusion Prescriber.
//!
//! This module defines the fundamental types used throughout the system:
//! - Dose and concentration units
//! - Dosing ranges and weight bands
//! - Drug profiles (one formulary entry)
//! - Dose requests and computed infusion results

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed infusion period every recipe is prepared for
pub const INFUSION_HOURS: f64 = 24.0;

/// Milligrams to micrograms
pub const MCG_PER_MG: f64 = 1000.0;

/// Round `value` to `decimals` places
///
/// Ties round half away from zero (`f64::round`), so 0.125 becomes 0.13.
/// Python's `round` rounds ties to even and would give 0.12; exact ties are
/// rare after the float arithmetic above and the difference is 0.01 mL.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

// ============================================================================
// Units
// ============================================================================

/// Known dose unit tokens
///
/// Matching is token-for-token: `"mcg/kg/hour"` is not `"mcg/kg/hr"`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DoseUnit {
    #[serde(rename = "mcg/kg/min")]
    McgPerKgPerMin,
    #[serde(rename = "mcg/kg/hr")]
    McgPerKgPerHour,
    #[serde(rename = "units/kg/hr")]
    UnitsPerKgPerHour,
}

impl DoseUnit {
    pub const ALL: [DoseUnit; 3] = [
        DoseUnit::McgPerKgPerMin,
        DoseUnit::McgPerKgPerHour,
        DoseUnit::UnitsPerKgPerHour,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DoseUnit::McgPerKgPerMin => "mcg/kg/min",
            DoseUnit::McgPerKgPerHour => "mcg/kg/hr",
            DoseUnit::UnitsPerKgPerHour => "units/kg/hr",
        }
    }

    /// True for `…/min` rates, which are scaled ×60 to a per-hour rate
    pub fn is_per_minute(&self) -> bool {
        self.as_str().ends_with("/min")
    }

    /// True when the mass component is drug units rather than micrograms
    pub fn is_unit_based(&self) -> bool {
        matches!(self, DoseUnit::UnitsPerKgPerHour)
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoseUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DoseUnit::ALL
            .iter()
            .find(|unit| unit.as_str() == s)
            .copied()
            .ok_or_else(|| Error::InvalidRequest(format!("Unknown dose unit '{}'", s)))
    }
}

/// What a concentration option measures
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConcentrationUnit {
    /// Milligrams of drug per preparation; doses are in micrograms
    #[default]
    Mg,
    /// Drug units per preparation (Insulin); used as-is
    Units,
}

impl ConcentrationUnit {
    /// Factor converting one option into the dose's mass unit
    pub fn mass_factor(&self) -> f64 {
        match self {
            ConcentrationUnit::Mg => MCG_PER_MG,
            ConcentrationUnit::Units => 1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConcentrationUnit::Mg => "mg",
            ConcentrationUnit::Units => "units",
        }
    }
}

// ============================================================================
// Formulary entry types
// ============================================================================

/// Inclusive bounds on an accepted dose, in the profile's unit
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DosingRange {
    pub min: f64,
    pub max: f64,
}

impl DosingRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, dose: f64) -> bool {
        dose >= self.min && dose <= self.max
    }
}

impl fmt::Display for DosingRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// A weight partition with its candidate concentrations
///
/// Covers `[min_kg, max_kg)`; a missing `max_kg` is open-ended.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeightBand {
    pub label: String,
    #[serde(default)]
    pub min_kg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_kg: Option<f64>,
    pub concentration_options: Vec<f64>,
}

impl WeightBand {
    pub fn new(label: &str, min_kg: f64, max_kg: Option<f64>, options: &[f64]) -> Self {
        Self {
            label: label.into(),
            min_kg,
            max_kg,
            concentration_options: options.to_vec(),
        }
    }

    /// Band predicate
    pub fn matches(&self, weight_kg: f64) -> bool {
        weight_kg >= self.min_kg && self.max_kg.map_or(true, |max| weight_kg < max)
    }
}

fn default_preparation_volume_ml() -> f64 {
    25.0
}

/// One formulary entry
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DrugProfile {
    pub name: String,
    pub unit: DoseUnit,
    #[serde(default)]
    pub concentration_unit: ConcentrationUnit,
    /// Syringe/bag size every option is made up to
    #[serde(default = "default_preparation_volume_ml")]
    pub preparation_volume_ml: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosing_range: Option<DosingRange>,
    #[serde(rename = "weight_band")]
    pub weight_bands: Vec<WeightBand>,
}

impl DrugProfile {
    /// First band, in declared order, whose predicate accepts the weight
    pub fn band_for(&self, weight_kg: f64) -> Option<&WeightBand> {
        self.weight_bands.iter().find(|band| band.matches(weight_kg))
    }
}

// ============================================================================
// Request and result types
// ============================================================================

/// One dose calculation request
///
/// Construct with [`DoseRequest::new`], which checks the numeric inputs and
/// rounds the weight to 4 decimals.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DoseRequest {
    drug: String,
    weight_kg: f64,
    dose_value: f64,
    dose_unit: String,
}

impl DoseRequest {
    pub fn new(drug: &str, weight_kg: f64, dose_value: f64, dose_unit: &str) -> Result<Self> {
        if !weight_kg.is_finite() || weight_kg <= 0.0 {
            return Err(Error::InvalidRequest(format!(
                "Weight must be a positive number of kg, got {}",
                weight_kg
            )));
        }
        if !dose_value.is_finite() || dose_value <= 0.0 {
            return Err(Error::InvalidRequest(format!(
                "Dose must be a positive number, got {}",
                dose_value
            )));
        }

        // Rounding scales by 1e4 first, which overflows for huge weights
        let rounded_weight = round_to(weight_kg, 4);
        if !rounded_weight.is_finite() {
            return Err(Error::InvalidRequest(format!(
                "Weight {} kg is too large",
                weight_kg
            )));
        }

        Ok(Self {
            drug: drug.into(),
            weight_kg: rounded_weight,
            dose_value,
            dose_unit: dose_unit.into(),
        })
    }

    pub fn drug(&self) -> &str {
        &self.drug
    }

    pub fn weight_kg(&self) -> f64 {
        self.weight_kg
    }

    pub fn dose_value(&self) -> f64 {
        self.dose_value
    }

    pub fn dose_unit(&self) -> &str {
        &self.dose_unit
    }
}

/// One computed recipe for a concentration option
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct InfusionResult {
    pub concentration: f64,
    pub total_volume_ml: f64,
    pub hourly_rate_ml_per_hr: f64,
}

/// A fully computed prescription: the request echoed back plus recipes
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    pub drug: String,
    pub weight_kg: f64,
    pub dose_value: f64,
    pub dose_unit: DoseUnit,
    pub band_label: String,
    pub concentration_unit: ConcentrationUnit,
    pub preparation_volume_ml: f64,
    /// Unrounded 24-hour total, in micrograms (or units)
    pub total_dose: f64,
    pub results: Vec<InfusionResult>,
}
