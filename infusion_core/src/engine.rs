//! Dosing engine: guardrail checks and infusion arithmetic.
//!
//! Evaluation order:
//! 1. Resolve the drug in the formulary
//! 2. Strict unit check against the profile's unit token
//! 3. Range check (a warning, never a stop)
//! 4. Normalize to a 24-hour total dose
//! 5. Select the weight band
//! 6. Compute volume and rate for every concentration option

use crate::types::*;
use crate::{Error, Formulary, Result};
use serde::{Deserialize, Serialize};

/// Result of evaluating one dose request
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EngineOutcome {
    /// The drug has no formulary entry
    DrugNotFound { drug: String },
    /// The dose unit is not the profile's unit token
    UnitMismatch { drug: String, expected: DoseUnit, given: String },
    /// Dose outside the dosing range; recipes were still computed
    OutOfRange {
        prescription: Prescription,
        range: DosingRange,
    },
    /// Dose within range (or no range defined)
    InRange { prescription: Prescription },
}

impl EngineOutcome {
    /// Computed prescription, if evaluation got that far
    pub fn prescription(&self) -> Option<&Prescription> {
        match self {
            EngineOutcome::OutOfRange { prescription, .. }
            | EngineOutcome::InRange { prescription } => Some(prescription),
            EngineOutcome::DrugNotFound { .. } | EngineOutcome::UnitMismatch { .. } => None,
        }
    }

    /// True for the non-fatal out-of-range warning
    pub fn is_warning(&self) -> bool {
        matches!(self, EngineOutcome::OutOfRange { .. })
    }

    /// True when no recipes could be computed
    pub fn is_rejected(&self) -> bool {
        self.prescription().is_none()
    }

    /// Human-readable error or warning text; `None` for a clean result
    pub fn message(&self) -> Option<String> {
        match self {
            EngineOutcome::DrugNotFound { drug } => {
                Some(format!("Drug '{}' not found in formulary", drug))
            }
            EngineOutcome::UnitMismatch {
                drug,
                expected,
                given,
            } => Some(format!(
                "Invalid dose unit for {}: expected {}, got {}",
                drug, expected, given
            )),
            EngineOutcome::OutOfRange {
                prescription,
                range,
            } => Some(format!(
                "Dose {} {} for {} is outside the allowed range {} {}",
                prescription.dose_value,
                prescription.dose_unit,
                prescription.drug,
                range,
                prescription.dose_unit
            )),
            EngineOutcome::InRange { .. } => None,
        }
    }
}

/// Evaluate a dose request against a formulary
///
/// Guardrail failures come back as an [`EngineOutcome`]. The only `Err` is
/// [`Error::NoMatchingBand`], which means the formulary itself is broken.
pub fn evaluate(formulary: &Formulary, request: &DoseRequest) -> Result<EngineOutcome> {
    let Some(profile) = formulary.lookup(request.drug()) else {
        tracing::debug!("Drug {:?} not in formulary", request.drug());
        return Ok(EngineOutcome::DrugNotFound {
            drug: request.drug().to_string(),
        });
    };

    // Strict token match; no implicit conversions between units
    if request.dose_unit() != profile.unit.as_str() {
        tracing::debug!(
            "Unit mismatch for {}: expected {}, got {}",
            profile.name,
            profile.unit,
            request.dose_unit()
        );
        return Ok(EngineOutcome::UnitMismatch {
            drug: profile.name.clone(),
            expected: profile.unit,
            given: request.dose_unit().to_string(),
        });
    }

    let violated = profile
        .dosing_range
        .filter(|range| !range.contains(request.dose_value()));

    let prescription = compute(profile, request)?;

    match violated {
        Some(range) => {
            tracing::warn!(
                "{} dose {} {} outside range {}",
                profile.name,
                request.dose_value(),
                profile.unit,
                range
            );
            Ok(EngineOutcome::OutOfRange {
                prescription,
                range,
            })
        }
        None => Ok(EngineOutcome::InRange { prescription }),
    }
}

/// Total drug needed over the infusion period
///
/// In micrograms for mcg-based units, in drug units otherwise.
pub fn total_dose(unit: DoseUnit, dose_value: f64, weight_kg: f64) -> f64 {
    let per_hour = if unit.is_per_minute() {
        dose_value * 60.0
    } else {
        dose_value
    };
    per_hour * weight_kg * INFUSION_HOURS
}

/// Volume and rate for one concentration option, unrounded
fn infusion_for(total_dose: f64, concentration: f64, profile: &DrugProfile) -> (f64, f64) {
    let concentration_mass = concentration * profile.concentration_unit.mass_factor();
    let total_volume_ml = total_dose / concentration_mass * profile.preparation_volume_ml;
    (total_volume_ml, total_volume_ml / INFUSION_HOURS)
}

fn compute(profile: &DrugProfile, request: &DoseRequest) -> Result<Prescription> {
    let weight_kg = request.weight_kg();

    let band = profile
        .band_for(weight_kg)
        .ok_or_else(|| Error::NoMatchingBand {
            drug: profile.name.clone(),
            weight_kg,
        })?;

    let total = total_dose(profile.unit, request.dose_value(), weight_kg);
    if !total.is_finite() {
        return Err(Error::InvalidRequest(format!(
            "{} dose {} {} for {} kg is too large to compute",
            profile.name,
            request.dose_value(),
            profile.unit,
            weight_kg
        )));
    }

    tracing::debug!(
        "{}: {} kg -> band {}, total dose {} over {}h",
        profile.name,
        weight_kg,
        band.label,
        total,
        INFUSION_HOURS
    );

    let results = band
        .concentration_options
        .iter()
        .map(|&concentration| {
            let (volume, rate) = infusion_for(total, concentration, profile);
            let result = InfusionResult {
                concentration,
                total_volume_ml: round_to(volume, 2),
                hourly_rate_ml_per_hr: round_to(rate, 2),
            };
            if result.total_volume_ml.is_finite() && result.hourly_rate_ml_per_hr.is_finite() {
                Ok(result)
            } else {
                Err(Error::InvalidRequest(format!(
                    "{} volume at {} {} is too large to compute",
                    profile.name,
                    concentration,
                    profile.concentration_unit.as_str()
                )))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Prescription {
        drug: profile.name.clone(),
        weight_kg,
        dose_value: request.dose_value(),
        dose_unit: profile.unit,
        band_label: band.label.clone(),
        concentration_unit: profile.concentration_unit,
        preparation_volume_ml: profile.preparation_volume_ml,
        total_dose: total,
        results,
    })
}
