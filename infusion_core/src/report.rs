//! Rendering of prescriptions for the presentation shell.

use crate::{EngineOutcome, Prescription, Result};
use std::fmt::Write as _;
use std::io;

/// Plain-text table, values to 2 decimals
pub fn render_table(prescription: &Prescription) -> String {
    let mut out = String::new();
    let p = prescription;

    // Writing into a String cannot fail
    let _ = writeln!(out, "Drug:    {}", p.drug);
    let _ = writeln!(out, "Weight:  {} kg (band {})", p.weight_kg, p.band_label);
    let _ = writeln!(out, "Dose:    {} {}", p.dose_value, p.dose_unit);
    let _ = writeln!(
        out,
        "Prepare: {} mL over 24 h",
        p.preparation_volume_ml
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:>16}  {:>12}  {:>12}",
        format!("conc ({})", p.concentration_unit.as_str()),
        "volume mL",
        "rate mL/hr"
    );
    for result in &p.results {
        let _ = writeln!(
            out,
            "{:>16}  {:>12.2}  {:>12.2}",
            result.concentration, result.total_volume_ml, result.hourly_rate_ml_per_hr
        );
    }
    out
}

/// One CSV row per concentration option, with a header
pub fn write_csv<W: io::Write>(prescription: &Prescription, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for result in &prescription.results {
        csv.serialize(result)?;
    }
    csv.flush()?;
    Ok(())
}

/// Pretty JSON of the full outcome, tagged by `outcome`
pub fn to_json(outcome: &EngineOutcome) -> Result<String> {
    Ok(serde_json::to_string_pretty(outcome)?)
}
