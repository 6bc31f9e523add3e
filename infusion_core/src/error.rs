//! Error types for the infusion_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for infusion_core operations
///
/// Dosing guardrail failures (unknown drug, unit mismatch, out-of-range dose)
/// are not errors; they are reported through [`crate::EngineOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Formulary validation error
    #[error("Formulary validation error: {0}")]
    FormularyValidation(String),

    /// Dose request rejected before evaluation
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No weight band covers the weight; the formulary is misconfigured
    #[error("No weight band for {drug} matches {weight_kg} kg (formulary misconfigured)")]
    NoMatchingBand { drug: String, weight_kg: f64 },

    /// Generic error
    #[error("{0}")]
    Other(String),
}
