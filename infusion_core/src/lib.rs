#![forbid(unsafe_code)]

//! Core domain model and dosing logic for the Infusion Prescriber.
//!
//! This crate provides:
//! - Domain types (dose units, weight bands, drug profiles, results)
//! - Formulary management (built-in table, TOML loading, validation)
//! - Dosing engine (guardrail checks and infusion arithmetic)
//! - Report rendering (table, CSV, JSON)

pub mod types;
pub mod error;
pub mod formulary;
pub mod config;
pub mod logging;
pub mod engine;
pub mod report;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use formulary::{build_default_formulary, default_formulary, Formulary};
pub use config::{Config, OutputFormat};
pub use engine::{evaluate, EngineOutcome};
