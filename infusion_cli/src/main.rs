use clap::{Parser, Subcommand};
use infusion_core::report::{render_table, to_json, write_csv};
use infusion_core::*;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Exit status when the engine rejects a request (unknown drug, wrong unit).
/// Usage errors, invalid requests and bad files exit with 1.
const EXIT_REJECTED: u8 = 2;

#[derive(Parser)]
#[command(name = "infuse")]
#[command(about = "Infusion prescriber: dose guardrails and pump rates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Formulary TOML file replacing the built-in table
    #[arg(long, global = true)]
    formulary: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a dose and compute infusion recipes
    Calc {
        /// Drug name (exact, case-sensitive)
        #[arg(long)]
        drug: String,

        /// Patient weight in kg
        #[arg(long, allow_negative_numbers = true)]
        weight: f64,

        /// Prescribed dose
        #[arg(long, allow_negative_numbers = true)]
        dose: f64,

        /// Dose unit (mcg/kg/min, mcg/kg/hr, units/kg/hr)
        #[arg(long)]
        unit: String,

        /// Output format (table, json, csv)
        #[arg(long)]
        format: Option<OutputFormat>,
    },

    /// List drugs in the active formulary
    Drugs,

    /// Validate a formulary file (defaults to the active formulary)
    Check {
        /// File to check
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Print the built-in formulary as TOML
    Export,
}

fn main() -> ExitCode {
    infusion_core::logging::init();

    // Clap exits with 2 on its own; keep 2 for rejected requests only
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let override_path = cli.formulary.as_deref();

    match cli.command {
        Commands::Calc {
            drug,
            weight,
            dose,
            unit,
            format,
        } => {
            let formulary = config.load_formulary(override_path)?;
            tracing::debug!("Using formulary with {} drugs", formulary.len());
            let format = format.unwrap_or(config.output.format);
            let request = DoseRequest::new(&drug, weight, dose, &unit)?;
            cmd_calc(&formulary, &request, format)
        }
        Commands::Drugs => {
            let formulary = config.load_formulary(override_path)?;
            cmd_drugs(&formulary);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { file } => cmd_check(&config, file.as_deref().or(override_path)),
        Commands::Export => {
            print!("{}", build_default_formulary().to_toml_string()?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn cmd_calc(
    formulary: &Formulary,
    request: &DoseRequest,
    format: OutputFormat,
) -> Result<ExitCode> {
    let outcome = evaluate(formulary, request)?;

    if format == OutputFormat::Json {
        println!("{}", to_json(&outcome)?);
    } else {
        if let Some(message) = outcome.message() {
            let prefix = if outcome.is_warning() { "warning" } else { "error" };
            eprintln!("{}: {}", prefix, message);
        }
        if let Some(prescription) = outcome.prescription() {
            match format {
                OutputFormat::Csv => write_csv(prescription, io::stdout())?,
                _ => print!("{}", render_table(prescription)),
            }
        }
    }

    if outcome.is_rejected() {
        Ok(ExitCode::from(EXIT_REJECTED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn cmd_drugs(formulary: &Formulary) {
    for name in formulary.names() {
        let Some(drug) = formulary.lookup(name) else {
            continue;
        };
        let range = drug
            .dosing_range
            .map(|r| format!("{} {}", r, drug.unit))
            .unwrap_or_else(|| "no range".into());
        println!("{} ({}; {})", drug.name, drug.unit, range);
        for band in &drug.weight_bands {
            let options: Vec<String> = band
                .concentration_options
                .iter()
                .map(|c| c.to_string())
                .collect();
            println!(
                "  {:<8} {} {} in {} mL",
                band.label,
                options.join(" / "),
                drug.concentration_unit.as_str(),
                drug.preparation_volume_ml
            );
        }
    }
}

fn cmd_check(config: &Config, file: Option<&Path>) -> Result<ExitCode> {
    let formulary = config.load_formulary(file)?;

    let errors = formulary.validate();
    if !errors.is_empty() {
        eprintln!("Formulary validation errors:");
        for error in &errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::FormularyValidation(format!(
            "{} problem(s) found",
            errors.len()
        )));
    }

    println!("✓ Formulary OK ({} drugs)", formulary.len());
    Ok(ExitCode::SUCCESS)
}
