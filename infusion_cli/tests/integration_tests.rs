//! Integration tests for the infuse binary.
//!
//! These tests verify end-to-end behavior including:
//! - Dose calculation output in each format
//! - Exit codes for rejected requests and warnings
//! - Formulary overrides, export and validation

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to create a test directory holding an empty config
fn setup_test_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("config.toml"), "").expect("Failed to write config");
    dir
}

/// Helper to get the CLI binary, isolated from the user's config
fn cli(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("infuse"));
    cmd.arg("--config").arg(dir.path().join("config.toml"));
    cmd
}

fn calc(dir: &TempDir, drug: &str, weight: &str, dose: &str, unit: &str) -> Command {
    let mut cmd = cli(dir);
    cmd.args([
        "calc", "--drug", drug, "--weight", weight, "--dose", dose, "--unit", unit,
    ]);
    cmd
}

#[test]
fn test_cli_help() {
    let dir = setup_test_dir();
    cli(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Infusion prescriber"));
}

#[test]
fn test_calc_prints_table() {
    let dir = setup_test_dir();
    calc(&dir, "Adrenaline", "3", "0.1", "mcg/kg/min")
        .assert()
        .success()
        .stdout(predicate::str::contains("8.64"))
        .stdout(predicate::str::contains("0.36"))
        .stdout(predicate::str::contains("≥2.5kg"));
}

#[test]
fn test_calc_csv() {
    let dir = setup_test_dir();
    calc(&dir, "Adrenaline", "3", "0.1", "mcg/kg/min")
        .args(["--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "concentration,total_volume_ml,hourly_rate_ml_per_hr\n1.25,8.64,0.36\n",
        ));
}

#[test]
fn test_calc_json() {
    let dir = setup_test_dir();
    let output = calc(&dir, "Dopamine", "3", "25", "mcg/kg/min")
        .args(["--format", "json"])
        .output()
        .expect("Failed to run infuse");
    assert!(output.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(value["outcome"], "out_of_range");
    assert_eq!(value["range"]["min"], 7.5);
    assert_eq!(value["prescription"]["results"][0]["concentration"], 75.0);
    assert_eq!(value["prescription"]["results"][1]["concentration"], 200.0);
}

#[test]
fn test_out_of_range_warns_but_succeeds() {
    let dir = setup_test_dir();
    calc(&dir, "Dopamine", "3", "25", "mcg/kg/min")
        .assert()
        .success()
        .stderr(predicate::str::contains("warning"))
        .stdout(predicate::str::contains("36.00"));
}

#[test]
fn test_unknown_drug_is_rejected() {
    let dir = setup_test_dir();
    calc(&dir, "Xyzocaine", "3", "1", "mcg/kg/min")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("not found"))
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_unit_mismatch_is_rejected() {
    let dir = setup_test_dir();
    calc(&dir, "Rocuronium", "3", "400", "mcg/kg/min")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expected mcg/kg/hr"));
}

#[test]
fn test_zero_weight_is_invalid() {
    let dir = setup_test_dir();
    calc(&dir, "Adrenaline", "0", "0.1", "mcg/kg/min")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Weight must be a positive"));
}

#[test]
fn test_config_selects_output_format() {
    let dir = setup_test_dir();
    fs::write(dir.path().join("config.toml"), "[output]\nformat = \"csv\"\n").unwrap();

    calc(&dir, "Adrenaline", "3", "0.1", "mcg/kg/min")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("concentration,"));
}

#[test]
fn test_drugs_lists_formulary() {
    let dir = setup_test_dir();
    cli(&dir)
        .arg("drugs")
        .assert()
        .success()
        .stdout(predicate::str::contains("Insulin (units/kg/hr"))
        .stdout(predicate::str::contains("Rocuronium (mcg/kg/hr"));
}

#[test]
fn test_export_then_check() {
    let dir = setup_test_dir();
    let output = cli(&dir).arg("export").output().expect("Failed to run infuse");
    assert!(output.status.success());

    let path = dir.path().join("formulary.toml");
    fs::write(&path, &output.stdout).unwrap();

    cli(&dir)
        .arg("check")
        .arg("--file")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("10 drugs"));
}

#[test]
fn test_check_reports_invalid_formulary() {
    let dir = setup_test_dir();
    let path = dir.path().join("broken.toml");
    fs::write(
        &path,
        r#"
[[drug]]
name = "Gapamine"
unit = "mcg/kg/hr"

[[drug.weight_band]]
label = "<1kg"
max_kg = 1.0
concentration_options = [1.0]

[[drug.weight_band]]
label = ">=2kg"
min_kg = 2.0
concentration_options = [1.0]
"#,
    )
    .unwrap();

    cli(&dir)
        .arg("check")
        .arg("--file")
        .arg(&path)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("gap"));
}

#[test]
fn test_custom_formulary_override() {
    let dir = setup_test_dir();
    let path = dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
[[drug]]
name = "Heparin"
unit = "units/kg/hr"
concentration_unit = "units"
preparation_volume_ml = 50.0

[[drug.weight_band]]
label = "all"
concentration_options = [1000.0]
"#,
    )
    .unwrap();

    // 20 * 5 * 24 = 2400 units; / 1000 * 50 = 120 mL; 5 mL/hr
    calc(&dir, "Heparin", "5", "20", "units/kg/hr")
        .arg("--formulary")
        .arg(&path)
        .args(["--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1000.0,120.0,5.0"));

    calc(&dir, "Adrenaline", "3", "0.1", "mcg/kg/min")
        .arg("--formulary")
        .arg(&path)
        .assert()
        .code(2);
}

#[test]
fn test_negative_weight_is_invalid() {
    let dir = setup_test_dir();
    calc(&dir, "Adrenaline", "-3", "0.1", "mcg/kg/min")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Weight must be a positive"));
}

#[test]
fn test_unparseable_weight_is_a_usage_error() {
    let dir = setup_test_dir();
    calc(&dir, "Adrenaline", "abc", "0.1", "mcg/kg/min")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--weight"));
}

#[test]
fn test_huge_weight_is_invalid() {
    let dir = setup_test_dir();
    calc(&dir, "Adrenaline", "1e305", "0.1", "mcg/kg/min")
        .args(["--format", "json"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("too large"));
}

#[test]
fn test_check_validates_builtin_formulary() {
    let dir = setup_test_dir();
    cli(&dir)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Formulary OK (10 drugs)"));
}
