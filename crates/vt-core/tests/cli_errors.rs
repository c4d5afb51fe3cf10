//! CLI tests for the vegtrend binary.
//!
//! These tests verify that invalid arguments, unusable inputs and empty
//! results produce the documented exit codes, and that successful runs
//! print the requested format on stdout.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const ENV_VARS: [&str; 9] = [
    "VT_DATA_DIR",
    "VT_OBSERVATIONS",
    "VT_DESCRIPTIONS",
    "VT_PROFILES",
    "VT_ABUNDANCE_WEIGHTS",
    "VT_INDICATOR_VALUES",
    "VT_SPECIES_ALIASES",
    "VT_CONFIG",
    "RUST_LOG",
];

/// A vegtrend command isolated from the caller's environment: data and
/// config lookups land in an empty home directory.
fn vegtrend(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vegtrend").expect("vegtrend binary should exist");
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("HOME", home.path())
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("VT_LOG", "warn");
    cmd
}

/// Data directory with every standard file.
fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let files = [
        (
            "observations.csv",
            "description_id,source_file,species,abundance_class\n\
             1,a,Carex acuta,3\n1,a,Poa palustris,1\n2,a,Carex acuta,1\n",
        ),
        (
            "descriptions.csv",
            "description_id,source_file,year,projective_cover\n1,a,2019,40\n2,a,2019,60\n",
        ),
        ("profiles.csv", "profile_id,source_file,impact_type\nP1,a,upper dam\n"),
        ("abundance_weights.csv", "code,weight\n1,1\n3,3\n"),
        ("indicator_values.csv", "Taxon,M\nCarex acuta,4\nPoa palustris,2\n"),
        ("species_aliases.csv", "raw_species,canonical_species\n"),
    ];
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ============================================================================
// Argument errors (10)
// ============================================================================

mod arguments {
    use super::*;

    #[test]
    fn unknown_command_fails() {
        let home = TempDir::new().unwrap();
        vegtrend(&home)
            .arg("nonexistent-command")
            .assert()
            .code(10)
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn bad_metric_spec_fails() {
        let home = TempDir::new().unwrap();
        vegtrend(&home)
            .args(["aggregate", "--metric", "median:projective_cover"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("unknown metric type"));
    }

    #[test]
    fn bad_level_fails() {
        let home = TempDir::new().unwrap();
        vegtrend(&home)
            .args(["aggregate", "--level", "plot"])
            .assert()
            .code(10);
    }

    #[test]
    fn help_succeeds() {
        let home = TempDir::new().unwrap();
        vegtrend(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("ecospectrum"));
    }
}

// ============================================================================
// Structural, registry and config errors
// ============================================================================

mod failures {
    use super::*;

    #[test]
    fn missing_observations_is_config_error() {
        let home = TempDir::new().unwrap();
        vegtrend(&home)
            .arg("aggregate")
            .assert()
            .code(13)
            .stderr(predicate::str::contains("observations.csv"));
    }

    #[test]
    fn unknown_filter_op_is_structural() {
        let home = TempDir::new().unwrap();
        let data = data_dir();
        vegtrend(&home)
            .arg("--data-dir")
            .arg(data.path())
            .args(["aggregate", "--filters", r#"{"year": {"gt": 2000}}"#])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("unknown filter op"));
    }

    #[test]
    fn missing_groupby_column_is_structural() {
        let home = TempDir::new().unwrap();
        let data = data_dir();
        vegtrend(&home)
            .arg("--data-dir")
            .arg(data.path())
            .args(["-f", "md", "aggregate", "--groupby", "site"])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("missing required column: site"))
            .stderr(predicate::str::contains("hint:"));
    }

    #[test]
    fn duplicated_profile_is_registry_error() {
        let home = TempDir::new().unwrap();
        let data = data_dir();
        fs::write(
            data.path().join("profiles.csv"),
            "profile_id,source_file,impact_type\nP1,a,dam\nP2,a,natural\n",
        )
        .unwrap();
        vegtrend(&home)
            .arg("--data-dir")
            .arg(data.path())
            .arg("aggregate")
            .assert()
            .code(12);
    }

    #[test]
    fn unknown_eco_metric_in_scenario_is_config_error() {
        let home = TempDir::new().unwrap();
        let data = data_dir();
        let scenario = data.path().join("bad.toml");
        fs::write(
            &scenario,
            "name = \"bad\"\nanalysis = \"ecospectrum\"\neco_metrics = [\"skew\"]\n",
        )
        .unwrap();
        vegtrend(&home)
            .arg("--data-dir")
            .arg(data.path())
            .arg("run")
            .arg(&scenario)
            .assert()
            .code(13)
            .stderr(predicate::str::contains("skew"));
    }

    #[test]
    fn empty_result_exits_one() {
        let home = TempDir::new().unwrap();
        let data = data_dir();
        vegtrend(&home)
            .arg("--data-dir")
            .arg(data.path())
            .args(["aggregate", "--filters", r#"{"year": 1990}"#])
            .assert()
            .code(1);
    }
}

// ============================================================================
// Successful runs
// ============================================================================

mod success {
    use super::*;

    #[test]
    fn aggregate_json_envelope() {
        let home = TempDir::new().unwrap();
        let data = data_dir();
        let output = vegtrend(&home)
            .arg("--data-dir")
            .arg(data.path())
            .args(["aggregate", "--groupby", "year", "--metric", "mean:projective_cover"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(0));

        let json = stdout_json(&output);
        assert_eq!(json["name"], "aggregate");
        assert_eq!(json["rows"][0]["year"], 2019);
        assert_eq!(json["rows"][0]["mean_projective_cover"], 50.0);
        assert_eq!(json["rows"][0]["n_descriptions"], 2);
    }

    #[test]
    fn ecospectrum_csv() {
        let home = TempDir::new().unwrap();
        let data = data_dir();
        vegtrend(&home)
            .arg("--data-dir")
            .arg(data.path())
            .args(["-f", "csv", "ecospectrum", "--stat", "cwm,n_rows_used"])
            .assert()
            .success()
            // unit 1: (3*4 + 1*2)/4 = 3.5, unit 2: 4 -> 3.75
            .stdout(predicate::str::starts_with("year,cwm,n_rows_used\n2019,3.75,1.5\n"));
    }

    #[test]
    fn scenario_file_runs() {
        let home = TempDir::new().unwrap();
        let data = data_dir();
        let scenario = data.path().join("carex.json");
        fs::write(
            &scenario,
            r#"{
                "name": "carex_presence",
                "level": "species",
                "groupby": ["impact_type"],
                "metrics": [{"type": "presence", "species": "Poa palustris", "out": "poa"}]
            }"#,
        )
        .unwrap();
        let output = vegtrend(&home)
            .arg("--data-dir")
            .arg(data.path())
            .arg("run")
            .arg(&scenario)
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(0));

        let json = stdout_json(&output);
        assert_eq!(json["name"], "carex_presence");
        assert_eq!(json["rows"][0]["impact_type"], "upper dam");
        assert_eq!(json["rows"][0]["poa"], 0.5);
    }

    #[test]
    fn check_reports_every_file() {
        let home = TempDir::new().unwrap();
        let data = data_dir();
        let output = vegtrend(&home)
            .arg("--data-dir")
            .arg(data.path())
            .arg("check")
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(0));

        let json = stdout_json(&output);
        let rows = json["rows"].as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r["status"] == "ok"));
        assert_eq!(rows[0]["file"], "observations.csv");
        assert_eq!(rows[0]["entries"], 3);
    }

    #[test]
    fn check_without_data_is_config_error() {
        let home = TempDir::new().unwrap();
        vegtrend(&home)
            .arg("check")
            .assert()
            .code(13)
            .stdout(predicate::str::contains("not configured"));
    }

    #[test]
    fn version_prints() {
        let home = TempDir::new().unwrap();
        vegtrend(&home)
            .args(["-f", "md", "version"])
            .assert()
            .success()
            .stdout(predicate::str::starts_with("vegtrend "));
    }
}
