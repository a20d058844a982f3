//! Smoke tests -- verify the binary runs and the subcommands are wired up.

use assert_cmd::Command;
use std::io::Write;

fn data_file(lines: &[&str]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

#[test]
fn test_cli_help() {
    Command::cargo_bin("blockstats")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("Block-parallel descriptive statistics"));
}

#[test]
fn test_cli_version() {
    Command::cargo_bin("blockstats")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::contains("blockstats"));
}

#[test]
fn test_run_subcommand_exists() {
    Command::cargo_bin("blockstats")
        .unwrap()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicates::str::contains("--block-size"));
}

#[test]
fn test_devices_lists_scalar_reference() {
    Command::cargo_bin("blockstats")
        .unwrap()
        .arg("devices")
        .assert()
        .success()
        .stdout(predicates::str::contains("Scalar CPU reference"));
}

#[test]
fn test_run_prints_summary() {
    let file = data_file(&[
        "BOURNE 2013 1 1 0 5.0",
        "BOURNE 2013 1 1 100 1.0",
        "BOURNE 2013 1 1 200 9.0",
        "BOURNE 2013 1 1 300 3.0",
    ]);
    Command::cargo_bin("blockstats")
        .unwrap()
        .args(["run", "--block-size", "2", "--backend", "scalar", "--input"])
        .arg(file.path())
        .env_remove("BLOCKSTATS_CONFIG")
        .assert()
        .success()
        .stdout(predicates::str::contains("Total Number of Records:\t4"))
        .stdout(predicates::str::contains("Min:\t1\tMax:\t9"))
        .stdout(predicates::str::contains("Median:\t4\t"));
}

#[test]
fn test_run_json_output() {
    let file = data_file(&[
        "A 2000 1 1 0 2.0",
        "A 2000 1 1 100 2.0",
        "A 2000 1 1 200 2.0",
        "A 2000 1 1 300 2.0",
        "A 2000 1 1 400 2.0",
    ]);
    let output = Command::cargo_bin("blockstats")
        .unwrap()
        .args(["run", "--json", "--merge", "linear", "--block-size", "4", "--input"])
        .arg(file.path())
        .env_remove("BLOCKSTATS_CONFIG")
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["record_count"], 5);
    assert_eq!(json["std_dev"], 0.0);
    assert_eq!(json["merge"], "linear");
}

#[test]
fn test_run_too_few_records_fails() {
    let file = data_file(&["A 2000 1 1 0 2.0"]);
    Command::cargo_bin("blockstats")
        .unwrap()
        .args(["run", "--input"])
        .arg(file.path())
        .env_remove("BLOCKSTATS_CONFIG")
        .assert()
        .failure()
        .stderr(predicates::str::contains("insufficient data"));
}

#[test]
fn test_run_missing_file_fails() {
    Command::cargo_bin("blockstats")
        .unwrap()
        .args(["run", "--input", "/nonexistent/blockstats/data.txt"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("failed to read data file"));
}

#[test]
fn test_run_on_listed_device() {
    let file = data_file(&[
        "A 2000 1 1 0 5.0",
        "A 2000 1 1 100 1.0",
        "A 2000 1 1 200 9.0",
        "A 2000 1 1 300 3.0",
    ]);
    let output = Command::cargo_bin("blockstats")
        .unwrap()
        .args(["run", "--json", "--device", "1", "--block-size", "2", "--input"])
        .arg(file.path())
        .env_remove("BLOCKSTATS_CONFIG")
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["backend"], "parallel");
    assert_eq!(json["timings"][5]["stage"], "done");
}

#[test]
fn test_run_unknown_device_fails() {
    let file = data_file(&["A 2000 1 1 0 2.0"]);
    Command::cargo_bin("blockstats")
        .unwrap()
        .args(["run", "-d", "9", "--input"])
        .arg(file.path())
        .env_remove("BLOCKSTATS_CONFIG")
        .assert()
        .failure()
        .stderr(predicates::str::contains("no device with index 9"));
}
