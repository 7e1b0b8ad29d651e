//! Binary smoke tests.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("conciliar")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("placa"));
}

#[test]
fn placa_probe_extracts_plate() {
    Command::cargo_bin("conciliar")
        .unwrap()
        .args(["placa", "Placa:BJX 894 KM 9509"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Combustible / Placa: BJX 894"));
}

#[test]
fn placa_probe_reports_km_only_sentinel() {
    Command::cargo_bin("conciliar")
        .unwrap()
        .args(["placa", "KM 9962"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Combustible / Placa: ?"));
}

#[test]
fn placa_probe_reports_fallback() {
    Command::cargo_bin("conciliar")
        .unwrap()
        .args(["placa", "sin informacion util"])
        .assert()
        .success()
        .stdout(predicate::str::contains("detail lines would be used"));
}

#[test]
fn config_init_writes_template() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.json");

    Command::cargo_bin("conciliar")
        .unwrap()
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .success();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("manual_review_limit"));
    assert!(content.contains("combustible_exclusions"));
}

#[test]
fn config_init_refuses_to_overwrite() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("config.json");
    std::fs::write(&path, "{}").unwrap();

    Command::cargo_bin("conciliar")
        .unwrap()
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn run_without_config_fails_with_hint() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("no-config.json");

    Command::cargo_bin("conciliar")
        .unwrap()
        .args(["--config"])
        .arg(&missing)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config init"));
}
