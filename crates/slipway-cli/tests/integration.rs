#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn slipway(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("slipway").unwrap();
    cmd.current_dir(dir.path())
        .env("SLIPWAY_FILE", dir.path().join("slipway.yaml"));
    cmd
}

fn init_stack(dir: &TempDir) {
    slipway(dir).arg("init").assert().success();
}

// ---------------------------------------------------------------------------
// slipway init
// ---------------------------------------------------------------------------

#[test]
fn init_scaffolds_stack_file() {
    let dir = TempDir::new().unwrap();
    // init writes the scaffold even though SLIPWAY_FILE points at a
    // not-yet-existing file.
    slipway(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created"));

    let content = std::fs::read_to_string(dir.path().join("slipway.yaml")).unwrap();
    assert!(content.contains("postgres:15"));
    assert!(content.contains("condition: unit_healthy"));
    assert!(content.contains("${HOST_PORT:-80}"));
}

#[test]
fn init_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    init_stack(&dir);
    slipway(&dir)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

// ---------------------------------------------------------------------------
// slipway config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_accepts_scaffold() {
    let dir = TempDir::new().unwrap();
    init_stack(&dir);
    slipway(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn config_validate_rejects_unknown_dependency() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("slipway.yaml"),
        "name: demo\nunits:\n  app:\n    image: app:latest\n    depends_on:\n      ghost: {}\n",
    )
    .unwrap();
    slipway(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("ghost"));
}

#[test]
fn config_show_resolves_variables() {
    let dir = TempDir::new().unwrap();
    init_stack(&dir);
    slipway(&dir)
        .args(["config", "show"])
        .env("HOST_PORT", "8080")
        .assert()
        .success()
        .stdout(predicate::str::contains("8080:8000"));
}

#[test]
fn config_show_json_output() {
    let dir = TempDir::new().unwrap();
    init_stack(&dir);
    let output = slipway(&dir)
        .args(["--json", "config", "show"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let parsed: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(parsed["name"], "app-stack");
    assert_eq!(parsed["units"]["app"]["ports"][0], "80:8000");
}

// ---------------------------------------------------------------------------
// slipway ps / down
// ---------------------------------------------------------------------------

#[test]
fn ps_without_running_stack() {
    let dir = TempDir::new().unwrap();
    init_stack(&dir);
    slipway(&dir)
        .arg("ps")
        .assert()
        .success()
        .stdout(predicate::str::contains("not running"));
}

#[test]
fn down_without_running_stack() {
    let dir = TempDir::new().unwrap();
    init_stack(&dir);
    slipway(&dir)
        .arg("down")
        .assert()
        .success()
        .stdout(predicate::str::contains("not running"));
}

#[test]
fn ps_reads_runtime_record() {
    let dir = TempDir::new().unwrap();
    init_stack(&dir);
    // A record pointing at this test's own pid reads as running.
    let record = format!(
        "stack: app-stack\nstarted_at: 2026-01-01T00:00:00Z\npids:\n  postgres: {}\n",
        std::process::id()
    );
    std::fs::create_dir_all(dir.path().join(".slipway")).unwrap();
    std::fs::write(dir.path().join(".slipway/runtime.yaml"), record).unwrap();

    slipway(&dir)
        .arg("ps")
        .assert()
        .success()
        .stdout(predicate::str::contains("postgres"))
        .stdout(predicate::str::contains("running"));
}

// ---------------------------------------------------------------------------
// error surfaces
// ---------------------------------------------------------------------------

#[test]
fn missing_stack_file_is_reported() {
    let dir = TempDir::new().unwrap();
    slipway(&dir)
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("stack file not found"));
}
