//! CLI command integration tests.
//! Each test points the config at a temp directory for full isolation.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn linkpet_cmd(dir: &TempDir) -> Command {
    let config = dir.path().join("linkpet.toml");
    if !config.exists() {
        let db = dir.path().join("linkpet.db");
        std::fs::write(
            &config,
            format!("[database]\npath = \"{}\"\n", db.display()),
        )
        .unwrap();
    }

    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("linkpet").unwrap();
    cmd.arg("--config").arg(&config);
    cmd
}

#[test]
fn stats_fresh_db() {
    let dir = TempDir::new().unwrap();
    linkpet_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("pets:     0"))
        .stdout(predicate::str::contains("memories: 0"))
        .stdout(predicate::str::contains("diaries:  0"));
}

#[test]
fn sweep_empty_db() {
    let dir = TempDir::new().unwrap();
    linkpet_cmd(&dir)
        .arg("sweep")
        .assert()
        .success()
        .stdout(predicate::str::contains("swept 0 pets"));
}

#[test]
fn sweep_then_stats_share_database() {
    let dir = TempDir::new().unwrap();

    linkpet_cmd(&dir).arg("sweep").assert().success();

    // The sweep created the database file; stats reads the same one.
    linkpet_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("pets:     0"));
    assert!(dir.path().join("linkpet.db").exists());
}

#[test]
fn missing_subcommand_shows_usage() {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("linkpet").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("broken.toml");
    std::fs::write(&config, "[database\npath = 3").unwrap();

    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("linkpet").unwrap();
    cmd.arg("--config")
        .arg(&config)
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid config"));
}
