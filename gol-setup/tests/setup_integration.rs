//! Integration tests for gol-setup

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct TestEnv {
    _temp_dir: TempDir,
    config_path: PathBuf,
    db_path: PathBuf,
}

fn setup_test_env() -> TestEnv {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config").join("config.toml");
    let db_path = temp_dir.path().join("data").join("golazo.db");
    TestEnv {
        _temp_dir: temp_dir,
        config_path,
        db_path,
    }
}

impl TestEnv {
    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("gol-setup").unwrap();
        cmd.env("GOLAZO_CONFIG", &self.config_path)
            .env_remove("GOLAZO_DB_PATH");
        cmd
    }

    fn init(&self, extra: &[&str]) {
        self.cmd()
            .arg("init")
            .arg("--db")
            .arg(&self.db_path)
            .args(extra)
            .assert()
            .success();
    }
}

#[test]
fn test_init_writes_config_with_profile() {
    let env = setup_test_env();

    env.cmd()
        .args(["init", "--city", "Rosario", "--football-type", "f7"])
        .args(["--name", "Ana Pérez", "--role", "coach"])
        .arg("--db")
        .arg(&env.db_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration written to"))
        .stdout(predicate::str::contains("Profile:"));

    let content = fs::read_to_string(&env.config_path).unwrap();
    let value: toml::Value = toml::from_str(&content).unwrap();
    assert_eq!(
        value["database"]["path"].as_str(),
        Some(env.db_path.to_str().unwrap())
    );
    assert_eq!(value["defaults"]["city"].as_str(), Some("Rosario"));
    assert_eq!(value["defaults"]["football_type"].as_str(), Some("f7"));
    assert!(value["profile"]["user_id"].as_str().is_some());
    assert!(env.db_path.exists());
}

#[test]
fn test_init_refuses_to_overwrite() {
    let env = setup_test_env();
    env.init(&[]);

    env.cmd()
        .arg("init")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("already exists"));

    env.cmd()
        .args(["init", "--force", "--city", "Córdoba"])
        .arg("--db")
        .arg(&env.db_path)
        .assert()
        .success();
    let content = fs::read_to_string(&env.config_path).unwrap();
    assert!(content.contains("Córdoba"));
}

#[test]
fn test_show_json_includes_profile() {
    let env = setup_test_env();
    env.init(&["--name", "Carlos", "--role", "spectator"]);

    let output = env
        .cmd()
        .args(["show", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["profile"]["name"], "Carlos");
    assert_eq!(json["profile"]["role"], "spectator");
    assert_eq!(json["tournament"]["points_win"], 3);
}

#[test]
fn test_show_without_profile() {
    let env = setup_test_env();
    env.init(&[]);

    env.cmd()
        .arg("show")
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile:  none"));
}

#[test]
fn test_profile_switch_and_clear() {
    let env = setup_test_env();
    env.init(&[]);

    env.cmd()
        .args(["profile", "--name", "Lucía"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Acting as Lucía (coach"));
    assert!(fs::read_to_string(&env.config_path)
        .unwrap()
        .contains("[profile]"));

    env.cmd()
        .args(["profile", "--user", "no-such-user"])
        .assert()
        .failure()
        .code(3);

    env.cmd()
        .args(["profile", "--clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Profile cleared"));
    assert!(!fs::read_to_string(&env.config_path)
        .unwrap()
        .contains("[profile]"));
}

#[test]
fn test_preferences() {
    let env = setup_test_env();
    env.init(&["--name", "Marta"]);

    env.cmd()
        .args(["preferences", "--notifications", "off", "--language", "pt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("notifications: off"))
        .stdout(predicate::str::contains("language: pt"));

    env.cmd()
        .args(["preferences", "--language", "português"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("two-letter"));
}

#[test]
fn test_preferences_need_a_profile() {
    let env = setup_test_env();
    env.init(&[]);

    env.cmd()
        .args(["preferences", "--dark-mode", "on"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("no profile configured"));
}

#[test]
fn test_invalid_format_rejected() {
    let env = setup_test_env();
    env.init(&[]);

    env.cmd()
        .args(["show", "--format", "xml"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("Invalid format"));
}
