//! Integration tests for CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("netflix2trakt"));
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("netflix2trakt"));
    cmd.arg("--version");
    cmd.assert().success().stdout(predicate::str::contains("netflix2trakt"));
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("netflix2trakt"));
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Netflix viewing history"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("parse"))
        .stdout(predicate::str::contains("auth"))
        .stdout(predicate::str::contains("config"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn test_config_show_uses_bundled_defaults() {
    let tmp = TempDir::new().expect("tmp");
    cmd(&tmp)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[Trakt]"))
        .stdout(predicate::str::contains("page_size = 50"))
        .stdout(predicate::str::contains("viewing_history_datetime_format = %%d.%%m.%%y"));
}

#[test]
fn test_config_show_merges_overlay_and_redacts_secrets() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(
        tmp.path().join("config.ini"),
        "[TMDB]\napi_key = tmdb-secret-value\n\n[Trakt]\npage_size = 25\n",
    )
    .expect("write");

    cmd(&tmp)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("page_size = 25"))
        .stdout(predicate::str::contains("api_key = <redacted>"))
        .stdout(predicate::str::contains("tmdb-secret-value").not());
}

#[test]
fn test_config_check_rejects_invalid_page_size() {
    let tmp = TempDir::new().expect("tmp");
    let overlay = tmp.path().join("custom.ini");
    fs::write(&overlay, "[Trakt]\npage_size = abc\n").expect("write");

    cmd(&tmp)
        .args(["config", "check", "--config"])
        .arg(&overlay)
        .assert()
        .failure()
        .stderr(predicate::str::contains("page_size"))
        .stderr(predicate::str::contains("abc"));
}

#[test]
fn test_config_check_reports_missing_credentials() {
    let tmp = TempDir::new().expect("tmp");
    cmd(&tmp)
        .args(["config", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration OK"))
        .stdout(predicate::str::contains("Trakt id:        missing"));
}

#[test]
fn test_require_credentials_fails_at_load() {
    let tmp = TempDir::new().expect("tmp");
    cmd(&tmp)
        .args(["--require-credentials", "config", "check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Trakt credentials missing"));
}

#[test]
fn test_require_credentials_allows_import_dry_run() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(tmp.path().join("NetflixViewingHistory.csv"), "Title,Date\nRoma,02.12.18\n").expect("write");

    cmd(&tmp)
        .args(["--require-credentials", "import", "--dry-run", "--no-progress"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("api_key"))
        .stderr(predicate::str::contains("Trakt credentials missing").not());
}

#[test]
fn test_config_path_is_not_read_from_environment() {
    let tmp = TempDir::new().expect("tmp");
    cmd(&tmp)
        .env("NETFLIX2TRAKT_CONFIG", "does-not-exist.ini")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("page_size = 50"));
}

#[test]
fn test_strict_config_rejects_unknown_key() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(tmp.path().join("config.ini"), "[Trakt]\npagesize = 10\n").expect("write");

    cmd(&tmp)
        .args(["config", "check", "--strict-config"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pagesize"));

    cmd(&tmp).args(["config", "check"]).assert().success();
}

#[test]
fn test_missing_explicit_config_names_path() {
    let tmp = TempDir::new().expect("tmp");
    cmd(&tmp)
        .args(["config", "show", "--config", "does-not-exist.ini"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.ini"));
}

#[test]
fn test_parse_prints_history_json() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(
        tmp.path().join("NetflixViewingHistory.csv"),
        "Title,Date\n\"Dark: Season 1: Secrets\",\"01.12.17\"\n\"Roma\",\"02.12.18\"\n",
    )
    .expect("write");

    cmd(&tmp)
        .arg("parse")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tvshows\""))
        .stdout(predicate::str::contains("\"Dark\""))
        .stdout(predicate::str::contains("2018-12-02T20:15:00.00Z"));

    assert!(tmp.path().join("Netflix2TraktImportLog.log").exists());
}

#[test]
fn test_parse_missing_input_fails() {
    let tmp = TempDir::new().expect("tmp");
    cmd(&tmp)
        .args(["parse", "--input", "nope.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.csv"));
}

#[test]
fn test_import_requires_tmdb_key() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(tmp.path().join("NetflixViewingHistory.csv"), "Title,Date\nRoma,02.12.18\n").expect("write");

    cmd(&tmp)
        .args(["import", "--dry-run", "--no-progress"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("api_key"));

    let not_found = fs::read_to_string(tmp.path().join("not_found.csv")).expect("not_found.csv");
    assert_eq!(not_found, "Show,Season,Episode\n");
}

#[test]
fn test_completions_bash() {
    let tmp = TempDir::new().expect("tmp");
    cmd(&tmp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("netflix2trakt"));
}
