mod common;

use common::standupd_bin;
use predicates::str::contains;

#[test]
fn version_flag_prints_version() {
    standupd_bin()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn help_flag_prints_usage() {
    standupd_bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("Usage: standupd"));
}

#[test]
fn unknown_argument_is_rejected() {
    standupd_bin()
        .arg("--bogus")
        .assert()
        .code(2)
        .stderr(contains("Unknown argument"));
}

#[test]
fn missing_config_fails_at_startup() {
    let dir = tempfile::TempDir::new().unwrap();
    standupd_bin().current_dir(dir.path()).assert().failure();
}

#[test]
fn incomplete_config_fails_validation() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.toml"),
        r#"
[provider]
api_key = "sk-test"

[slack]
app_token = ""
bot_token = "xoxb-1"
"#,
    )
    .unwrap();

    standupd_bin()
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(contains("app_token"));
}
