use assert_cmd::Command;
use predicates::prelude::*;

fn tp(config_home: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tp").expect("binary exists");
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env("HOME", config_home.path())
        .env_remove("TICKETPAD_AUTH")
        .env_remove("TICKETPAD_LOG");
    cmd
}

#[test]
fn help_lists_flags_and_subcommand() {
    let dir = tempfile::tempdir().expect("temp dir");
    tp(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("completions"))
        .stdout(predicate::str::contains("--auth"))
        .stdout(predicate::str::contains("--width"));
}

#[test]
fn completions_are_generated() {
    let dir = tempfile::tempdir().expect("temp dir");
    tp(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_tp"));
}

#[test]
fn missing_server_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    tp(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no server given"));
}

#[cfg(target_os = "linux")]
#[test]
fn malformed_config_is_reported_with_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config_dir = dir.path().join("ticketpad");
    std::fs::create_dir_all(&config_dir).expect("create config dir");
    std::fs::write(config_dir.join("config.toml"), "wrap_width = [").expect("write config");

    tp(&dir)
        .arg("https://jira.example.com")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
}
