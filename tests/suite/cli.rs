//! The `lspcheck` binary end to end.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

use crate::common::lspcheck_bin;

/// Write `content` as the only config file of a fresh directory.
fn config_file(content: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lspcheck.toml");
    fs::write(&path, content).unwrap();
    (dir, path)
}

fn lspcheck(config: &Path, args: &[&str]) -> Output {
    Command::new(lspcheck_bin())
        .arg("--config")
        .arg(config)
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Repository root, which holds the shipped fixtures.
fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
}

#[test]
fn list_prints_selected_names() {
    let (_dir, config) = config_file("");
    let output = lspcheck(&config, &["--list", "-t", "textDocument_definition*"]);

    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "textDocument_definition\ntextDocument_definition_imports\n"
    );
}

#[test]
fn list_uses_pattern_from_config() {
    let (_dir, config) = config_file("[suite]\ntest_pattern = \"publish_*\"\n");
    let output = lspcheck(&config, &["--list"]);

    let names: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(
        names,
        [
            "publish_diagnostics_errors",
            "publish_diagnostics_errors_multiline",
            "publish_diagnostics_warnings",
        ]
    );
}

#[test]
fn missing_config_file_is_setup_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = lspcheck(&dir.path().join("absent.toml"), &["--list"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("does not exist"), "{}", stderr(&output));
}

#[test]
fn unknown_config_key_is_setup_failure() {
    let (_dir, config) = config_file("[server]\ncomand = \"solc\"\n");
    let output = lspcheck(&config, &["--list"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("parsing"), "{}", stderr(&output));
}

#[test]
fn invalid_pattern_is_setup_failure() {
    let (_dir, config) = config_file("");
    let output = lspcheck(&config, &["--list", "-t", "publish_["]);

    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("invalid test pattern"),
        "{}",
        stderr(&output)
    );
}

#[test]
fn missing_fixture_directory_is_setup_failure() {
    let (dir, config) = config_file("");
    let root = dir.path().to_string_lossy().into_owned();
    let output = lspcheck(&config, &["solc", &root]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(
        stderr(&output).contains("opening fixtures"),
        "{}",
        stderr(&output)
    );
}

/// The mock reports every `unused*` identifier as 2072, so the first
/// diagnostic (expected 6321) fails and the run exits with 1.
#[test]
fn failing_case_sets_exit_status() {
    let mock = env!("CARGO_BIN_EXE_lspcheck-mockls");
    let (_dir, config) = config_file(&format!(
        "[server]\ncommand = '{mock}'\nargs = []\ndiagnostics_timeout_ms = 10000\n\n\
         [suite]\nproject_root = '{}'\n",
        project_root().display()
    ));
    let output = lspcheck(&config, &["-t", "publish_diagnostics_warnings"]);
    let out = stdout(&output);

    assert_eq!(output.status.code(), Some(1), "{}", stderr(&output));
    assert!(out.contains("Testing publish_diagnostics_warnings ..."), "{out}");
    assert!(out.contains("diagnostic: 6321"), "{out}");
    assert!(out.contains("Test cases: 0 passed, 1 failed"), "{out}");
    assert!(out.contains("Assertions: 3 passed, 1 failed"), "{out}");
}

#[test]
fn fail_fast_flag_limits_the_run() {
    let mock = env!("CARGO_BIN_EXE_lspcheck-mockls");
    let (_dir, config) = config_file(&format!(
        "[server]\nargs = []\ndiagnostics_timeout_ms = 10000\n\n\
         [suite]\nproject_root = '{}'\n",
        project_root().display()
    ));
    // The positional server overrides the config's `solc`.
    let output = lspcheck(&config, &[mock, "-f", "-t", "publish_diagnostics_*"]);
    let out = stdout(&output);

    assert!(!output.status.success());
    assert_eq!(out.matches("Testing ").count(), 1, "{out}");
    assert!(out.contains("Test cases: 0 passed, 1 failed"), "{out}");
}
