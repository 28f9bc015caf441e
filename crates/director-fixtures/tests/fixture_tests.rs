//! Process-level tests for the fixture suites
//!
//! Each test runs `director-fixture` in an empty temporary directory with
//! colors and traces turned off through the environment, and checks the
//! exact output and exit status.

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

/// Command with a clean environment rooted in `dir`
fn fixture(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("director-fixture");
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("TEST_DIRECTOR_TRACE", "0")
        .env("TEST_DIRECTOR_COLOR", "never")
        .env_remove("TEST_DIRECTOR_LOG")
        .env_remove("NO_COLOR")
        .env_remove("FORCE_COLOR")
        .env_remove("RUST_BACKTRACE")
        .env_remove("RUST_LIB_BACKTRACE");
    cmd
}

// ============================================================================
// Suites
// ============================================================================

#[test]
fn test_passes_suite() {
    let dir = TempDir::new().unwrap();

    fixture(&dir)
        .arg("passes")
        .assert()
        .success()
        .stdout("\nTest: a\n\nTest: b\n\n2/2 tests passed.\n\n")
        .stderr("");
}

#[test]
fn test_fails_suite_sets_exit_code() {
    let dir = TempDir::new().unwrap();

    fixture(&dir)
        .arg("fails")
        .assert()
        .code(1)
        .stdout("\nTest: a\n\nTest: b\n")
        .stderr("  \n  Message.\n\n1/2 tests passed.\n\n");
}

#[test]
fn test_nested_suite() {
    let dir = TempDir::new().unwrap();

    fixture(&dir)
        .arg("nested")
        .assert()
        .code(1)
        .stdout("\nTest: nested\n  \n  Test: inner a\n  \n  Test: inner b\n\nTest: after\n")
        .stderr("    \n    Message.\n  \n  1/2 tests passed.\n\n1/2 tests passed.\n\n");
}

#[test]
fn test_awaits_suite_orders_output() {
    let dir = TempDir::new().unwrap();

    fixture(&dir)
        .arg("awaits")
        .assert()
        .success()
        .stdout("\nTest: waits\n  waited\n\nTest: next\n  next\n\n2/2 tests passed.\n\n");
}

#[test]
fn test_output_suite() {
    let dir = TempDir::new().unwrap();

    fixture(&dir)
        .arg("output")
        .assert()
        .code(1)
        .stdout(
            "\nTest: prints\n  line one\n  line two\n\
             \nTest: caused\n\
             \x20\x20\n  Cause:\n\
             \nTest: aggregate\n\
             \x20\x20\n  Aggregate errors:\n\
             \nTest: panics\n",
        )
        .stderr(
            "  to stderr\n\
             \x20\x20\n  Message B.\n\
             \x20\x20\x20\x20\n    Message A.\n\
             \x20\x20\n  Message C.\n\
             \x20\x20\x20\x20\n    Message A.\n\
             \x20\x20\x20\x20\n    \"Message B.\"\n\
             \x20\x20\n  Message.\n\
             \n1/4 tests passed.\n\n",
        );
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_project_config_indent() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("director.toml"), "[output]\nindent = 4\n").unwrap();

    fixture(&dir)
        .arg("fails")
        .assert()
        .code(1)
        .stderr("    \n    Message.\n\n1/2 tests passed.\n\n");
}

#[test]
fn test_explicit_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "[output]\nindent = 0\n").unwrap();

    fixture(&dir)
        .arg("--config")
        .arg(&path)
        .arg("fails")
        .assert()
        .code(1)
        .stderr("\nMessage.\n\n1/2 tests passed.\n\n");
}

#[test]
fn test_invalid_config_reports_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("director.toml"), "[output]\nindent = 40\n").unwrap();

    fixture(&dir)
        .arg("passes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("output.indent"));
}

#[test]
fn test_color_always_styles_summary() {
    let dir = TempDir::new().unwrap();

    fixture(&dir)
        .arg("--color")
        .arg("always")
        .arg("passes")
        .assert()
        .success()
        .stdout(predicate::str::contains("\u{1b}["))
        .stdout(predicate::str::contains("2/2 tests passed."));
}

#[test]
fn test_unknown_color_rejected() {
    let dir = TempDir::new().unwrap();

    fixture(&dir)
        .arg("--color")
        .arg("sometimes")
        .arg("passes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("sometimes"));
}

#[test]
fn test_traces_shown_when_enabled() {
    let dir = TempDir::new().unwrap();

    fixture(&dir)
        .env("TEST_DIRECTOR_TRACE", "1")
        .arg("output")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Message.\n  \n  at "));
}

#[test]
fn test_backtraces_cleaned_of_runtime_frames() {
    let dir = TempDir::new().unwrap();

    fixture(&dir)
        .env("TEST_DIRECTOR_TRACE", "1")
        .env("RUST_BACKTRACE", "1")
        .arg("fails")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("  at director_fixture::suites::fails::"))
        .stderr(predicate::str::contains("/rustc/").not())
        .stderr(predicate::str::contains("__rustc").not())
        .stderr(predicate::str::contains("at std::").not())
        .stderr(predicate::str::contains("at core::").not())
        .stderr(predicate::str::contains("at tokio::").not())
        .stderr(predicate::str::contains("at test_director::").not());
}
