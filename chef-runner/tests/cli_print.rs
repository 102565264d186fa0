//! CLI tests for `chef-runner --print`.
//!
//! Spawns the binary against a fixture root and checks the summary text and
//! that the run log is left byte-for-byte untouched.

use std::fs;
use std::process::Command;

use chef_runner::core::types::{RunLog, StatusRecord};
use chef_runner::exit_codes;
use chef_runner::test_support::ChefFixture;

#[test]
fn print_shows_error_tail_and_leaves_log_untouched() {
    let fixture = ChefFixture::new();
    let errors: Vec<String> = (1..=30).map(|i| format!("trace {i}")).collect();
    let mut log = RunLog::new();
    log.insert(
        "sushi-chef-broken",
        StatusRecord::failure(3.0, true, errors.join("\n"), None),
    );
    log.insert("sushi-chef-fine", StatusRecord::success(1.0, false, None));
    fixture.write_log(&log);
    let log_path = fixture.paths().log_path;
    let before = fs::read(&log_path).expect("read log");

    let output = Command::new(env!("CARGO_BIN_EXE_chef-runner"))
        .arg("--print")
        .arg("--root")
        .arg(fixture.root())
        .output()
        .expect("chef-runner --print");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("sushi-chef-broken: false\n"));
    assert!(stdout.contains("sushi-chef-fine: true\n"));
    assert!(stdout.contains("trace 11\n"));
    assert!(stdout.contains("trace 30\n"));
    assert!(!stdout.contains("trace 10\n"));
    assert!(stdout.ends_with("Total runs: 2\nSuccessful runs: 1\n"));
    assert_eq!(fs::read(&log_path).expect("reread log"), before);
}

#[test]
fn print_without_log_reports_zero_runs() {
    let fixture = ChefFixture::new();

    let output = Command::new(env!("CARGO_BIN_EXE_chef-runner"))
        .arg("--print")
        .arg("--root")
        .arg(fixture.root())
        .output()
        .expect("chef-runner --print");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        String::from_utf8(output.stdout).expect("utf8"),
        "Total runs: 0\nSuccessful runs: 0\n"
    );
    assert!(!fixture.paths().log_path.exists());
}

#[test]
fn corrupt_log_fails_with_context() {
    let fixture = ChefFixture::new();
    fs::write(fixture.paths().log_path, "{not json").expect("write log");

    let output = Command::new(env!("CARGO_BIN_EXE_chef-runner"))
        .arg("--print")
        .arg("--root")
        .arg(fixture.root())
        .output()
        .expect("chef-runner --print");

    assert_eq!(output.status.code(), Some(exit_codes::FAILED));
    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("parse run log"));
}
