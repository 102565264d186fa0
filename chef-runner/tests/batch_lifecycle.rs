//! Multi-run scenarios for the batch runner.
//!
//! Each test drives `BatchRunner` more than once against the same chefs
//! directory and checks what the persisted run log looks like in between.

use chef_runner::batch::{BatchRunner, BatchStop};
use chef_runner::core::types::{RunLog, StatusRecord};
use chef_runner::io::config::RunnerConfig;
use chef_runner::io::interrupt::CancelToken;
use chef_runner::test_support::{ChefFixture, ScriptedExecutor, StepFailure};

fn run_batch(fixture: &ChefFixture, cfg: &RunnerConfig, executor: &ScriptedExecutor) -> RunLog {
    let mut runner =
        BatchRunner::new(fixture.root(), cfg, executor, CancelToken::new()).expect("runner");
    let outcome = runner.run(|_| {}).expect("run");
    assert_eq!(outcome.stop, BatchStop::Complete);
    runner.log().clone()
}

/// Second run skips what succeeded and retries what failed.
///
/// ```text
/// run 1: a ok, b script fails, c install fails
/// run 2: a skipped (entry dropped), b and c retried and now pass
/// run 3: nothing left to run
/// ```
#[test]
fn reruns_only_retry_unsuccessful_chefs() {
    let fixture = ChefFixture::new();
    fixture.chef("sushi-chef-a").script("sushichef.py");
    fixture.chef("sushi-chef-b").script("sushichef.py");
    fixture
        .chef("sushi-chef-c")
        .requirements()
        .script("sushichef.py");
    let cfg = RunnerConfig::default();

    let first = ScriptedExecutor::succeeding()
        .fail("sushi-chef-b", StepFailure::Script("ImportError\n".to_string()))
        .fail("sushi-chef-c", StepFailure::Requirements);
    let log = run_batch(&fixture, &cfg, &first);
    assert_eq!(log.len(), 3);
    assert!(log.get("sushi-chef-a").expect("a").succeeded);
    assert_eq!(
        log.get("sushi-chef-b").expect("b").errors.as_deref(),
        Some("ImportError\n")
    );
    assert_eq!(log.get("sushi-chef-c").expect("c").errors.as_deref(), Some(""));
    assert_eq!(fixture.read_log(), log);

    let second = ScriptedExecutor::succeeding();
    let log = run_batch(&fixture, &cfg, &second);
    assert_eq!(second.chefs_touched(), vec!["sushi-chef-b", "sushi-chef-c"]);
    assert!(!log.contains("sushi-chef-a"));
    assert_eq!(log.succeeded_count(), 2);

    let third = ScriptedExecutor::succeeding();
    let log = run_batch(&fixture, &cfg, &third);
    assert!(third.calls().is_empty());
    assert!(log.is_empty());
    assert!(fixture.read_log().is_empty());
}

#[test]
fn configured_skip_drops_existing_entry() {
    let fixture = ChefFixture::new();
    fixture.chef("sushi-chef-flaky").script("sushichef.py");
    fixture.chef("sushi-chef-steady").script("sushichef.py");
    let mut log = RunLog::new();
    log.insert(
        "sushi-chef-flaky",
        StatusRecord::failure(12.5, false, "timeout\n".to_string(), None),
    );
    fixture.write_log(&log);

    let cfg = RunnerConfig {
        extra_skip: vec!["sushi-chef-flaky".to_string()],
        ..RunnerConfig::default()
    };
    let executor = ScriptedExecutor::succeeding();
    let log = run_batch(&fixture, &cfg, &executor);

    assert_eq!(executor.chefs_touched(), vec!["sushi-chef-steady"]);
    assert!(!log.contains("sushi-chef-flaky"));
    assert!(fixture.read_log().contains("sushi-chef-steady"));
}

#[test]
fn plain_files_and_foreign_directories_are_ignored() {
    let fixture = ChefFixture::new();
    fixture.chef("tools").script("helperchef.py");
    std::fs::write(fixture.paths().chefs_dir.join("sushi-chef-notes.txt"), "todo")
        .expect("write file");
    let executor = ScriptedExecutor::succeeding();

    let log = run_batch(&fixture, &RunnerConfig::default(), &executor);
    assert!(executor.calls().is_empty());
    assert!(log.is_empty());
    // The final save still writes an (empty) log.
    assert!(fixture.paths().log_path.is_file());
}

#[test]
fn args_survive_repeated_failures() {
    let fixture = ChefFixture::new();
    fixture.chef("sushi-chef-token").script("sushichef.py");
    let mut log = RunLog::new();
    log.insert(
        "sushi-chef-token",
        StatusRecord::failure(
            0.5,
            false,
            String::new(),
            Some(vec!["--token".to_string(), "abc".to_string()]),
        ),
    );
    fixture.write_log(&log);
    let cfg = RunnerConfig::default();

    for _ in 0..2 {
        let executor = ScriptedExecutor::succeeding()
            .fail("sushi-chef-token", StepFailure::Script("401\n".to_string()));
        run_batch(&fixture, &cfg, &executor);
        let calls = executor.calls();
        let last = calls.last().expect("script call");
        assert_eq!(
            last.command.to_string(),
            "run sushichef.py dryrun --token abc"
        );
    }
    let record = fixture
        .read_log()
        .get("sushi-chef-token")
        .cloned()
        .expect("record");
    assert_eq!(record.extra_args(), ["--token", "abc"]);
    assert_eq!(record.has_requirements, Some(false));
}
