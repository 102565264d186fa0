//! Run log storage (`chefs/run_logs.json`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::debug;

use crate::core::types::RunLog;

/// Indent used by existing run log files.
const INDENT: &[u8] = b"    ";

/// Load the run log. A missing file is an empty log.
pub fn load_run_log(path: &Path) -> Result<RunLog> {
    if !path.exists() {
        debug!(path = %path.display(), "no run log yet");
        return Ok(RunLog::new());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read run log {}", path.display()))?;
    let log: RunLog = serde_json::from_str(&contents)
        .with_context(|| format!("parse run log {}", path.display()))?;
    debug!(path = %path.display(), entries = log.len(), "run log loaded");
    Ok(log)
}

/// Atomically rewrite the whole run log (temp file + rename).
pub fn write_run_log(path: &Path, log: &RunLog) -> Result<()> {
    debug!(path = %path.display(), entries = log.len(), "saving run log");
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    log.serialize(&mut serializer)
        .context("serialize run log")?;
    buf.push(b'\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("run log path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp run log {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace run log {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::StatusRecord;

    #[test]
    fn missing_file_loads_empty() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = load_run_log(&temp.path().join("run_logs.json")).expect("load");
        assert!(log.is_empty());
    }

    /// Ensures the written file keeps the four-space layout of older logs.
    #[test]
    fn written_log_is_pretty_with_four_space_indent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("run_logs.json");
        let mut log = RunLog::new();
        log.insert("sushi-chef-a", StatusRecord::success(1.5, true, None));

        write_run_log(&path, &log).expect("write");
        let contents = fs::read_to_string(&path).expect("read");
        let expected = "{\n    \"sushi-chef-a\": {\n        \"succeeded\": true,\n        \"elapsed\": 1.5,\n        \"has_requirements\": true\n    }\n}\n";
        assert_eq!(contents, expected);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn unknown_args_survive_reload() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("run_logs.json");
        fs::write(
            &path,
            r#"{"sushi-chef-x": {"succeeded": false, "elapsed": 3.0, "has_requirements": true, "errors": "", "args": ["--token", "abc"]}}"#,
        )
        .expect("seed");

        let log = load_run_log(&path).expect("load");
        write_run_log(&path, &log).expect("write");
        let reloaded = load_run_log(&path).expect("reload");
        assert_eq!(
            reloaded.get("sushi-chef-x").expect("entry").extra_args(),
            ["--token", "abc"]
        );
    }

    #[test]
    fn corrupt_log_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("run_logs.json");
        fs::write(&path, "not json").expect("seed");
        let err = load_run_log(&path).expect_err("corrupt");
        assert!(format!("{err:#}").contains("parse run log"));
    }
}
