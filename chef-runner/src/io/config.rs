//! Runner configuration stored in `chef-runner.toml` at the invocation root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Config file name looked up in the invocation root when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "chef-runner.toml";

/// Runner configuration (TOML).
///
/// Every field is optional in the file; missing fields take the values the
/// batch has always used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Directory holding one subdirectory per chef, relative to the root.
    pub chefs_dir: PathBuf,

    /// Run log file name inside `chefs_dir`.
    pub log_file: String,

    /// Only entries starting with this prefix are chefs.
    pub name_prefix: String,

    /// Dependency manifest looked up in each chef directory.
    pub manifest_file: String,

    /// Per-chef environment directory, created before installing.
    pub venv_dir: String,

    /// Glob matched against file names in the chef directory.
    pub script_pattern: String,

    /// First argument passed to the entry script.
    pub dry_run_arg: String,

    /// Chef names skipped in addition to the built-in lists.
    pub extra_skip: Vec<String>,

    /// Kill a step that runs longer than this. Unset means wait forever.
    pub step_timeout_secs: Option<u64>,

    /// Keep at most this many bytes of entry-script stderr.
    pub stderr_limit_bytes: usize,

    pub tool: ToolConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolConfig {
    /// Environment tool executable (e.g. `pipenv`).
    pub program: String,

    /// Content pipeline library installed in editable mode, relative to the root.
    pub pipeline_library: PathBuf,

    /// Installed after the pipeline library. Failure still stops the chef.
    pub optional_packages: Vec<String>,

    /// Force-upgraded after the optional packages.
    pub upgrade_packages: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "pipenv".to_string(),
            pipeline_library: PathBuf::from("ricecooker"),
            optional_packages: vec!["pyppeteer".to_string()],
            // Older GitPython pins in chef requirements are broken.
            upgrade_packages: vec!["GitPython".to_string()],
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            chefs_dir: PathBuf::from("chefs"),
            log_file: "run_logs.json".to_string(),
            name_prefix: "sushi-chef".to_string(),
            manifest_file: "requirements.txt".to_string(),
            venv_dir: ".venv".to_string(),
            script_pattern: "*chef.py".to_string(),
            dry_run_arg: "dryrun".to_string(),
            extra_skip: Vec::new(),
            step_timeout_secs: None,
            stderr_limit_bytes: 1_000_000,
            tool: ToolConfig::default(),
        }
    }
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name_prefix.trim().is_empty() {
            return Err(anyhow!("name_prefix must be non-empty"));
        }
        if self.log_file.trim().is_empty() {
            return Err(anyhow!("log_file must be non-empty"));
        }
        if self.script_pattern.trim().is_empty() {
            return Err(anyhow!("script_pattern must be non-empty"));
        }
        if self.manifest_file.trim().is_empty() || self.venv_dir.trim().is_empty() {
            return Err(anyhow!("manifest_file and venv_dir must be non-empty"));
        }
        if self.step_timeout_secs == Some(0) {
            return Err(anyhow!("step_timeout_secs must be > 0 when set"));
        }
        if self.stderr_limit_bytes == 0 {
            return Err(anyhow!("stderr_limit_bytes must be > 0"));
        }
        if self.tool.program.trim().is_empty() {
            return Err(anyhow!("tool.program must be non-empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RunnerConfig::default()`.
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        let cfg = RunnerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunnerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}
