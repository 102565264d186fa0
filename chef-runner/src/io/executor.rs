//! Executor abstraction for environment-tool invocations.
//!
//! The [`Executor`] trait decouples the per-chef pipeline from the actual
//! environment tool (currently `pipenv`). Tests use scripted executors that
//! return predetermined outcomes without spawning processes.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::io::process::{StderrMode, run_command};

/// One invocation of the environment tool inside a chef directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvCommand {
    /// Install the chef's own dependency manifest.
    InstallRequirements { manifest: PathBuf },
    /// Install a local package in editable mode.
    InstallEditable { path: PathBuf },
    /// Install a named package, optionally forcing an upgrade.
    InstallPackage { name: String, upgrade: bool },
    /// Run the entry script. `args` includes the dry-run flag.
    RunScript { script: PathBuf, args: Vec<String> },
}

impl EnvCommand {
    /// Arguments passed to the environment tool.
    pub fn tool_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        match self {
            EnvCommand::InstallRequirements { manifest } => {
                args.extend(["install", "--skip-lock", "-r"].map(OsString::from));
                args.push(manifest.clone().into_os_string());
            }
            EnvCommand::InstallEditable { path } => {
                args.extend(["run", "pip", "install", "-e"].map(OsString::from));
                args.push(path.clone().into_os_string());
            }
            EnvCommand::InstallPackage { name, upgrade } => {
                args.extend(["run", "pip", "install"].map(OsString::from));
                if *upgrade {
                    args.push(OsString::from("-U"));
                }
                args.push(OsString::from(name));
            }
            EnvCommand::RunScript { script, args: extra } => {
                args.extend(["run", "python"].map(OsString::from));
                args.push(script.clone().into_os_string());
                args.extend(extra.iter().map(OsString::from));
            }
        }
        args
    }

    /// Only the entry script's diagnostics are kept in the run log.
    pub fn captures_stderr(&self) -> bool {
        matches!(self, EnvCommand::RunScript { .. })
    }
}

impl fmt::Display for EnvCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvCommand::InstallRequirements { manifest } => {
                write!(f, "install requirements {}", manifest.display())
            }
            EnvCommand::InstallEditable { path } => write!(f, "install -e {}", path.display()),
            EnvCommand::InstallPackage { name, upgrade: true } => write!(f, "upgrade {name}"),
            EnvCommand::InstallPackage { name, upgrade: false } => write!(f, "install {name}"),
            EnvCommand::RunScript { script, args } => {
                write!(f, "run {} {}", script.display(), args.join(" "))
            }
        }
    }
}

/// Parameters for an executor invocation.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Chef directory; the child runs with this as its working directory.
    pub workdir: PathBuf,
    pub command: EnvCommand,
    /// Kill the child after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Keep at most this many bytes of captured stderr.
    pub stderr_limit_bytes: usize,
}

/// Result of one environment-tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    pub success: bool,
    /// Captured stderr, present only for a failed entry-script run.
    pub stderr: Option<String>,
}

impl ExecOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            stderr: None,
        }
    }

    pub fn failed(stderr: Option<String>) -> Self {
        Self {
            success: false,
            stderr,
        }
    }
}

/// Abstraction over environment-tool backends.
///
/// `Err` means the tool could not be started at all; a tool that ran and
/// exited non-zero is `Ok` with `success = false`.
pub trait Executor {
    fn exec(&self, request: &ExecRequest) -> Result<ExecOutcome>;
}

/// Executor that spawns the configured environment tool (`pipenv` by default).
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    program: String,
}

impl ToolExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Executor for ToolExecutor {
    #[instrument(skip_all, fields(program = %self.program, command = %request.command))]
    fn exec(&self, request: &ExecRequest) -> Result<ExecOutcome> {
        info!(workdir = %request.workdir.display(), "starting step");
        let mut cmd = Command::new(&self.program);
        cmd.args(request.command.tool_args())
            .current_dir(&request.workdir);

        let stderr_mode = if request.command.captures_stderr() {
            StderrMode::Capture {
                limit: request.stderr_limit_bytes,
            }
        } else {
            StderrMode::Inherit
        };
        let output = run_command(cmd, stderr_mode, request.timeout)
            .with_context(|| format!("run {} {}", self.program, request.command))?;

        if output.success() {
            debug!("step completed successfully");
            return Ok(ExecOutcome::ok());
        }
        warn!(exit_code = ?output.status.code(), timed_out = output.timed_out, "step failed");
        let stderr = request
            .command
            .captures_stderr()
            .then(|| output.stderr_text(request.timeout));
        Ok(ExecOutcome::failed(stderr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(command: &EnvCommand) -> Vec<String> {
        command
            .tool_args()
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn requirements_install_skips_lock() {
        let command = EnvCommand::InstallRequirements {
            manifest: PathBuf::from("requirements.txt"),
        };
        assert_eq!(
            args(&command),
            vec!["install", "--skip-lock", "-r", "requirements.txt"]
        );
        assert!(!command.captures_stderr());
    }

    #[test]
    fn editable_and_upgrade_installs_go_through_pip() {
        let editable = EnvCommand::InstallEditable {
            path: PathBuf::from("/src/ricecooker"),
        };
        assert_eq!(
            args(&editable),
            vec!["run", "pip", "install", "-e", "/src/ricecooker"]
        );

        let upgrade = EnvCommand::InstallPackage {
            name: "GitPython".to_string(),
            upgrade: true,
        };
        assert_eq!(args(&upgrade), vec!["run", "pip", "install", "-U", "GitPython"]);
    }

    #[test]
    fn script_run_appends_extra_args() {
        let command = EnvCommand::RunScript {
            script: PathBuf::from("sushi_chef.py"),
            args: vec!["dryrun".to_string(), "--lang=fr".to_string()],
        };
        assert_eq!(
            args(&command),
            vec!["run", "python", "sushi_chef.py", "dryrun", "--lang=fr"]
        );
        assert!(command.captures_stderr());
        assert_eq!(command.to_string(), "run sushi_chef.py dryrun --lang=fr");
    }

    #[cfg(unix)]
    #[test]
    fn tool_executor_captures_script_stderr_on_failure() {
        let temp = tempfile::tempdir().expect("tempdir");
        // `sh run python <script> ...` runs a shell script named `run`.
        std::fs::write(temp.path().join("run"), "echo \"bad $2\" >&2\nexit 2\n").expect("script");
        let request = ExecRequest {
            workdir: temp.path().to_path_buf(),
            command: EnvCommand::RunScript {
                script: PathBuf::from("sushi_chef.py"),
                args: vec!["dryrun".to_string()],
            },
            timeout: None,
            stderr_limit_bytes: 1024,
        };

        let outcome = ToolExecutor::new("sh").exec(&request).expect("exec");
        assert_eq!(outcome, ExecOutcome::failed(Some("bad sushi_chef.py\n".to_string())));
    }

    #[cfg(unix)]
    #[test]
    fn tool_executor_does_not_capture_install_stderr() {
        let temp = tempfile::tempdir().expect("tempdir");
        std::fs::write(temp.path().join("install"), "exit 1\n").expect("script");
        let request = ExecRequest {
            workdir: temp.path().to_path_buf(),
            command: EnvCommand::InstallRequirements {
                manifest: PathBuf::from("requirements.txt"),
            },
            timeout: None,
            stderr_limit_bytes: 1024,
        };

        let outcome = ToolExecutor::new("sh").exec(&request).expect("exec");
        assert_eq!(outcome, ExecOutcome::failed(None));
    }

    #[test]
    fn missing_tool_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let request = ExecRequest {
            workdir: temp.path().to_path_buf(),
            command: EnvCommand::InstallPackage {
                name: "pyppeteer".to_string(),
                upgrade: false,
            },
            timeout: None,
            stderr_limit_bytes: 1024,
        };
        assert!(
            ToolExecutor::new("definitely-not-a-real-tool-xyz")
                .exec(&request)
                .is_err()
        );
    }
}
