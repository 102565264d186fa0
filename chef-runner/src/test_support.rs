//! Test-only helpers: chef directory fixtures and a scripted executor.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};

use crate::core::types::RunLog;
use crate::io::config::RunnerConfig;
use crate::io::executor::{EnvCommand, ExecOutcome, ExecRequest, Executor};
use crate::io::interrupt::CancelToken;
use crate::io::layout::ChefPaths;
use crate::io::run_log::{load_run_log, write_run_log};

/// Temporary invocation root with an empty `chefs/` directory.
pub struct ChefFixture {
    temp: tempfile::TempDir,
}

impl ChefFixture {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("chefs")).expect("create chefs dir");
        Self { temp }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn paths(&self) -> ChefPaths {
        ChefPaths::new(self.root(), &RunnerConfig::default())
    }

    /// Create (or reuse) `chefs/<name>`.
    pub fn chef(&self, name: &str) -> ChefBuilder {
        let dir = self.paths().chef_dir(name);
        fs::create_dir_all(&dir).expect("create chef dir");
        ChefBuilder { dir }
    }

    pub fn write_log(&self, log: &RunLog) {
        write_run_log(&self.paths().log_path, log).expect("write run log");
    }

    pub fn read_log(&self) -> RunLog {
        load_run_log(&self.paths().log_path).expect("load run log")
    }
}

impl Default for ChefFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Populates a chef directory.
pub struct ChefBuilder {
    dir: PathBuf,
}

impl ChefBuilder {
    pub fn requirements(self) -> Self {
        fs::write(self.dir.join("requirements.txt"), "ricecooker\n").expect("write manifest");
        self
    }

    pub fn script(self, file_name: &str) -> Self {
        fs::write(self.dir.join(file_name), "print('chef')\n").expect("write script");
        self
    }

    pub fn dir(self) -> PathBuf {
        self.dir
    }
}

/// Step at which a scripted chef fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    Requirements,
    Editable,
    OptionalPackage,
    UpgradePackage,
    /// Entry script exits non-zero with this stderr.
    Script(String),
}

impl StepFailure {
    fn matches(&self, command: &EnvCommand) -> bool {
        matches!(
            (self, command),
            (StepFailure::Requirements, EnvCommand::InstallRequirements { .. })
                | (StepFailure::Editable, EnvCommand::InstallEditable { .. })
                | (
                    StepFailure::OptionalPackage,
                    EnvCommand::InstallPackage { upgrade: false, .. }
                )
                | (
                    StepFailure::UpgradePackage,
                    EnvCommand::InstallPackage { upgrade: true, .. }
                )
                | (StepFailure::Script(_), EnvCommand::RunScript { .. })
        )
    }
}

/// One executor invocation seen by [`ScriptedExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Chef directory name.
    pub chef: String,
    pub command: EnvCommand,
}

/// Executor that succeeds unless a failure was scripted for the chef.
#[derive(Default)]
pub struct ScriptedExecutor {
    failures: HashMap<String, StepFailure>,
    calls: RefCell<Vec<RecordedCall>>,
    cancel_on_first_call: Option<CancelToken>,
    unstartable: bool,
}

impl ScriptedExecutor {
    pub fn succeeding() -> Self {
        Self::default()
    }

    /// Every call fails as if the tool were not installed.
    pub fn unstartable() -> Self {
        Self {
            unstartable: true,
            ..Self::default()
        }
    }

    pub fn fail(mut self, chef: &str, failure: StepFailure) -> Self {
        self.failures.insert(chef.to_string(), failure);
        self
    }

    /// Simulate an interrupt arriving while the first step runs.
    pub fn cancel_on_first_call(mut self, token: CancelToken) -> Self {
        self.cancel_on_first_call = Some(token);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    /// Chef names in the order they were first touched.
    pub fn chefs_touched(&self) -> Vec<String> {
        let mut chefs: Vec<String> = Vec::new();
        for call in self.calls.borrow().iter() {
            if chefs.last() != Some(&call.chef) {
                chefs.push(call.chef.clone());
            }
        }
        chefs
    }
}

impl Executor for ScriptedExecutor {
    fn exec(&self, request: &ExecRequest) -> Result<ExecOutcome> {
        let chef = request
            .workdir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.calls.borrow_mut().push(RecordedCall {
            chef: chef.clone(),
            command: request.command.clone(),
        });
        if let Some(token) = &self.cancel_on_first_call {
            token.cancel();
        }
        if self.unstartable {
            return Err(anyhow!("spawn command: tool not found"));
        }
        match self.failures.get(&chef) {
            Some(failure) if failure.matches(&request.command) => {
                let stderr = match failure {
                    StepFailure::Script(stderr) => Some(stderr.clone()),
                    _ => None,
                };
                Ok(ExecOutcome::failed(stderr))
            }
            _ => Ok(ExecOutcome::ok()),
        }
    }
}
