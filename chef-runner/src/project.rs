//! Install-then-dry-run pipeline for a single chef.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::script::ScriptLookup;
use crate::core::types::StatusRecord;
use crate::io::config::RunnerConfig;
use crate::io::executor::{EnvCommand, ExecOutcome, ExecRequest, Executor};
use crate::io::interrupt::CancelToken;
use crate::io::scripts::ScriptMatcher;

/// Everything needed to process any chef, resolved once per batch.
#[derive(Debug, Clone)]
pub struct PipelinePlan {
    pub manifest_file: String,
    pub venv_dir: String,
    pub script_matcher: ScriptMatcher,
    pub dry_run_arg: String,
    /// Absolute path of the content pipeline library.
    pub pipeline_library: PathBuf,
    pub optional_packages: Vec<String>,
    pub upgrade_packages: Vec<String>,
    pub step_timeout: Option<Duration>,
    pub stderr_limit_bytes: usize,
}

impl PipelinePlan {
    pub fn from_config(root: &Path, cfg: &RunnerConfig) -> Result<Self> {
        Ok(Self {
            manifest_file: cfg.manifest_file.clone(),
            venv_dir: cfg.venv_dir.clone(),
            script_matcher: ScriptMatcher::new(&cfg.script_pattern)?,
            dry_run_arg: cfg.dry_run_arg.clone(),
            pipeline_library: root.join(&cfg.tool.pipeline_library),
            optional_packages: cfg.tool.optional_packages.clone(),
            upgrade_packages: cfg.tool.upgrade_packages.clone(),
            step_timeout: cfg.step_timeout_secs.map(Duration::from_secs),
            stderr_limit_bytes: cfg.stderr_limit_bytes,
        })
    }

    /// Install commands in execution order, given whether a manifest exists.
    pub fn install_commands(&self, has_requirements: bool) -> Vec<EnvCommand> {
        let mut commands = Vec::new();
        if has_requirements {
            commands.push(EnvCommand::InstallRequirements {
                manifest: PathBuf::from(&self.manifest_file),
            });
        }
        commands.push(EnvCommand::InstallEditable {
            path: self.pipeline_library.clone(),
        });
        commands.extend(
            self.optional_packages
                .iter()
                .map(|name| EnvCommand::InstallPackage {
                    name: name.clone(),
                    upgrade: false,
                }),
        );
        commands.extend(
            self.upgrade_packages
                .iter()
                .map(|name| EnvCommand::InstallPackage {
                    name: name.clone(),
                    upgrade: true,
                }),
        );
        commands
    }

    fn request(&self, chef_dir: &Path, command: EnvCommand) -> ExecRequest {
        ExecRequest {
            workdir: chef_dir.to_path_buf(),
            command,
            timeout: self.step_timeout,
            stderr_limit_bytes: self.stderr_limit_bytes,
        }
    }
}

/// Result of [`process_chef`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectOutcome {
    /// The pipeline ran to its end (successfully or not).
    Finished(StatusRecord),
    /// Cancellation was observed; nothing should be recorded for this chef.
    Interrupted,
}

/// A terminal Ctrl-C also reaches the child, which can fail before the
/// watcher flips the cancel token.
const INTERRUPT_GRACE: Duration = Duration::from_millis(100);

/// Install a chef's dependencies and dry-run its entry script.
///
/// Steps run in order and the first failure skips the rest. Only a failing
/// entry script contributes error text. `args` from the previous record is
/// appended after the dry-run flag and carried into the new record.
///
/// Problems confined to this chef (an unusable `.venv` path, an unreadable
/// directory) are recorded as failures rather than returned as errors.
#[instrument(skip_all, fields(chef = %chef_dir.display()))]
pub fn process_chef<E: Executor>(
    chef_dir: &Path,
    plan: &PipelinePlan,
    executor: &E,
    args: Option<&[String]>,
    cancel: &CancelToken,
) -> ProjectOutcome {
    let has_requirements = chef_dir.join(&plan.manifest_file).is_file();
    let stored_args = args.map(<[String]>::to_vec);
    let mut start = Instant::now();
    let failed_without_errors = |start: Instant, carried_args| {
        ProjectOutcome::Finished(StatusRecord::failure(
            start.elapsed().as_secs_f64(),
            has_requirements,
            String::new(),
            carried_args,
        ))
    };

    let venv = chef_dir.join(&plan.venv_dir);
    if let Err(err) = fs::create_dir_all(&venv) {
        warn!(err = %err, venv = %venv.display(), "cannot create environment directory");
        return failed_without_errors(start, stored_args);
    }
    start = Instant::now();

    for command in plan.install_commands(has_requirements) {
        let outcome = exec_step(executor, plan.request(chef_dir, command));
        if interrupted_after(&outcome, cancel) {
            return ProjectOutcome::Interrupted;
        }
        if !outcome.success {
            warn!("failed to install dependencies");
            return failed_without_errors(start, stored_args);
        }
    }

    let script = match plan.script_matcher.lookup(chef_dir) {
        Ok(ScriptLookup::Found(script)) => script,
        Ok(ScriptLookup::Missing) => {
            warn!("no entry script found");
            return failed_without_errors(start, stored_args);
        }
        Ok(ScriptLookup::Ambiguous(candidates)) => {
            warn!(?candidates, "several entry scripts found");
            return failed_without_errors(start, stored_args);
        }
        Err(err) => {
            warn!(err = %format!("{err:#}"), "cannot look up entry script");
            return failed_without_errors(start, stored_args);
        }
    };

    let mut script_args = vec![plan.dry_run_arg.clone()];
    script_args.extend(args.unwrap_or_default().iter().cloned());
    let outcome = exec_step(
        executor,
        plan.request(
            chef_dir,
            EnvCommand::RunScript {
                script,
                args: script_args,
            },
        ),
    );
    if interrupted_after(&outcome, cancel) {
        return ProjectOutcome::Interrupted;
    }
    let elapsed = start.elapsed().as_secs_f64();

    let record = if outcome.success {
        info!(elapsed, "dry run succeeded");
        StatusRecord::success(elapsed, has_requirements, stored_args)
    } else {
        info!(elapsed, "dry run failed");
        StatusRecord::failure(
            elapsed,
            has_requirements,
            outcome.stderr.unwrap_or_default(),
            stored_args,
        )
    };
    ProjectOutcome::Finished(record)
}

/// A failed step waits briefly for a pending interrupt before it counts.
fn interrupted_after(outcome: &ExecOutcome, cancel: &CancelToken) -> bool {
    if outcome.success {
        cancel.is_cancelled()
    } else {
        cancel.cancelled_within(INTERRUPT_GRACE)
    }
}

/// Run one step. A tool that cannot be started counts as a failed step.
fn exec_step<E: Executor>(executor: &E, request: ExecRequest) -> ExecOutcome {
    match executor.exec(&request) {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(err = %format!("{err:#}"), command = %request.command, "step could not run");
            ExecOutcome::failed(None)
        }
    }
}
