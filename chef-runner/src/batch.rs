//! Resumable batch over every chef in the chefs directory.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::core::classifier::{Decision, SkipReason, classify_entry};
use crate::core::skip_lists::SkipLists;
use crate::core::types::{RunLog, StatusRecord};
use crate::io::config::RunnerConfig;
use crate::io::executor::Executor;
use crate::io::interrupt::CancelToken;
use crate::io::layout::{ChefPaths, list_entries};
use crate::io::run_log::{load_run_log, write_run_log};
use crate::project::{PipelinePlan, ProjectOutcome, process_chef};

/// Progress notifications emitted while the batch runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BatchEvent<'a> {
    Skipped {
        name: &'a str,
        reason: SkipReason,
    },
    Started {
        name: &'a str,
    },
    Finished {
        name: &'a str,
        record: &'a StatusRecord,
    },
}

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStop {
    /// Every entry was visited.
    Complete,
    /// Cancellation was observed; the in-flight chef was not recorded.
    Interrupted,
}

/// Counters for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    pub processed: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
    pub stop: BatchStop,
}

/// Owns all state of one batch invocation: layout, plan, run log, executor.
///
/// The run log is saved after every change so an abort loses at most the
/// chef that was running.
pub struct BatchRunner<'a, E: Executor> {
    paths: ChefPaths,
    plan: PipelinePlan,
    name_prefix: String,
    skip_lists: SkipLists,
    executor: &'a E,
    cancel: CancelToken,
    log: RunLog,
}

impl<'a, E: Executor> BatchRunner<'a, E> {
    /// Resolve the layout under `root` and load the existing run log.
    pub fn new(
        root: &Path,
        cfg: &RunnerConfig,
        executor: &'a E,
        cancel: CancelToken,
    ) -> Result<Self> {
        let paths = ChefPaths::new(root, cfg);
        let plan = PipelinePlan::from_config(root, cfg).context("build pipeline plan")?;
        let log = load_run_log(&paths.log_path)?;
        Ok(Self {
            paths,
            plan,
            name_prefix: cfg.name_prefix.clone(),
            skip_lists: SkipLists::new(cfg.extra_skip.iter().cloned()),
            executor,
            cancel,
            log,
        })
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Visit every entry once, in name order.
    #[instrument(skip_all, fields(chefs_dir = %self.paths.chefs_dir.display()))]
    pub fn run<F: FnMut(BatchEvent<'_>)>(&mut self, mut on_event: F) -> Result<BatchOutcome> {
        let entries = list_entries(&self.paths.chefs_dir)?;
        let mut outcome = BatchOutcome {
            processed: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            stop: BatchStop::Complete,
        };

        for entry in entries {
            if self.cancel.is_cancelled() {
                outcome.stop = BatchStop::Interrupted;
                return Ok(outcome);
            }
            let name = entry.name.as_str();
            self.backfill_has_requirements(name)?;

            let decision = classify_entry(
                &entry,
                &self.name_prefix,
                &self.skip_lists,
                self.log.get(name),
            );
            if let Decision::Skip(reason) = decision {
                debug!(chef = name, %reason, "skipping");
                on_event(BatchEvent::Skipped { name, reason });
                outcome.skipped += 1;
                if self.log.remove(name).is_some() {
                    self.save()?;
                }
                continue;
            }

            on_event(BatchEvent::Started { name });
            let args = self.log.get(name).and_then(|record| record.args.clone());
            let chef_dir = self.paths.chef_dir(name);
            let record = match process_chef(
                &chef_dir,
                &self.plan,
                self.executor,
                args.as_deref(),
                &self.cancel,
            ) {
                ProjectOutcome::Finished(record) => record,
                ProjectOutcome::Interrupted => {
                    info!(chef = name, "interrupted, not recording");
                    outcome.stop = BatchStop::Interrupted;
                    return Ok(outcome);
                }
            };

            outcome.processed += 1;
            if record.succeeded {
                outcome.succeeded += 1;
            } else {
                outcome.failed += 1;
            }
            self.log.insert(name, record);
            self.save()?;
            if let Some(record) = self.log.get(name) {
                on_event(BatchEvent::Finished { name, record });
            }
        }

        self.save()?;
        info!(
            processed = outcome.processed,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            skipped = outcome.skipped,
            "batch complete"
        );
        Ok(outcome)
    }

    /// Older logs lack `has_requirements`; derive it from the chef directory.
    fn backfill_has_requirements(&mut self, name: &str) -> Result<()> {
        let manifest = self.paths.chef_dir(name).join(&self.plan.manifest_file);
        let Some(record) = self.log.get_mut(name) else {
            return Ok(());
        };
        if record.has_requirements.is_some() {
            return Ok(());
        }
        record.has_requirements = Some(manifest.is_file());
        self.save()
    }

    fn save(&self) -> Result<()> {
        write_run_log(&self.paths.log_path, &self.log)
    }
}
