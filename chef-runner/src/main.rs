//! Chef batch runner.
//!
//! Installs and dry-runs every chef under `chefs/`, recording outcomes in
//! `chefs/run_logs.json`. `--print` summarises that log instead.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;

use chef_runner::batch::{BatchEvent, BatchOutcome, BatchRunner, BatchStop};
use chef_runner::core::summary::render_summary;
use chef_runner::exit_codes;
use chef_runner::io::config::{DEFAULT_CONFIG_FILE, RunnerConfig, load_config};
use chef_runner::io::executor::ToolExecutor;
use chef_runner::io::interrupt::{CancelToken, InterruptWatcher};
use chef_runner::io::layout::ChefPaths;
use chef_runner::io::run_log::load_run_log;
use chef_runner::logging;

#[derive(Parser)]
#[command(
    name = "chef-runner",
    version,
    about = "Install and dry-run every chef, resuming from the run log"
)]
struct Cli {
    /// Print a summary of the run log and exit without running anything.
    #[arg(long)]
    print: bool,

    /// Directory containing `chefs/` and the pipeline library.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Config file. Defaults to `<root>/chef-runner.toml` when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log progress at info level unless `RUST_LOG` says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FAILED);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    // Child processes run inside chef directories and need absolute paths.
    let root = cli
        .root
        .canonicalize()
        .with_context(|| format!("resolve root {}", cli.root.display()))?;
    let cfg = resolve_config(&root, cli.config.as_deref())?;
    if cli.print {
        cmd_print(&root, &cfg)
    } else {
        cmd_run(&root, &cfg)
    }
}

/// An explicit `--config` must exist; the default location is optional.
fn resolve_config(root: &Path, explicit: Option<&Path>) -> Result<RunnerConfig> {
    match explicit {
        Some(path) => {
            if !path.is_file() {
                bail!("config file not found: {}", path.display());
            }
            load_config(path)
        }
        None => load_config(&root.join(DEFAULT_CONFIG_FILE)),
    }
}

fn cmd_print(root: &Path, cfg: &RunnerConfig) -> Result<i32> {
    let paths = ChefPaths::new(root, cfg);
    let log = load_run_log(&paths.log_path)?;
    print!("{}", render_summary(&log));
    Ok(exit_codes::OK)
}

fn cmd_run(root: &Path, cfg: &RunnerConfig) -> Result<i32> {
    let cancel = CancelToken::new();
    let _watcher = InterruptWatcher::install(cancel.clone())?;
    let executor = ToolExecutor::new(cfg.tool.program.clone());

    let mut runner = BatchRunner::new(root, cfg, &executor, cancel)?;
    let outcome = runner.run(print_event)?;
    print_report(&outcome);

    Ok(match outcome.stop {
        BatchStop::Complete => exit_codes::OK,
        BatchStop::Interrupted => exit_codes::INTERRUPTED,
    })
}

fn print_event(event: BatchEvent<'_>) {
    match event {
        BatchEvent::Skipped { name, reason } => println!("Skipping {name} ({reason})"),
        BatchEvent::Started { name } => println!("Processing {name}"),
        BatchEvent::Finished { name, record } => {
            let verdict = if record.succeeded { "succeeded" } else { "failed" };
            println!("{name} {verdict} in {:.1}s", record.elapsed);
        }
    }
}

fn print_report(outcome: &BatchOutcome) {
    if outcome.stop == BatchStop::Interrupted {
        println!("Interrupted.");
    }
    println!(
        "Processed: {}, succeeded: {}, failed: {}, skipped: {}",
        outcome.processed, outcome.succeeded, outcome.failed, outcome.skipped
    );
}
