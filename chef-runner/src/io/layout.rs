//! Filesystem layout of a chef batch, resolved against the invocation root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::core::classifier::ChefEntry;
use crate::io::config::RunnerConfig;

/// Locations derived from the root and config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChefPaths {
    pub chefs_dir: PathBuf,
    pub log_path: PathBuf,
}

impl ChefPaths {
    pub fn new(root: &Path, cfg: &RunnerConfig) -> Self {
        let chefs_dir = root.join(&cfg.chefs_dir);
        Self {
            log_path: chefs_dir.join(&cfg.log_file),
            chefs_dir,
        }
    }

    pub fn chef_dir(&self, name: &str) -> PathBuf {
        self.chefs_dir.join(name)
    }
}

/// List the chefs directory sorted by name.
///
/// Entries whose names are not valid UTF-8 cannot be run log keys and are
/// left out.
pub fn list_entries(chefs_dir: &Path) -> Result<Vec<ChefEntry>> {
    if !chefs_dir.is_dir() {
        bail!("chefs directory not found at {}", chefs_dir.display());
    }
    let mut entries = Vec::new();
    for entry in
        fs::read_dir(chefs_dir).with_context(|| format!("read {}", chefs_dir.display()))?
    {
        let entry = entry.context("read entry")?;
        let Ok(name) = entry.file_name().into_string() else {
            tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 entry");
            continue;
        };
        entries.push(ChefEntry {
            name,
            is_dir: entry.path().is_dir(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
