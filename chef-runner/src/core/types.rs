//! Shared deterministic types for the chef runner.
//!
//! These types define the persisted run log contract. They must not depend on
//! external state so that the log written by one run can be read by the next.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Last known execution status of a single chef (one run log entry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Whether every install step and the dry run succeeded.
    pub succeeded: bool,
    /// Wall-clock seconds spent installing and running the chef.
    #[serde(default)]
    pub elapsed: f64,
    /// Whether the chef directory had a dependency manifest.
    ///
    /// Logs written by older tool versions may omit this; it is backfilled on
    /// the next classification pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_requirements: Option<bool>,
    /// Captured stderr of a failed dry run. Absent for successful runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<String>,
    /// Extra arguments for the entry script. Only ever seeded by hand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
}

impl StatusRecord {
    pub fn success(elapsed: f64, has_requirements: bool, args: Option<Vec<String>>) -> Self {
        Self {
            succeeded: true,
            elapsed,
            has_requirements: Some(has_requirements),
            errors: None,
            args,
        }
    }

    /// Failed record. `errors` is empty when an install step failed or the
    /// entry script could not be located.
    pub fn failure(
        elapsed: f64,
        has_requirements: bool,
        errors: String,
        args: Option<Vec<String>>,
    ) -> Self {
        Self {
            succeeded: false,
            elapsed,
            has_requirements: Some(has_requirements),
            errors: Some(errors),
            args,
        }
    }

    /// Stored extra arguments, or an empty slice.
    pub fn extra_args(&self) -> &[String] {
        self.args.as_deref().unwrap_or_default()
    }
}

/// Chef name to status mapping persisted as `run_logs.json`.
///
/// Entries are kept sorted by chef name so serialized output is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunLog {
    entries: BTreeMap<String, StatusRecord>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&StatusRecord> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut StatusRecord> {
        self.entries.get_mut(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, record: StatusRecord) {
        self.entries.insert(name.into(), record);
    }

    pub fn remove(&mut self, name: &str) -> Option<StatusRecord> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StatusRecord)> {
        self.entries
            .iter()
            .map(|(name, record)| (name.as_str(), record))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn succeeded_count(&self) -> usize {
        self.entries.values().filter(|record| record.succeeded).count()
    }
}
