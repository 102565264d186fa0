//! Deterministic run/skip classification of chef directory entries.

use std::fmt;

use crate::core::skip_lists::{SkipCategory, SkipLists};
use crate::core::types::StatusRecord;

/// A listed entry of the chefs directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChefEntry {
    pub name: String,
    pub is_dir: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Name does not start with the chef naming prefix.
    PrefixMismatch,
    /// Matches the prefix but is a plain file.
    NotADirectory,
    Excluded(SkipCategory),
    /// The run log already records a successful run.
    AlreadySucceeded,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PrefixMismatch => f.write_str("not a chef"),
            SkipReason::NotADirectory => f.write_str("not a directory"),
            SkipReason::Excluded(category) => write!(f, "excluded: {category}"),
            SkipReason::AlreadySucceeded => f.write_str("already succeeded"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Process,
    Skip(SkipReason),
}

/// Decide whether `entry` should be processed.
///
/// Checks run in order: naming prefix, entry kind, skip lists, prior success.
pub fn classify_entry(
    entry: &ChefEntry,
    prefix: &str,
    skip_lists: &SkipLists,
    prior: Option<&StatusRecord>,
) -> Decision {
    if !entry.name.starts_with(prefix) {
        return Decision::Skip(SkipReason::PrefixMismatch);
    }
    if !entry.is_dir {
        return Decision::Skip(SkipReason::NotADirectory);
    }
    if let Some(category) = skip_lists.category_for(&entry.name) {
        return Decision::Skip(SkipReason::Excluded(category));
    }
    if prior.is_some_and(|record| record.succeeded) {
        return Decision::Skip(SkipReason::AlreadySucceeded);
    }
    Decision::Process
}
