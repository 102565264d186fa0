//! Entry-script lookup result.

use std::path::PathBuf;

/// Outcome of searching a chef directory for its entry script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLookup {
    Found(PathBuf),
    Missing,
    /// More than one candidate; the runner refuses to guess.
    Ambiguous(Vec<PathBuf>),
}

impl ScriptLookup {
    /// Build a lookup from the matching file names (order irrelevant).
    pub fn from_matches(mut matches: Vec<PathBuf>) -> Self {
        match matches.len() {
            0 => ScriptLookup::Missing,
            1 => ScriptLookup::Found(matches.remove(0)),
            _ => {
                matches.sort();
                ScriptLookup::Ambiguous(matches)
            }
        }
    }
}
