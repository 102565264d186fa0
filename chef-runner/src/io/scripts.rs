//! Entry-script discovery inside a chef directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};

use crate::core::script::ScriptLookup;

/// Compiled entry-script file name pattern (e.g. `*chef.py`).
#[derive(Debug, Clone)]
pub struct ScriptMatcher {
    matcher: GlobMatcher,
}

impl ScriptMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = Glob::new(pattern)
            .with_context(|| format!("invalid script pattern {pattern:?}"))?;
        Ok(Self {
            matcher: glob.compile_matcher(),
        })
    }

    pub fn is_match(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }

    /// Match regular files directly inside `chef_dir` (no recursion).
    ///
    /// Hidden files (editor locks, backups) never count as entry scripts.
    /// Found paths are file names relative to `chef_dir`.
    pub fn lookup(&self, chef_dir: &Path) -> Result<ScriptLookup> {
        let mut matches = Vec::new();
        for entry in
            fs::read_dir(chef_dir).with_context(|| format!("read {}", chef_dir.display()))?
        {
            let entry = entry.context("read entry")?;
            if !entry.path().is_file() {
                continue;
            }
            let name = entry.file_name();
            if let Some(name) = name.to_str()
                && !name.starts_with('.')
                && self.is_match(name)
            {
                matches.push(PathBuf::from(name));
            }
        }
        Ok(ScriptLookup::from_matches(matches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_matches_chef_scripts_only() {
        let matcher = ScriptMatcher::new("*chef.py").expect("matcher");
        assert!(matcher.is_match("sushichef.py"));
        assert!(matcher.is_match("sushi_chef.py"));
        assert!(!matcher.is_match("chef.pyc"));
        assert!(!matcher.is_match("setup.py"));
    }

    #[test]
    fn lookup_ignores_directories_and_other_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("sushichef.py"), "").expect("script");
        fs::write(temp.path().join("utils.py"), "").expect("utils");
        fs::create_dir(temp.path().join("oldchef.py")).expect("dir");

        let lookup = ScriptMatcher::new("*chef.py")
            .expect("matcher")
            .lookup(temp.path())
            .expect("lookup");
        assert_eq!(lookup, ScriptLookup::Found(PathBuf::from("sushichef.py")));
    }

    #[test]
    fn lookup_skips_hidden_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("sushichef.py"), "").expect("script");
        fs::write(temp.path().join(".#sushichef.py"), "").expect("lock file");
        fs::write(temp.path().join(".sushichef.py"), "").expect("hidden copy");

        let lookup = ScriptMatcher::new("*chef.py")
            .expect("matcher")
            .lookup(temp.path())
            .expect("lookup");
        assert_eq!(lookup, ScriptLookup::Found(PathBuf::from("sushichef.py")));
    }

    #[test]
    fn lookup_reports_ambiguity() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("sushichef.py"), "").expect("a");
        fs::write(temp.path().join("legacy_chef.py"), "").expect("b");

        let lookup = ScriptMatcher::new("*chef.py")
            .expect("matcher")
            .lookup(temp.path())
            .expect("lookup");
        assert!(matches!(lookup, ScriptLookup::Ambiguous(paths) if paths.len() == 2));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(ScriptMatcher::new("[chef").is_err());
    }
}
