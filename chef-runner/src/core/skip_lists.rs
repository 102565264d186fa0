//! Chefs that are never run, grouped by why they are excluded.

use std::collections::BTreeSet;
use std::fmt;

/// Too large for a batch dry run.
pub const HUGE_CHEFS: &[&str] = &["sushi-chef-khan-academy"];

/// Missing requirements files or code that is not in the repository.
pub const BROKEN_CHEFS: &[&str] = &["sushi-chef-noktta", "sushi-chef-storybooks-minnesota"];

/// Need credentials that the batch runner does not have.
pub const NEEDS_CREDENTIALS_CHEFS: &[&str] =
    &["sushi-chef-shls", "sushi-chef-sikana", "sushi-chef-teded"];

/// Depend on manually added asset files.
pub const NEEDS_ASSETS_CHEFS: &[&str] = &["sushi-chef-profuturo", "sushi-chef-tictaclearn"];

/// Never implemented, no longer used, or done manually.
pub const EMPTY_CHEFS: &[&str] = &[
    "sushi-chef-proyecto-biosfera",
    "sushi-chef-skoool",
    "sushi-chef-stop-it-at-the-start",
    "sushi-chef-women-talk-money",
    "sushi-chef-world-digital-library",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipCategory {
    Huge,
    Broken,
    NeedsCredentials,
    NeedsAssets,
    Empty,
    /// Listed under `extra_skip` in the config file.
    Configured,
}

impl fmt::Display for SkipCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SkipCategory::Huge => "huge",
            SkipCategory::Broken => "broken",
            SkipCategory::NeedsCredentials => "needs credentials",
            SkipCategory::NeedsAssets => "needs assets",
            SkipCategory::Empty => "empty",
            SkipCategory::Configured => "configured skip",
        };
        f.write_str(label)
    }
}

/// Static exclusion lists plus any names added through config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipLists {
    extra: BTreeSet<String>,
}

impl SkipLists {
    pub fn new<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extra: extra.into_iter().map(Into::into).collect(),
        }
    }

    /// Category that excludes `name`, if any. Static lists win over config.
    pub fn category_for(&self, name: &str) -> Option<SkipCategory> {
        let static_lists = [
            (HUGE_CHEFS, SkipCategory::Huge),
            (BROKEN_CHEFS, SkipCategory::Broken),
            (NEEDS_CREDENTIALS_CHEFS, SkipCategory::NeedsCredentials),
            (NEEDS_ASSETS_CHEFS, SkipCategory::NeedsAssets),
            (EMPTY_CHEFS, SkipCategory::Empty),
        ];
        for (list, category) in static_lists {
            if list.contains(&name) {
                return Some(category);
            }
        }
        self.extra
            .contains(name)
            .then_some(SkipCategory::Configured)
    }
}
