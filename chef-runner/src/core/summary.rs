//! Text rendering of the run log for `chef-runner --print`.

use std::fmt::Write;

use crate::core::types::RunLog;

/// Number of trailing stderr lines shown per failed chef.
pub const SUMMARY_ERROR_LINES: usize = 20;

/// Last `count` newline-separated segments of `text`.
///
/// A trailing newline counts as an empty final segment, so output ending in
/// `\n` shows `count - 1` lines of content.
pub fn tail_lines(text: &str, count: usize) -> &str {
    if count == 0 {
        return "";
    }
    match text.rmatch_indices('\n').nth(count - 1) {
        Some((index, _)) => &text[index + 1..],
        None => text,
    }
}

/// Render one line per chef plus stored error tails, then the totals.
pub fn render_summary(log: &RunLog) -> String {
    let mut out = String::new();
    for (name, record) in log.iter() {
        let _ = writeln!(out, "{name}: {}", record.succeeded);
        if let Some(errors) = &record.errors {
            let _ = writeln!(out, "{}", tail_lines(errors, SUMMARY_ERROR_LINES));
        }
    }
    let _ = writeln!(out, "Total runs: {}", log.len());
    let _ = writeln!(out, "Successful runs: {}", log.succeeded_count());
    out
}
