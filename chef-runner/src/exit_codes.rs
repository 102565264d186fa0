//! Stable exit codes for the chef runner CLI.

/// Batch finished (individual chefs may still have failed) or summary printed.
pub const OK: i32 = 0;
/// The batch could not run: invalid config, unreadable log, missing chefs dir.
pub const FAILED: i32 = 1;
/// An interrupt stopped the batch before every chef was visited.
pub const INTERRUPTED: i32 = 1;
