//! Resumable batch runner for content-pipeline chef projects.
//!
//! Every directory under `chefs/` whose name carries the chef prefix gets an
//! isolated environment, its dependencies installed, and its entry script
//! dry-run. Outcomes are kept in a JSON run log so reruns only retry chefs
//! that have not succeeded yet.
//!
//! - **[`core`]**: Pure logic (record types, skip lists, classification,
//!   summary rendering). No I/O.
//! - **[`io`]**: Filesystem, config, subprocesses and interrupt handling.
//!
//! [`project`] runs the pipeline for one chef; [`batch`] drives it across the
//! whole directory.

pub mod batch;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod project;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
