//! Deterministic, pure logic shared by the chef runner.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod classifier;
pub mod script;
pub mod skip_lists;
pub mod summary;
pub mod types;
