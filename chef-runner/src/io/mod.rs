//! I/O helpers for the chef runner.

pub mod config;
pub mod executor;
pub mod interrupt;
pub mod layout;
pub mod process;
pub mod run_log;
pub mod scripts;
