//! Library half of the `planner` binary: command handlers as plain functions,
//! so `tests/cli.rs` can exercise `solve`/`verify` without shelling out.

pub mod commands;
pub mod logging;
pub mod trace;

pub use commands::{solve, verify};
