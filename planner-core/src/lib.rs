//! Core engine for discrete-resource production scheduling: a cycle-accurate
//! simulator, a structural graph analyzer, and a genetic search that evolves
//! process-start sequences against it.
//!
//! Parsing, validation, and human-facing output live in `planner-config` and
//! `planner-cli`; this crate only knows about already-valid [`domain::Config`]
//! values.

pub mod analyzer;
pub mod domain;
pub mod driver;
pub mod evolution;
pub mod rng;
pub mod seed;
pub mod simulator;

pub use analyzer::{analyze, Analysis};
pub use domain::{Config, ConfigBuilder, Goal, Process, ProcessId, ResourceId};
pub use driver::{complexity_score, derive_params, replay, solve, Solution};
pub use evolution::{Individual, Params, RunOutcome};
pub use simulator::{simulate, Candidate, SimResult, Trace};
