//! Configuration-error taxonomy. Every variant names the offending line and
//! identifier, per the propagation policy: the core never sees a bad config,
//! so all of this lives here instead.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("line {line}: malformed syntax: {text:?}")]
    MalformedLine { line: usize, text: String },

    #[error("line {line}: duplicate name {name:?}")]
    DuplicateName { line: usize, name: String },

    #[error("line {line}: unknown resource {resource:?} referenced by {context}")]
    UnknownResource {
        line: usize,
        resource: String,
        context: String,
    },

    #[error("line {line}: non-positive quantity {quantity} for resource {resource:?}")]
    NonPositiveQuantity {
        line: usize,
        resource: String,
        quantity: i64,
    },

    #[error("line {line}: non-positive delay {delay} for process {process:?}")]
    NonPositiveDelay { line: usize, process: String, delay: i64 },

    #[error("negative stock quantity {quantity} for resource {resource:?} at line {line}")]
    NegativeStock {
        line: usize,
        resource: String,
        quantity: i64,
    },

    #[error("config declares no processes")]
    NoProcesses,

    #[error("config declares no stocks")]
    NoStocks,

    #[error("config declares no goals")]
    NoGoals,

    #[error("goal list is empty")]
    EmptyGoalList { line: usize },
}

/// Multiple problems are collected rather than stopping at the first, so the
/// caller can report everything wrong with a config in one pass.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{} configuration error(s)", .0.len())]
pub struct ConfigErrors(pub Vec<ConfigError>);

impl ConfigErrors {
    pub fn errors(&self) -> &[ConfigError] {
        &self.0
    }
}
