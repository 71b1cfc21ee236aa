//! Parsing and validation for the planner's config text format. Kept out of
//! `planner-core` deliberately: the core trusts its input, and this crate is
//! where that trust gets earned.

pub mod error;
pub mod parser;
pub mod validator;

pub use error::{ConfigError, ConfigErrors};
pub use parser::ParsedConfig;

/// Parses and validates `text` in one step.
pub fn load(text: &str) -> Result<planner_core::Config, ConfigErrors> {
    let parsed = parser::parse(text).map_err(ConfigErrors)?;
    validator::validate(&parsed)
}
