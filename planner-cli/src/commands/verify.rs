use crate::trace::{self, VerifyError};
use anyhow::{Context, Result};

pub struct VerifyArgs {
    pub config_path: std::path::PathBuf,
    pub trace_path: std::path::PathBuf,
}

pub struct VerifyOutput {
    pub valid: bool,
    pub report: String,
}

/// Re-parses and replays a trace file in strict mode (see [`trace::verify_trace`]).
pub fn run(args: &VerifyArgs) -> Result<VerifyOutput> {
    let config_text = std::fs::read_to_string(&args.config_path)
        .with_context(|| format!("reading config file {}", args.config_path.display()))?;
    let config = planner_config::load(&config_text).map_err(|errors| {
        anyhow::anyhow!(
            "config {} has {} error(s)",
            args.config_path.display(),
            errors.errors().len()
        )
    })?;

    let trace_text = std::fs::read_to_string(&args.trace_path)
        .with_context(|| format!("reading trace file {}", args.trace_path.display()))?;

    match trace::verify_trace(&config, &trace_text) {
        Ok(report) => {
            let mut out = String::from("valid\n");
            let mut names: Vec<(&str, i64)> = (0..config.resource_count() as u32)
                .map(|r| (config.resource_name(r), report.final_stocks[r as usize]))
                .collect();
            names.sort_by(|a, b| a.0.cmp(b.0));
            for (name, qty) in names {
                out.push_str(&format!("{name} => {qty}\n"));
            }
            Ok(VerifyOutput {
                valid: true,
                report: out,
            })
        }
        Err(e) => Ok(VerifyOutput {
            valid: false,
            report: format_verify_error(&e),
        }),
    }
}

fn format_verify_error(e: &VerifyError) -> String {
    format!("invalid: {e}\n")
}
