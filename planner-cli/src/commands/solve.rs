use crate::trace;
use anyhow::{Context, Result};
use planner_core::rng::{self, Rng};
use std::path::Path;

pub struct SolveArgs {
    pub config_path: std::path::PathBuf,
    pub budget: u64,
    pub seed: Option<u64>,
    pub generations: Option<u32>,
    pub population: Option<usize>,
    pub trace_out: Option<std::path::PathBuf>,
    pub jobs: Option<usize>,
}

pub struct SolveOutput {
    pub report: String,
    pub feasible: bool,
}

/// Runs a full solve: load config, derive/override GA params, search, and
/// re-simulate the winner for the final trace. Exposed as a plain function
/// (not inlined in `main`) so tests can call it directly.
pub fn run(args: &SolveArgs) -> Result<SolveOutput> {
    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .ok();
    }

    let text = std::fs::read_to_string(&args.config_path)
        .with_context(|| format!("reading config file {}", args.config_path.display()))?;
    let config = planner_config::load(&text).map_err(|errors| {
        anyhow::anyhow!(
            "config {} has {} error(s):\n{}",
            args.config_path.display(),
            errors.errors().len(),
            errors
                .errors()
                .iter()
                .map(|e| format!("  - {e}"))
                .collect::<Vec<_>>()
                .join("\n")
        )
    })?;

    let mut rng: Rng = rng::from_seed_or_entropy(args.seed);

    let mut params = planner_core::derive_params(&config, args.budget);
    if let Some(g) = args.generations {
        params.generations = g;
    }
    if let Some(p) = args.population {
        params.population = p;
    }
    // `elite_count`/`min_len`/`max_len` were derived from the pre-override
    // population; re-clamp them now so a smaller `--population` can't leave
    // `elite_count` >= `population` (see `Params::clamp_to_population`).
    params.clamp_to_population();

    let analysis = planner_core::analyze(&config);
    let outcome = planner_core::evolution::run(&config, &analysis, &params, &mut rng);
    let result = planner_core::simulate(&config, &outcome.best.candidate, args.budget);

    let feasible = !result.trace.is_empty();
    let trace_text = trace::format_trace(&config, &result.trace.starts, &result.final_stocks);

    if let Some(path) = &args.trace_out {
        write_trace_file(path, &trace_text)?;
    }

    let mut report = String::new();
    if feasible {
        report.push_str(&trace_text);
    } else {
        report.push_str("no process doable within cycle budget\n");
    }

    Ok(SolveOutput { report, feasible })
}

fn write_trace_file(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("writing trace file {}", path.display()))
}
