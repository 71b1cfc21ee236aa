use clap::{Parser, Subcommand};
use planner_cli::commands::{solve, verify};
use planner_cli::logging;
use std::path::PathBuf;
use std::process::ExitCode;

/// Discrete-resource production scheduler: finds a near-optimal process
/// start sequence for a config file, and can replay/validate a trace
/// produced by a prior solve.
#[derive(Parser)]
#[command(name = "planner", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search for a schedule that maximizes the config's declared goal(s).
    Solve {
        config_file: PathBuf,
        /// Cycle budget the simulator runs each candidate under.
        t: u64,
        #[arg(long, env = "RNG_SEED")]
        seed: Option<u64>,
        /// Overrides the complexity-derived generation count.
        #[arg(long)]
        generations: Option<u32>,
        /// Overrides the complexity-derived population size.
        #[arg(long)]
        population: Option<usize>,
        #[arg(long)]
        trace_out: Option<PathBuf>,
        /// Caps the rayon thread pool used for parallel fitness evaluation.
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Replay a trace file against a config in strict mode.
    Verify {
        config_file: PathBuf,
        trace_file: PathBuf,
    },
}

fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Solve {
            config_file,
            t,
            seed,
            generations,
            population,
            trace_out,
            jobs,
        } => run_solve(solve::SolveArgs {
            config_path: config_file,
            budget: t,
            seed,
            generations,
            population,
            trace_out,
            jobs,
        }),
        Command::Verify {
            config_file,
            trace_file,
        } => run_verify(verify::VerifyArgs {
            config_path: config_file,
            trace_path: trace_file,
        }),
    }
}

fn run_solve(args: solve::SolveArgs) -> ExitCode {
    match solve::run(&args) {
        Ok(output) => {
            print!("{}", output.report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run_verify(args: verify::VerifyArgs) -> ExitCode {
    match verify::run(&args) {
        Ok(output) => {
            print!("{}", output.report);
            if output.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
