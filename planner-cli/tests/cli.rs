//! Exercises `solve` then `verify` end to end through the library's plain
//! function handlers, without shelling out to the built binary.

use planner_cli::commands::{solve, verify};
use std::io::Write;

fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("planner-cli-test-{name}-{}", std::process::id()));
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn solve_then_verify_round_trip_is_valid() {
    let config_path = write_temp(
        "config",
        "euro:10\nbuy_fruit:(euro:5):(fruit:1):1\noptimize:(fruit;time)\n",
    );
    let trace_path = std::env::temp_dir().join(format!(
        "planner-cli-test-trace-{}",
        std::process::id()
    ));

    let solve_output = solve::run(&solve::SolveArgs {
        config_path: config_path.clone(),
        budget: 20,
        seed: Some(7),
        generations: Some(40),
        population: Some(20),
        trace_out: Some(trace_path.clone()),
        jobs: None,
    })
    .expect("solve should succeed on a valid config");
    assert!(solve_output.feasible);
    assert!(trace_path.exists());

    let verify_output = verify::run(&verify::VerifyArgs {
        config_path,
        trace_path: trace_path.clone(),
    })
    .expect("verify should succeed reading a well-formed trace");
    assert!(verify_output.valid, "{}", verify_output.report);

    let _ = std::fs::remove_file(&trace_path);
}

#[test]
fn solve_reports_infeasible_without_erroring() {
    let config_path = write_temp(
        "infeasible",
        "euro:1\nbuy_fruit:(euro:5):(fruit:1):1\noptimize:(fruit)\n",
    );
    let output = solve::run(&solve::SolveArgs {
        config_path,
        budget: 10,
        seed: Some(1),
        generations: Some(10),
        population: Some(10),
        trace_out: None,
        jobs: None,
    })
    .expect("an infeasible config is not itself a CLI error");
    assert!(!output.feasible);
    assert!(output.report.contains("no process doable"));
}

#[test]
fn solve_on_malformed_config_returns_an_error() {
    let config_path = write_temp("malformed", "this is not a valid config\n");
    let result = solve::run(&solve::SolveArgs {
        config_path,
        budget: 10,
        seed: None,
        generations: None,
        population: None,
        trace_out: None,
        jobs: None,
    });
    assert!(result.is_err());
}

#[test]
fn verify_rejects_trace_with_unknown_process() {
    let config_path = write_temp(
        "config-for-bad-trace",
        "euro:10\nbuy_fruit:(euro:5):(fruit:1):1\noptimize:(fruit)\n",
    );
    let trace_path = write_temp("bad-trace", "0:not_a_real_process\n");
    let output = verify::run(&verify::VerifyArgs {
        config_path,
        trace_path,
    })
    .unwrap();
    assert!(!output.valid);
}
