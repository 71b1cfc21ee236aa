//! C6: turns a bare [`Config`] into a tuned [`crate::evolution::Params`] set
//! and runs the search end to end.

use crate::analyzer::{self, Analysis};
use crate::domain::Config;
use crate::evolution::{self, Params, RunOutcome};
use crate::rng::Rng;
use crate::simulator::SimResult;

/// `S = min(100, 10·|P| + 5·|R| + 10·|G| + 20·[any cyclic])`.
pub fn complexity_score(config: &Config) -> u32 {
    let processes = config.processes().len() as u32;
    let resources = config.resource_count() as u32;
    let goals = config.goals().len() as u32;
    let cyclic = if any_process_is_cyclic(config) { 20 } else { 0 };
    (10 * processes + 5 * resources + 10 * goals + cyclic).min(100)
}

/// A process is cyclic iff some input resource name also appears among its
/// own outputs (self-consuming/self-replenishing processes), not a graph-wide
/// cycle across multiple processes.
fn any_process_is_cyclic(config: &Config) -> bool {
    config.processes().iter().any(|p| {
        p.inputs
            .iter()
            .any(|&(res, _)| p.outputs.iter().any(|&(out_res, _)| out_res == res))
    })
}

fn clamp(low: f64, value: f64, high: f64) -> f64 {
    value.max(low).min(high)
}

/// Derives GA parameters straight from the complexity score's scaling rules.
pub fn derive_params(config: &Config, sim_budget: u64) -> Params {
    let s = complexity_score(config) as f64;

    let generations = clamp(80.0, 4.0 * s, 400.0).round() as u32;
    let population = clamp(80.0, 4.0 * s, 400.0).round() as usize;
    let mutation_rate = (0.05 + 0.0008 * s).min(0.15);
    let crossover_rate = clamp(0.7, 0.7 + 0.0015 * s, 0.9);
    let elite_count = ((0.1 * population as f64).floor() as usize).max(5);
    let process_count = config.processes().len();
    let min_len = (0.8 * process_count as f64).floor().max(8.0) as usize;
    let max_len = (3 * process_count).min(100).max(min_len);
    let stagnation_patience = (generations / 2).max(200);

    Params {
        generations,
        population,
        mutation_rate,
        crossover_rate,
        elite_count,
        min_len,
        max_len,
        sim_budget,
        stagnation_patience,
        parallel: population >= 64,
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub outcome: RunOutcome,
    pub analysis_critical_count: usize,
}

/// Runs analysis, then evolution, returning the best schedule found along
/// with its re-confirmed simulation trace.
pub fn solve(config: &Config, sim_budget: u64, rng: &mut Rng) -> Solution {
    let analysis: Analysis = analyzer::analyze(config);
    let params = derive_params(config, sim_budget);
    let outcome = evolution::run(config, &analysis, &params, rng);
    Solution {
        analysis_critical_count: analysis.critical.len(),
        outcome,
    }
}

/// Re-runs the simulator on the winning candidate; used by the CLI to emit a
/// trace file independent of whatever the GA happened to cache.
pub fn replay(config: &Config, solution: &Solution, sim_budget: u64) -> SimResult {
    crate::simulator::simulate(config, &solution.outcome.best.candidate, sim_budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConfigBuilder;
    use crate::rng::SeedableRng;

    #[test]
    fn complexity_score_is_capped_at_100() {
        let mut b = ConfigBuilder::new();
        for i in 0..50 {
            b.process(
                format!("p{i}"),
                &[("a", 1)],
                &[("b", 1)],
                1,
            );
        }
        b.goal_resource("b");
        let config = b.build();
        assert_eq!(complexity_score(&config), 100);
    }

    #[test]
    fn process_that_reconsumes_its_own_output_name_is_cyclic() {
        let mut b = ConfigBuilder::new();
        b.stock("clock", 10);
        b.process("tick", &[("clock", 1)], &[("clock", 1), ("work", 1)], 1);
        b.goal_resource("work");
        let config = b.build();
        assert!(any_process_is_cyclic(&config));
    }

    #[test]
    fn chain_with_distinct_names_is_not_cyclic() {
        let mut b = ConfigBuilder::new();
        b.stock("a", 10);
        b.process("p1", &[("a", 1)], &[("b", 1)], 1);
        b.process("p2", &[("b", 1)], &[("c", 1)], 1);
        b.goal_resource("c");
        let config = b.build();
        assert!(!any_process_is_cyclic(&config));
    }

    #[test]
    fn solve_returns_a_feasible_or_explicitly_infeasible_solution() {
        let mut b = ConfigBuilder::new();
        b.stock("euro", 20);
        b.process("buy_fruit", &[("euro", 5)], &[("fruit", 1)], 1);
        b.goal_resource("fruit");
        let config = b.build();
        let mut rng = Rng::seed_from_u64(9);
        let solution = solve(&config, 50, &mut rng);
        assert!(solution.outcome.best.result.fitness.is_finite());
    }
}
