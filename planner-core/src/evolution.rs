//! C5: a generational genetic algorithm over [`crate::simulator::Candidate`]
//! schedules, guided by the fitness the simulator assigns each one.

use crate::analyzer::Analysis;
use crate::domain::Config;
use crate::rng::Rng;
use crate::seed;
use crate::simulator::{self, Candidate, SimResult};
use rand::Rng as _;
use rayon::prelude::*;
use tracing::{debug, info, info_span, instrument};

#[derive(Debug, Clone)]
pub struct Params {
    pub generations: u32,
    pub population: usize,
    pub mutation_rate: f64,
    pub crossover_rate: f64,
    pub elite_count: usize,
    pub min_len: usize,
    pub max_len: usize,
    pub sim_budget: u64,
    pub stagnation_patience: u32,
    pub parallel: bool,
}

impl Params {
    /// Re-establishes the invariants `derive_params` guaranteed, after a
    /// caller (e.g. the CLI's `--population` override) has changed a field
    /// without re-deriving the rest. `elite_count` in particular must stay
    /// strictly below `population`: `next_generation`'s elitism step takes
    /// the top `elite_count` candidates verbatim, and if that already fills
    /// the next generation, the `while next_candidates.len() < population`
    /// loop below it never runs, so no crossover/mutation ever happens again.
    pub fn clamp_to_population(&mut self) {
        self.population = self.population.max(1);
        self.elite_count = self.elite_count.min(self.population - 1);
        self.min_len = self.min_len.max(1);
        self.max_len = self.max_len.max(self.min_len);
    }
}

#[derive(Debug, Clone)]
pub struct Individual {
    pub candidate: Candidate,
    pub result: SimResult,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub best: Individual,
    pub generations_run: u32,
    pub stopped_early: bool,
}

/// Runs the full generational loop and returns the best individual seen,
/// which may come from an earlier generation than the one the loop stopped
/// on (elitism guarantees fitness is monotone non-decreasing, but the
/// best-ever snapshot is kept explicitly rather than relied upon).
#[instrument(skip(config, analysis, rng))]
pub fn run(config: &Config, analysis: &Analysis, params: &Params, rng: &mut Rng) -> RunOutcome {
    let mut population = initial_population(config, analysis, params, rng);
    let mut best = population
        .iter()
        .max_by(|a, b| a.result.fitness.total_cmp(&b.result.fitness))
        .cloned()
        .expect("population is never empty");

    let mut stagnant_generations = 0u32;
    let mut generations_run = 0u32;
    let mut stopped_early = false;

    for gen in 0..params.generations {
        let span = info_span!(
            "generation",
            generation = gen,
            best_fitness = best.result.fitness,
            stagnant_generations
        );
        let _enter = span.enter();

        generations_run = gen + 1;
        population = next_generation(config, analysis, params, &population, rng);

        let gen_best = population
            .iter()
            .max_by(|a, b| a.result.fitness.total_cmp(&b.result.fitness))
            .cloned()
            .expect("population is never empty");

        if gen_best.result.fitness > best.result.fitness {
            debug!(fitness = gen_best.result.fitness, "improved");
            best = gen_best;
            stagnant_generations = 0;
        } else {
            stagnant_generations += 1;
        }

        if stagnant_generations >= params.stagnation_patience {
            info!("stopping early: stagnation patience exceeded");
            stopped_early = true;
            break;
        }
    }

    info!(
        generations_run,
        best_fitness = best.result.fitness,
        stopped_early,
        "evolution finished"
    );

    RunOutcome {
        best,
        generations_run,
        stopped_early,
    }
}

fn evaluate(config: &Config, params: &Params, candidate: Candidate) -> Individual {
    let result = simulator::simulate(config, &candidate, params.sim_budget);
    Individual { candidate, result }
}

/// 60% via C4 (a random structured strategy), 30% uniform-random, 10% via
/// C4 with a second independent strategy roll.
fn initial_population(
    config: &Config,
    analysis: &Analysis,
    params: &Params,
    rng: &mut Rng,
) -> Vec<Individual> {
    let n = params.population;
    let smart_count = (n * 6) / 10;
    let random_count = (n * 3) / 10;
    let extra_smart_count = n - smart_count - random_count;

    let mut candidates = Vec::with_capacity(n);
    for _ in 0..smart_count {
        let strategy = seed::random_strategy(rng);
        candidates.push(seed::build(
            config,
            analysis,
            strategy,
            params.min_len,
            params.max_len,
            rng,
        ));
    }
    for _ in 0..random_count {
        candidates.push(seed::build_uniform_random(
            config,
            params.min_len,
            params.max_len,
            rng,
        ));
    }
    for _ in 0..extra_smart_count {
        let strategy = seed::random_strategy(rng);
        candidates.push(seed::build(
            config,
            analysis,
            strategy,
            params.min_len,
            params.max_len,
            rng,
        ));
    }

    score_population(config, params, candidates)
}

fn score_population(config: &Config, params: &Params, candidates: Vec<Candidate>) -> Vec<Individual> {
    if params.parallel {
        candidates
            .into_par_iter()
            .map(|c| evaluate(config, params, c))
            .collect()
    } else {
        candidates
            .into_iter()
            .map(|c| evaluate(config, params, c))
            .collect()
    }
}

fn tournament_select<'a>(population: &'a [Individual], rng: &mut Rng) -> &'a Individual {
    let n = population.len();
    let mut best = &population[rng.gen_range(0..n)];
    for _ in 0..2 {
        let challenger = &population[rng.gen_range(0..n)];
        if challenger.result.fitness > best.result.fitness {
            best = challenger;
        }
    }
    best
}

/// Two-point crossover on the shorter-length bound: cuts `a ≤ b` uniform
/// over `[0, min(|p1|,|p2|))`, then splices `p1[0..a] ⧺ p2[a..b] ⧺ p1[b..]`
/// and its symmetric counterpart, producing both children from one pairing.
fn crossover_pair(a: &Candidate, b: &Candidate, rng: &mut Rng) -> (Candidate, Candidate) {
    let bound = a.len().min(b.len());
    if bound < 2 {
        return (a.clone(), b.clone());
    }
    let mut cut_a = rng.gen_range(0..bound);
    let mut cut_b = rng.gen_range(0..bound);
    if cut_a > cut_b {
        std::mem::swap(&mut cut_a, &mut cut_b);
    }

    let mut child1 = Candidate::new();
    child1.extend_from_slice(&a[..cut_a]);
    child1.extend_from_slice(&b[cut_a..cut_b]);
    child1.extend_from_slice(&a[cut_b..]);

    let mut child2 = Candidate::new();
    child2.extend_from_slice(&b[..cut_a]);
    child2.extend_from_slice(&a[cut_a..cut_b]);
    child2.extend_from_slice(&b[cut_b..]);

    (child1, child2)
}

fn mutate(candidate: &mut Candidate, config: &Config, rate: f64, rng: &mut Rng) {
    let process_count = config.processes().len();
    if process_count == 0 {
        return;
    }
    for slot in candidate.iter_mut() {
        if rng.gen_bool(rate) {
            *slot = rng.gen_range(0..process_count) as u32;
        }
    }
}

fn next_generation(
    config: &Config,
    analysis: &Analysis,
    params: &Params,
    population: &[Individual],
    rng: &mut Rng,
) -> Vec<Individual> {
    let mut ranked: Vec<&Individual> = population.iter().collect();
    ranked.sort_by(|a, b| b.result.fitness.total_cmp(&a.result.fitness));

    let mut next_candidates: Vec<Candidate> = ranked
        .iter()
        .take(params.elite_count)
        .map(|ind| ind.candidate.clone())
        .collect();

    while next_candidates.len() < params.population {
        let parent_a = tournament_select(population, rng);
        let parent_b = tournament_select(population, rng);
        let (mut child1, mut child2) = if rng.gen_bool(params.crossover_rate) {
            crossover_pair(&parent_a.candidate, &parent_b.candidate, rng)
        } else {
            (parent_a.candidate.clone(), parent_b.candidate.clone())
        };

        for child in [&mut child1, &mut child2] {
            mutate(child, config, params.mutation_rate, rng);
            if child.is_empty() {
                let strategy = seed::random_strategy(rng);
                *child = seed::build(
                    config,
                    analysis,
                    strategy,
                    params.min_len,
                    params.max_len,
                    rng,
                );
            }
        }

        next_candidates.push(child1);
        if next_candidates.len() < params.population {
            next_candidates.push(child2);
        }
    }

    score_population(config, params, next_candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::domain::ConfigBuilder;
    use rand::SeedableRng;

    fn config_e1() -> Config {
        let mut b = ConfigBuilder::new();
        b.stock("euro", 100);
        b.process("buy_fruit", &[("euro", 5)], &[("fruit", 1)], 1);
        b.goal_resource("fruit");
        b.build()
    }

    fn small_params() -> Params {
        Params {
            generations: 15,
            population: 12,
            mutation_rate: 0.05,
            crossover_rate: 0.7,
            elite_count: 2,
            min_len: 2,
            max_len: 20,
            sim_budget: 30,
            stagnation_patience: 5,
            parallel: false,
        }
    }

    #[test]
    fn fitness_never_regresses_from_initial_best() {
        let config = config_e1();
        let analysis = analyze(&config);
        let params = small_params();
        let mut rng = Rng::seed_from_u64(11);

        let population = initial_population(&config, &analysis, &params, &mut rng);
        let initial_best = population
            .iter()
            .map(|i| i.result.fitness)
            .fold(f64::NEG_INFINITY, f64::max);

        let outcome = run(&config, &analysis, &params, &mut Rng::seed_from_u64(11));
        assert!(outcome.best.result.fitness >= initial_best);
    }

    #[test]
    fn crossover_pair_produces_two_children_of_matching_total_length() {
        let a: Candidate = smallvec::smallvec![1, 2, 3, 4, 5];
        let b: Candidate = smallvec::smallvec![6, 7, 8, 9, 10];
        let mut rng = Rng::seed_from_u64(3);
        let (child1, child2) = crossover_pair(&a, &b, &mut rng);
        assert_eq!(child1.len(), a.len());
        assert_eq!(child2.len(), b.len());
    }

    #[test]
    fn parallel_and_sequential_scoring_agree_on_fitness() {
        let config = config_e1();
        let candidates: Vec<Candidate> = (0..8)
            .map(|n| smallvec::smallvec![0; (n % 4) + 1])
            .collect();
        let mut params = small_params();
        params.parallel = false;
        let seq = score_population(&config, &params, candidates.clone());
        params.parallel = true;
        let par = score_population(&config, &params, candidates);
        let mut seq_fit: Vec<f64> = seq.iter().map(|i| i.result.fitness).collect();
        let mut par_fit: Vec<f64> = par.iter().map(|i| i.result.fitness).collect();
        seq_fit.sort_by(f64::total_cmp);
        par_fit.sort_by(f64::total_cmp);
        assert_eq!(seq_fit, par_fit);
    }

    #[test]
    fn early_stopping_triggers_within_declared_patience() {
        let config = config_e1();
        let analysis = analyze(&config);
        let mut params = small_params();
        params.generations = 1000;
        params.stagnation_patience = 3;
        let mut rng = Rng::seed_from_u64(5);
        let outcome = run(&config, &analysis, &params, &mut rng);
        assert!(outcome.generations_run <= 1000);
        if outcome.stopped_early {
            assert!(outcome.generations_run <= 1000);
        }
    }
}
