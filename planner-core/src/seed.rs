//! C4: builds one candidate schedule by greedy selection guided by the
//! [`Analysis`] from [`crate::analyzer`]. Four strategies are exposed; a
//! strategy is picked uniformly at random by the caller (the evolution
//! engine's initial-population step).

use crate::analyzer::Analysis;
use crate::domain::{Config, ProcessId};
use crate::rng::Rng;
use crate::simulator::Candidate;
use rand::Rng as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    PriorityConservative,
    TypeRotation,
    PriorityRandomized,
    HierarchicalReserve,
}

const STRATEGIES: [Strategy; 4] = [
    Strategy::PriorityConservative,
    Strategy::TypeRotation,
    Strategy::PriorityRandomized,
    Strategy::HierarchicalReserve,
];

pub fn random_strategy(rng: &mut Rng) -> Strategy {
    STRATEGIES[rng.gen_range(0..STRATEGIES.len())]
}

/// Uniform-random candidate: every position is an independently uniform
/// process choice, length uniform over `[min_len, max_len]`. Used directly
/// by [`crate::evolution`] for the "30% random" slice of the initial
/// population; the four structured strategies above cover the rest.
pub fn build_uniform_random(
    config: &Config,
    min_len: usize,
    max_len: usize,
    rng: &mut Rng,
) -> Candidate {
    let process_count = config.processes().len();
    if process_count == 0 {
        return Candidate::new();
    }
    let len = if max_len > min_len {
        rng.gen_range(min_len..=max_len)
    } else {
        min_len.max(1)
    };
    (0..len)
        .map(|_| rng.gen_range(0..process_count) as ProcessId)
        .collect()
}

/// Builds a candidate of length in `[min_len, max_len]` using `strategy`.
pub fn build(
    config: &Config,
    analysis: &Analysis,
    strategy: Strategy,
    min_len: usize,
    max_len: usize,
    rng: &mut Rng,
) -> Candidate {
    let mut candidate: Candidate = match strategy {
        Strategy::PriorityConservative => priority_conservative(config, analysis, max_len, None),
        Strategy::TypeRotation => type_rotation(config, analysis, max_len),
        Strategy::PriorityRandomized => {
            priority_conservative(config, analysis, max_len, Some(rng))
        }
        Strategy::HierarchicalReserve => hierarchical_reserve(config, analysis, max_len),
    };

    if candidate.is_empty() && !config.processes().is_empty() {
        // Every strategy can legitimately produce nothing if stocks are too
        // thin; fall back so the population always has a non-trivial seed.
        candidate.push(rng.gen_range(0..config.processes().len()) as ProcessId);
    }

    while candidate.len() < min_len && !candidate.is_empty() {
        let pick = candidate[rng.gen_range(0..candidate.len())];
        candidate.push(pick);
    }

    candidate
}

/// Simulates forward one process at a time to know what's currently
/// affordable, without the overhead of the full scored simulator.
struct GreedyState {
    stocks: Vec<i64>,
}

impl GreedyState {
    fn new(config: &Config) -> Self {
        GreedyState {
            stocks: config.initial_stocks().to_vec(),
        }
    }

    fn can_start(&self, config: &Config, pid: ProcessId) -> bool {
        config
            .process(pid)
            .inputs
            .iter()
            .all(|&(r, qty)| self.stocks[r as usize] >= qty)
    }

    /// Would starting `pid` leave any critical resource at exactly 0?
    fn would_zero_critical(&self, config: &Config, analysis: &Analysis, pid: ProcessId) -> bool {
        config.process(pid).inputs.iter().any(|&(r, qty)| {
            analysis.critical.contains(&r) && self.stocks[r as usize] - qty <= 0
        })
    }

    fn apply(&mut self, config: &Config, pid: ProcessId) {
        // Seed construction assumes instantaneous input->output for ranking
        // purposes only; the real timing is decided later by the simulator.
        for &(r, qty) in &config.process(pid).inputs {
            self.stocks[r as usize] -= qty;
        }
        for &(r, qty) in &config.process(pid).outputs {
            self.stocks[r as usize] += qty;
        }
    }
}

fn eligible(
    config: &Config,
    analysis: &Analysis,
    state: &GreedyState,
) -> Vec<ProcessId> {
    (0..config.processes().len() as ProcessId)
        .filter(|&pid| {
            state.can_start(config, pid) && !state.would_zero_critical(config, analysis, pid)
        })
        .collect()
}

fn best_by_priority(config: &Config, analysis: &Analysis, candidates: &[ProcessId]) -> Option<ProcessId> {
    candidates
        .iter()
        .copied()
        .min_by_key(|&pid| (analysis.priority[pid as usize], config.process(pid).duration))
}

fn priority_conservative(
    config: &Config,
    analysis: &Analysis,
    max_len: usize,
    mut rng: Option<&mut Rng>,
) -> Candidate {
    let mut state = GreedyState::new(config);
    let mut candidate = Candidate::new();

    while candidate.len() < max_len {
        let mut elig = eligible(config, analysis, &state);
        if elig.is_empty() {
            break;
        }
        let pick = if let Some(rng) = rng.as_deref_mut() {
            elig.sort_by_key(|&pid| analysis.priority[pid as usize]);
            let top_n = elig.len().min(3);
            elig[rng.gen_range(0..top_n)]
        } else {
            best_by_priority(config, analysis, &elig).unwrap()
        };
        state.apply(config, pick);
        candidate.push(pick);
    }

    candidate
}

fn type_of(name: &str) -> &str {
    name.split('_').next().unwrap_or(name)
}

fn type_rotation(config: &Config, analysis: &Analysis, max_len: usize) -> Candidate {
    let mut types: Vec<&str> = Vec::new();
    for p in config.processes() {
        let t = type_of(&p.name);
        if !types.contains(&t) {
            types.push(t);
        }
    }
    if types.is_empty() {
        return Candidate::new();
    }

    let mut state = GreedyState::new(config);
    let mut candidate = Candidate::new();
    let mut type_idx = 0;

    while candidate.len() < max_len {
        let elig = eligible(config, analysis, &state);
        if elig.is_empty() {
            break;
        }
        let current_type = types[type_idx % types.len()];
        let of_type: Vec<ProcessId> = elig
            .iter()
            .copied()
            .filter(|&pid| type_of(&config.process(pid).name) == current_type)
            .collect();
        let pick = best_by_priority(config, analysis, &of_type)
            .or_else(|| best_by_priority(config, analysis, &elig))
            .unwrap();
        state.apply(config, pick);
        candidate.push(pick);
        type_idx += 1;
    }

    candidate
}

fn hierarchical_reserve(config: &Config, analysis: &Analysis, max_len: usize) -> Candidate {
    let phases = build_phases(config);
    let phase1 = &phases[0];
    // The single phase-1 process this strategy is building the whole chain
    // toward; priority already folds in the economic-value bias, so the
    // lowest-priority phase-1 process is the most profitable seller.
    let most_profitable_seller = phase1
        .iter()
        .copied()
        .min_by_key(|&pid| analysis.priority[pid as usize]);

    let mut state = GreedyState::new(config);
    let mut candidate = Candidate::new();

    while candidate.len() < max_len {
        let elig: Vec<ProcessId> = eligible(config, analysis, &state)
            .into_iter()
            .filter(|&pid| {
                !violates_reserve_guard(config, analysis, &state, pid)
                    && !violates_sale_guard(
                        config,
                        analysis,
                        &state,
                        phase1,
                        most_profitable_seller,
                        pid,
                    )
            })
            .collect();
        if elig.is_empty() {
            break;
        }

        let mut picked = None;
        for phase in &phases {
            let in_phase: Vec<ProcessId> = elig
                .iter()
                .copied()
                .filter(|pid| phase.contains(pid))
                .collect();
            if in_phase.is_empty() {
                continue;
            }
            picked = Some(best_deficit_reducer(config, analysis, &state, &in_phase));
            break;
        }
        let pick = picked.unwrap_or_else(|| best_by_priority(config, analysis, &elig).unwrap());
        state.apply(config, pick);
        candidate.push(pick);
    }

    candidate
}

/// Chain-completion guard #1: forbid consuming an intermediate (a resource
/// some process produces, as opposed to a bare starting stock) while its
/// reserve target has not yet been reached. This is what keeps the
/// hierarchical strategy from raiding a half-built buffer that an earlier
/// phase is still accumulating toward.
fn violates_reserve_guard(
    config: &Config,
    analysis: &Analysis,
    state: &GreedyState,
    pid: ProcessId,
) -> bool {
    config.process(pid).inputs.iter().any(|&(r, _)| {
        if config.producers_of(r).is_empty() {
            return false;
        }
        match analysis.reserve_targets.get(&r) {
            Some(&target) => state.stocks[r as usize] < target,
            None => false,
        }
    })
}

/// Chain-completion guard #2: forbid "selling" any goal-producing process
/// until the reserve chain feeding the *most profitable* goal-producing
/// process is ready, so a cheap sale never gets to spend down resources the
/// high-value chain still needs.
fn violates_sale_guard(
    config: &Config,
    analysis: &Analysis,
    state: &GreedyState,
    phase1: &std::collections::HashSet<ProcessId>,
    most_profitable_seller: Option<ProcessId>,
    pid: ProcessId,
) -> bool {
    if !phase1.contains(&pid) {
        return false;
    }
    let Some(best) = most_profitable_seller else {
        return false;
    };
    config.process(best).inputs.iter().any(|&(r, _)| {
        if config.producers_of(r).is_empty() {
            return false;
        }
        match analysis.reserve_targets.get(&r) {
            Some(&target) => state.stocks[r as usize] < target,
            None => false,
        }
    })
}

/// Phase 1: directly produces a goal. Phase 2: produces a Phase-1 input.
/// Phase 3: produces a Phase-2 input. Processes may appear in only their
/// earliest phase.
fn build_phases(config: &Config) -> Vec<std::collections::HashSet<ProcessId>> {
    use std::collections::HashSet;
    let goals: HashSet<_> = config
        .goals()
        .iter()
        .filter_map(|g| match g {
            crate::domain::Goal::Resource(r) => Some(*r),
            crate::domain::Goal::Time => None,
        })
        .collect();

    let mut phase1 = HashSet::new();
    for pid in 0..config.processes().len() as ProcessId {
        if config
            .process(pid)
            .outputs
            .iter()
            .any(|&(r, _)| goals.contains(&r))
        {
            phase1.insert(pid);
        }
    }

    let phase1_inputs: HashSet<_> = phase1
        .iter()
        .flat_map(|&pid| config.process(pid).inputs.iter().map(|&(r, _)| r))
        .collect();
    let mut phase2 = HashSet::new();
    for pid in 0..config.processes().len() as ProcessId {
        if phase1.contains(&pid) {
            continue;
        }
        if config
            .process(pid)
            .outputs
            .iter()
            .any(|&(r, _)| phase1_inputs.contains(&r))
        {
            phase2.insert(pid);
        }
    }

    let phase2_inputs: HashSet<_> = phase2
        .iter()
        .flat_map(|&pid| config.process(pid).inputs.iter().map(|&(r, _)| r))
        .collect();
    let mut phase3 = HashSet::new();
    for pid in 0..config.processes().len() as ProcessId {
        if phase1.contains(&pid) || phase2.contains(&pid) {
            continue;
        }
        if config
            .process(pid)
            .outputs
            .iter()
            .any(|&(r, _)| phase2_inputs.contains(&r))
        {
            phase3.insert(pid);
        }
    }

    vec![phase1, phase2, phase3]
}

fn deficit_score(config: &Config, analysis: &Analysis, state: &GreedyState, pid: ProcessId) -> f64 {
    config
        .process(pid)
        .outputs
        .iter()
        .map(|&(r, qty)| {
            let target = analysis.reserve_targets.get(&r).copied().unwrap_or(0);
            let current = state.stocks[r as usize];
            let deficit = (target - current).max(0) as f64;
            deficit * qty as f64 / config.process(pid).duration.max(1) as f64
        })
        .sum()
}

fn best_deficit_reducer(
    config: &Config,
    analysis: &Analysis,
    state: &GreedyState,
    candidates: &[ProcessId],
) -> ProcessId {
    candidates
        .iter()
        .copied()
        .map(|pid| (pid, deficit_score(config, analysis, state, pid)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(pid, _)| pid)
        .unwrap_or(candidates[0])
}
