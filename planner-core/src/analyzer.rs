//! C3: mines the resource/process graph for structural priorities used to
//! build high-quality seed schedules.
//!
//! Everything here is a heuristic, not an exact computation; the only hard
//! requirements are that it terminates (depth-capped BFS, §9) and that its
//! output steers [`crate::seed`] away from starving [`Analysis::critical`]
//! resources (tested in the `e6_critical_resource_guard` scenario).

use crate::domain::{Config, Goal, ProcessId, ResourceId};
use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;
use tracing::instrument;

/// Priorities assigned to processes with no path back to a goal producer.
const SENTINEL_LOW_PRIORITY: i32 = 1_000;
/// Back-propagation and reverse-BFS depth cap; see design note in §9.
const MAX_HOPS: u32 = 12;

const GOAL_UNIT_VALUE: f64 = 100.0;
const OTHER_UNIT_VALUE: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct Analysis {
    /// Per-process priority; smaller is better. Indexed by [`ProcessId`].
    pub priority: Vec<i32>,
    /// Initial resources whose depletion would strand the scheduler.
    pub critical: AHashSet<ResourceId>,
    /// Back-propagated minimum desired quantity for key intermediates.
    pub reserve_targets: AHashMap<ResourceId, i64>,
}

#[instrument(name = "analyze", skip(config))]
pub fn analyze(config: &Config) -> Analysis {
    let priority = process_priority(config);
    let critical = critical_resources(config);
    let reserve_targets = reserve_targets(config);
    Analysis {
        priority,
        critical,
        reserve_targets,
    }
}

fn goal_resources(config: &Config) -> AHashSet<ResourceId> {
    config
        .goals()
        .iter()
        .filter_map(|g| match g {
            Goal::Resource(r) => Some(*r),
            Goal::Time => None,
        })
        .collect()
}

/// Estimated unit value of a resource: goal resources are worth more.
fn unit_value(_config: &Config, goals: &AHashSet<ResourceId>, resource: ResourceId) -> f64 {
    if goals.contains(&resource) {
        GOAL_UNIT_VALUE
    } else {
        OTHER_UNIT_VALUE
    }
}

fn profit_margin(config: &Config, goals: &AHashSet<ResourceId>, process: ProcessId) -> f64 {
    let p = config.process(process);
    let input_cost: f64 = p
        .inputs
        .iter()
        .map(|&(r, qty)| unit_value(config, goals, r) * qty as f64)
        .sum();
    let output_value: f64 = p
        .outputs
        .iter()
        .map(|&(r, qty)| unit_value(config, goals, r) * qty as f64)
        .sum();
    if input_cost <= 0.0 {
        // Free to run and produces value: treat as maximally profitable.
        return f64::INFINITY;
    }
    (output_value - input_cost) / input_cost
}

fn process_priority(config: &Config) -> Vec<i32> {
    let goals = goal_resources(config);
    let n = config.processes().len();
    let mut priority = vec![SENTINEL_LOW_PRIORITY; n];

    // BFS frontier: processes whose outputs contain a goal resource start at
    // distance 0; everything else is the reverse-BFS distance to that set,
    // walking backward through "who produces my inputs".
    let mut queue: VecDeque<(ProcessId, u32)> = VecDeque::new();
    let mut visited = vec![false; n];
    for pid in 0..n as ProcessId {
        if config
            .process(pid)
            .outputs
            .iter()
            .any(|&(r, _)| goals.contains(&r))
        {
            priority[pid as usize] = 0;
            visited[pid as usize] = true;
            queue.push_back((pid, 0));
        }
    }
    while let Some((pid, dist)) = queue.pop_front() {
        if dist >= MAX_HOPS {
            continue;
        }
        for &(res, _) in &config.process(pid).inputs {
            for &upstream in config.producers_of(res) {
                if !visited[upstream as usize] {
                    visited[upstream as usize] = true;
                    priority[upstream as usize] = dist as i32 + 1;
                    queue.push_back((upstream, dist + 1));
                }
            }
        }
    }

    for pid in 0..n as ProcessId {
        let margin = profit_margin(config, &goals, pid);
        if margin > 100.0 {
            priority[pid as usize] -= 5;
        } else if margin > 10.0 {
            priority[pid as usize] -= 2;
        } else if margin < -10.0 {
            priority[pid as usize] += 3;
        }

        if let Some(bonus) = downstream_bulk_bonus(config, &goals, pid) {
            priority[pid as usize] -= bonus;
        }
    }

    priority
}

/// Looks one hop downstream (consumers of this process's outputs) for a
/// consumer whose own output is a goal at a scale worth prioritizing for.
fn downstream_bulk_bonus(config: &Config, goals: &AHashSet<ResourceId>, pid: ProcessId) -> Option<i32> {
    let mut best: Option<i32> = None;
    for &(out_res, _) in &config.process(pid).outputs {
        for &consumer in config.consumers_of(out_res) {
            let consumer_process = config.process(consumer);
            let goal_output_qty = consumer_process
                .outputs
                .iter()
                .filter(|&&(r, _)| goals.contains(&r))
                .map(|&(_, qty)| qty)
                .max();
            let Some(goal_qty) = goal_output_qty else {
                continue;
            };
            let has_bulk_input = consumer_process.inputs.iter().any(|&(_, qty)| qty > 50);
            let bonus = if goal_qty > 100 && has_bulk_input {
                5
            } else if goal_qty > 10 {
                2
            } else {
                0
            };
            if bonus > 0 {
                best = Some(best.map_or(bonus, |b: i32| b.max(bonus)));
            }
        }
    }
    best
}

fn critical_resources(config: &Config) -> AHashSet<ResourceId> {
    let total_processes = config.processes().len();
    let mut critical = AHashSet::new();
    if total_processes == 0 {
        return critical;
    }
    for resource in 0..config.resource_count() as ResourceId {
        if config.initial_stock(resource) != 1 {
            continue;
        }
        let consumer_count = config.consumers_of(resource).len();
        let is_critical = consumer_count > 2
            || consumer_count as f64 >= 0.8 * total_processes as f64
            || consumer_count == total_processes;
        if is_critical {
            critical.insert(resource);
        }
    }
    critical
}

/// Output-per-cycle of `process` for `resource`, used to rank producers.
fn output_rate(config: &Config, process: ProcessId, resource: ResourceId) -> f64 {
    let p = config.process(process);
    let qty = p
        .outputs
        .iter()
        .find(|&&(r, _)| r == resource)
        .map(|&(_, qty)| qty)
        .unwrap_or(0);
    qty as f64 / p.duration.max(1) as f64
}

fn reserve_targets(config: &Config) -> AHashMap<ResourceId, i64> {
    let goals = goal_resources(config);
    let mut targets: AHashMap<ResourceId, i64> = AHashMap::new();

    // Identify the highest-profit goal-producing process.
    let best_goal_producer = (0..config.processes().len() as ProcessId)
        .filter(|&pid| {
            config
                .process(pid)
                .outputs
                .iter()
                .any(|&(r, _)| goals.contains(&r))
        })
        .max_by(|&a, &b| {
            profit_margin(config, &goals, a)
                .partial_cmp(&profit_margin(config, &goals, b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

    let Some(root) = best_goal_producer else {
        return targets;
    };

    let root_output_value: f64 = config
        .process(root)
        .outputs
        .iter()
        .map(|&(r, qty)| unit_value(config, &goals, r) * qty as f64)
        .sum();
    let target_runs = if root_output_value >= 1000.0 {
        10
    } else if root_output_value >= 500.0 {
        8
    } else if root_output_value >= 200.0 {
        6
    } else if root_output_value >= 100.0 {
        4
    } else if root_output_value >= 50.0 {
        2
    } else {
        1
    };

    let mut visited: AHashSet<ResourceId> = AHashSet::new();
    let mut queue: VecDeque<(ProcessId, i64, u32)> = VecDeque::new();
    queue.push_back((root, target_runs, 0));

    while let Some((pid, runs, depth)) = queue.pop_front() {
        if depth >= MAX_HOPS {
            continue;
        }
        for &(res, qty) in &config.process(pid).inputs {
            if visited.contains(&res) {
                continue;
            }
            visited.insert(res);
            let required = qty * runs;
            let buffer = 1.0 + (depth as f64 * 0.1).min(1.0);
            let target = (required as f64 * buffer).ceil() as i64;
            let entry = targets.entry(res).or_insert(0);
            *entry = (*entry).max(target);

            let best_producer = config
                .producers_of(res)
                .iter()
                .copied()
                .max_by(|&a, &b| {
                    output_rate(config, a, res)
                        .partial_cmp(&output_rate(config, b, res))
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            if let Some(producer) = best_producer {
                let rate = output_rate(config, producer, res).max(0.0001);
                let producer_runs = (required as f64 / rate).ceil() as i64;
                queue.push_back((producer, producer_runs.max(1), depth + 1));
            }
        }
    }

    targets
}
