//! Turns a [`ParsedConfig`] into a trusted [`planner_core::Config`],
//! collecting every violation rather than stopping at the first.

use crate::error::{ConfigError, ConfigErrors};
use crate::parser::ParsedConfig;
use planner_core::ConfigBuilder;
use std::collections::{HashMap, HashSet};

pub fn validate(parsed: &ParsedConfig) -> Result<planner_core::Config, ConfigErrors> {
    let mut errors = Vec::new();

    if parsed.processes.is_empty() {
        errors.push(ConfigError::NoProcesses);
    }
    if parsed.stocks.is_empty() {
        errors.push(ConfigError::NoStocks);
    }
    if parsed.goals.is_empty() {
        errors.push(ConfigError::NoGoals);
    }

    let mut seen_stock_names: HashMap<&str, usize> = HashMap::new();
    for stock in &parsed.stocks {
        if seen_stock_names.contains_key(stock.name.as_str()) {
            errors.push(ConfigError::DuplicateName {
                line: stock.line,
                name: stock.name.clone(),
            });
        } else {
            seen_stock_names.insert(&stock.name, stock.line);
        }
    }

    let mut seen_process_names: HashMap<&str, usize> = HashMap::new();
    for process in &parsed.processes {
        if seen_process_names.contains_key(process.name.as_str()) {
            errors.push(ConfigError::DuplicateName {
                line: process.line,
                name: process.name.clone(),
            });
        } else {
            seen_process_names.insert(&process.name, process.line);
        }
    }

    // Every resource name that appears anywhere: as a stock, or as a process
    // input/output. Unknown-resource checks below only apply to goals, since
    // the format's rule is that a process output with no matching stock line
    // implicitly starts at zero.
    let mut known_resources: HashSet<&str> = HashSet::new();
    for stock in &parsed.stocks {
        known_resources.insert(&stock.name);
    }
    for process in &parsed.processes {
        for (name, _) in process.needs.iter().chain(process.results.iter()) {
            known_resources.insert(name);
        }
    }

    for goal_line in &parsed.goals {
        for goal in &goal_line.goals {
            if goal != planner_core::domain::TIME_RESOURCE && !known_resources.contains(goal.as_str()) {
                errors.push(ConfigError::UnknownResource {
                    line: goal_line.line,
                    resource: goal.clone(),
                    context: "goal".to_string(),
                });
            }
        }
    }

    if !errors.is_empty() {
        return Err(ConfigErrors(errors));
    }

    let mut builder = ConfigBuilder::new();
    for stock in &parsed.stocks {
        builder.stock(&stock.name, stock.qty);
    }
    for process in &parsed.processes {
        let needs: Vec<(&str, i64)> = process.needs.iter().map(|(n, q)| (n.as_str(), *q)).collect();
        let results: Vec<(&str, i64)> = process.results.iter().map(|(n, q)| (n.as_str(), *q)).collect();
        builder.process(process.name.clone(), &needs, &results, process.delay as u32);
    }
    for goal_line in &parsed.goals {
        for goal in &goal_line.goals {
            if goal == planner_core::domain::TIME_RESOURCE {
                builder.goal_time();
            } else {
                builder.goal_resource(goal);
            }
        }
    }

    Ok(builder.build())
}
