//! Parses the line-oriented config text format into an unvalidated
//! intermediate form; [`crate::validator`] turns that into a trusted
//! [`planner_core::Config`].

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLine {
    pub line: usize,
    pub name: String,
    pub qty: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessLine {
    pub line: usize,
    pub name: String,
    pub needs: Vec<(String, i64)>,
    pub results: Vec<(String, i64)>,
    pub delay: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalLine {
    pub line: usize,
    pub goals: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedConfig {
    pub stocks: Vec<StockLine>,
    pub processes: Vec<ProcessLine>,
    pub goals: Vec<GoalLine>,
}

/// Parses `text`, collecting every malformed-line error rather than stopping
/// at the first one.
pub fn parse(text: &str) -> Result<ParsedConfig, Vec<ConfigError>> {
    let mut parsed = ParsedConfig::default();
    let mut errors = Vec::new();

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix("optimize:") {
            match parse_goal_list(rest) {
                Some(goals) if !goals.is_empty() => {
                    parsed.goals.push(GoalLine {
                        line: line_no,
                        goals,
                    });
                }
                Some(_) => errors.push(ConfigError::EmptyGoalList { line: line_no }),
                None => errors.push(malformed(line_no, trimmed)),
            }
            continue;
        }

        match parse_process_line(line_no, trimmed) {
            Some(Ok(process)) => {
                parsed.processes.push(process);
                continue;
            }
            Some(Err(e)) => {
                errors.push(e);
                continue;
            }
            None => {}
        }

        match parse_stock_line(line_no, trimmed) {
            Some(Ok(stock)) => parsed.stocks.push(stock),
            Some(Err(e)) => errors.push(e),
            None => errors.push(malformed(line_no, trimmed)),
        }
    }

    if errors.is_empty() {
        Ok(parsed)
    } else {
        Err(errors)
    }
}

fn malformed(line: usize, text: &str) -> ConfigError {
    ConfigError::MalformedLine {
        line,
        text: text.to_string(),
    }
}

fn parse_goal_list(rest: &str) -> Option<Vec<String>> {
    let inner = rest.trim().strip_prefix('(')?.strip_suffix(')')?;
    Some(
        inner
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// A process line looks like `name:(needs):(results):delay`. We distinguish
/// it from a stock line by the presence of parentheses after the first colon.
fn parse_process_line(line: usize, text: &str) -> Option<Result<ProcessLine, ConfigError>> {
    let (name, rest) = text.split_once(':')?;
    if !rest.trim_start().starts_with('(') {
        return None;
    }

    let parts: Vec<&str> = split_top_level(rest)?;
    if parts.len() != 3 {
        return Some(Err(malformed(line, text)));
    }

    let needs = match parse_quantity_list(parts[0]) {
        Ok(list) => list,
        Err(()) => return Some(Err(malformed(line, text))),
    };
    let results = match parse_quantity_list(parts[1]) {
        Ok(list) => list,
        Err(()) => return Some(Err(malformed(line, text))),
    };
    let delay: i64 = match parts[2].trim().parse() {
        Ok(d) => d,
        Err(_) => return Some(Err(malformed(line, text))),
    };

    for &(ref resource, qty) in needs.iter().chain(results.iter()) {
        if qty <= 0 {
            return Some(Err(ConfigError::NonPositiveQuantity {
                line,
                resource: resource.clone(),
                quantity: qty,
            }));
        }
    }
    if delay <= 0 {
        return Some(Err(ConfigError::NonPositiveDelay {
            line,
            process: name.trim().to_string(),
            delay,
        }));
    }

    Some(Ok(ProcessLine {
        line,
        name: name.trim().to_string(),
        needs,
        results,
        delay,
    }))
}

/// Splits `(a):(b):c` into `["a", "b", "c"]`, respecting the two required
/// parenthesized groups and the trailing bare delay field.
fn split_top_level(rest: &str) -> Option<Vec<&str>> {
    let rest = rest.trim();
    let first_close = rest.find(')')?;
    let first_group = rest.get(1..first_close)?; // strip leading '('
    let after_first = rest.get(first_close + 1..)?.strip_prefix(':')?;

    let second_close = after_first.find(')')?;
    let second_group = after_first.get(1..second_close)?;
    let after_second = after_first.get(second_close + 1..)?.strip_prefix(':')?;

    Some(vec![first_group, second_group, after_second])
}

fn parse_quantity_list(text: &str) -> Result<Vec<(String, i64)>, ()> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    text.split(';')
        .map(|entry| {
            let (name, qty) = entry.trim().split_once(':').ok_or(())?;
            let qty: i64 = qty.trim().parse().map_err(|_| ())?;
            Ok((name.trim().to_string(), qty))
        })
        .collect()
}

fn parse_stock_line(line: usize, text: &str) -> Option<Result<StockLine, ConfigError>> {
    let (name, qty_str) = text.split_once(':')?;
    let qty: i64 = match qty_str.trim().parse() {
        Ok(q) => q,
        Err(_) => return Some(Err(malformed(line, text))),
    };
    if qty < 0 {
        return Some(Err(ConfigError::NegativeStock {
            line,
            resource: name.trim().to_string(),
            quantity: qty,
        }));
    }
    Some(Ok(StockLine {
        line,
        name: name.trim().to_string(),
        qty,
    }))
}
