//! Golden-file fixtures for the config grammar: real config text embedded
//! with `include_str!` rather than constructed inline, so the parser and
//! validator are exercised against the same on-disk shape a user would
//! actually write.

use planner_core::domain::TIME_RESOURCE;
use planner_core::Goal;

#[test]
fn smoothie_fixture_builds_a_single_process_with_two_goals() {
    let text = include_str!("fixtures/smoothie.txt");
    let config = planner_config::load(text).expect("fixture must be valid");
    assert_eq!(config.processes().len(), 1);
    assert_eq!(config.goals().len(), 2);
    assert!(config.goals().contains(&Goal::Time));
}

#[test]
fn chain_fixture_leaves_the_intermediate_resource_at_implicit_zero() {
    let text = include_str!("fixtures/chain.txt");
    let config = planner_config::load(text).expect("fixture must be valid");
    let b = config.resource_id("b").expect("b is referenced by both processes");
    assert_eq!(config.initial_stock(b), 0);
    assert_eq!(config.processes().len(), 2);
}

#[test]
fn duplicate_name_fixture_is_rejected_with_line_context() {
    let text = include_str!("fixtures/malformed_duplicate.txt");
    let errors = planner_config::load(text).unwrap_err();
    assert!(errors
        .errors()
        .iter()
        .any(|e| matches!(e, planner_config::ConfigError::DuplicateName { name, .. } if name == "euro")));
}

#[test]
fn time_resource_name_matches_the_reserved_sentinel() {
    // Sanity check that the fixture's `time` goal and the domain's reserved
    // pseudo-resource name agree, since the fixtures hardcode the literal.
    assert_eq!(TIME_RESOURCE, "time");
}
