//! Integration tests for closure views and root discovery.
//!
//! Uses the Boeing 777 turnaround network as fixture.

mod common;

use common::{AIRBUS, BOEING, TestEnv, flatten_dependencies, flatten_dependents, names};
use depnet::{Direction, StoreClosureExt};

// =============================================================================
// Task View
// =============================================================================

#[test]
fn test_boarding_has_single_dependent() {
    let env = TestEnv::boeing();
    let boarding = env.task(BOEING, "boarding");

    let node = env.store.expand(&boarding, Direction::Dependents).unwrap();

    assert_eq!(names(&node.dependents), vec!["ADC"]);
    assert!(node.dependents[0].dependents.is_empty());
    assert!(node.dependencies.is_empty());
}

#[test]
fn test_task_view_has_both_directions() {
    let env = TestEnv::boeing();

    let node = env.store.task_view(BOEING, "boarding").unwrap();

    assert_eq!(node.name, "boarding");
    assert_eq!(names(&node.dependencies), vec!["security check", "cabin check"]);
    assert_eq!(names(&node.dependents), vec!["ADC"]);
}

#[test]
fn test_task_view_of_leaf() {
    let env = TestEnv::boeing();

    let node = env.store.task_view(BOEING, "cleaning").unwrap();

    assert_eq!(flatten_dependencies(&node), vec!["deboarding", "ADO"]);
    assert!(node.dependents.is_empty());
}

#[test]
fn test_dependents_closure_of_ado() {
    let env = TestEnv::boeing();
    let ado = env.task(BOEING, "ADO");

    let node = env.store.expand(&ado, Direction::Dependents).unwrap();

    assert_eq!(names(&node.dependents), vec!["deboarding", "unloading"]);
    assert_eq!(
        names(&node.dependents[0].dependents),
        vec!["offload catering", "cleaning"]
    );
    assert_eq!(
        flatten_dependents(&node),
        vec!["deboarding", "offload catering", "cleaning", "unloading"]
    );
}

#[test]
fn test_dependencies_closure_of_adc() {
    let env = TestEnv::boeing();
    let adc = env.task(BOEING, "ADC");

    let node = env.store.expand(&adc, Direction::Dependencies).unwrap();

    assert_eq!(
        flatten_dependencies(&node),
        vec!["boarding", "security check", "cabin check"]
    );
}

#[test]
fn test_same_name_in_other_network_is_separate() {
    let env = TestEnv::boeing();

    let node = env.store.task_view(AIRBUS, "ADO").unwrap();

    assert!(node.dependents.is_empty());
    assert!(node.dependencies.is_empty());
}

// =============================================================================
// Network View
// =============================================================================

#[test]
fn test_network_view_roots() {
    let env = TestEnv::boeing();

    let roots = env.store.network_view(BOEING).unwrap();

    assert_eq!(names(&roots), vec!["ADO", "security check", "cabin check"]);
    assert!(roots.iter().all(|r| r.dependencies.is_empty()));
}

#[test]
fn test_network_view_expands_each_root() {
    let env = TestEnv::boeing();

    let roots = env.store.network_view(BOEING).unwrap();

    assert_eq!(
        flatten_dependents(&roots[0]),
        vec!["deboarding", "offload catering", "cleaning", "unloading"]
    );
    // boarding is reachable from both checks and appears under each
    assert_eq!(flatten_dependents(&roots[1]), vec!["boarding", "ADC"]);
    assert_eq!(flatten_dependents(&roots[2]), vec!["boarding", "ADC"]);
}

#[test]
fn test_network_view_of_other_network() {
    let env = TestEnv::boeing();

    let roots = env.store.network_view(AIRBUS).unwrap();

    assert_eq!(names(&roots), vec!["ADO"]);
}

#[test]
fn test_roots_follow_edge_changes() {
    let mut env = TestEnv::boeing();
    let boarding = env.task(BOEING, "boarding");
    let cabin = env.task(BOEING, "cabin check");

    env.store.remove_edge(&boarding.id, &cabin.id).unwrap();
    env.depend(BOEING, "cabin check", "cleaning");

    let roots = env.store.network_view(BOEING).unwrap();
    assert_eq!(names(&roots), vec!["ADO", "security check"]);
}

#[test]
fn test_view_serializes_as_nested_json() {
    let env = TestEnv::boeing();

    let node = env.store.task_view(BOEING, "boarding").unwrap();
    let json = serde_json::to_value(&node).unwrap();

    assert_eq!(json["name"], "boarding");
    assert_eq!(json["dependents"][0]["name"], "ADC");
    assert_eq!(json["dependencies"][1]["name"], "cabin check");
}
