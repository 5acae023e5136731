//! Shared test infrastructure for depnet integration tests.
//!
//! Provides TestEnv helper for consistent test setup/teardown, and the
//! Boeing 777 turnaround fixture.

#![allow(dead_code)]

use depnet::{Edge, EdgeFilter, Network, Store, StoreError, Task, TaskNode, TaskSpec};
use tempfile::TempDir;

pub const BOEING: &str = "Boeing 777";
pub const AIRBUS: &str = "Airbus A380";

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub store: Store,
}

impl TestEnv {
    /// Create a new test environment with an initialized store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::init(temp_dir.path()).expect("Failed to init store");
        Self { temp_dir, store }
    }

    /// Store with the Boeing 777 turnaround network and an Airbus network
    /// holding its own ADO task.
    pub fn boeing() -> Self {
        let mut env = Self::new();
        let boeing = env.create_network(BOEING);
        let airbus = env.create_network(AIRBUS);
        env.create_task(&airbus, "ADO");

        for name in [
            "ADO",
            "deboarding",
            "unloading",
            "offload catering",
            "cleaning",
            "security check",
            "cabin check",
            "boarding",
            "ADC",
        ] {
            env.create_task(&boeing, name);
        }

        for (task, depends_on) in [
            ("deboarding", "ADO"),
            ("unloading", "ADO"),
            ("offload catering", "deboarding"),
            ("cleaning", "deboarding"),
            ("boarding", "security check"),
            ("boarding", "cabin check"),
            ("ADC", "boarding"),
        ] {
            env.depend(BOEING, task, depends_on);
        }

        env
    }

    /// Create a network with a generated description.
    pub fn create_network(&mut self, key: &str) -> Network {
        self.store
            .create_network(key, &format!("dependency network of {} tasks", key))
            .expect("Failed to create network")
    }

    /// Create a task whose description is its name.
    pub fn create_task(&mut self, network: &Network, name: &str) -> Task {
        self.store
            .create_task(&TaskSpec::new(&network.id, name, name))
            .expect("Failed to create task")
    }

    /// Look up a task by network key and name.
    pub fn task(&self, network: &str, name: &str) -> Task {
        self.store.find_task(network, name).expect("Failed to find task")
    }

    /// Record that `task` depends on `depends_on`, both by name.
    pub fn depend(&mut self, network: &str, task: &str, depends_on: &str) -> Edge {
        let task = self.task(network, task);
        let depends_on = self.task(network, depends_on);
        self.store
            .add_edge(&task.id, &depends_on.id)
            .expect("Failed to add edge")
    }

    /// Number of tasks in a network.
    pub fn task_count(&self, network: &str) -> usize {
        let network = self.store.require_network(network).expect("Failed to get network");
        self.store.list_tasks(&network.id).expect("Failed to list tasks").len()
    }

    /// Number of edges in the whole store.
    pub fn edge_count(&self) -> usize {
        self.store.edges(&EdgeFilter::new()).expect("Failed to list edges").len()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Names of a list of nodes, in order.
pub fn names(nodes: &[TaskNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.name.as_str()).collect()
}

/// Every name in one direction of a tree below the root, once per path.
pub fn flatten_dependents(node: &TaskNode) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack: Vec<&TaskNode> = node.dependents.iter().rev().collect();
    while let Some(n) = stack.pop() {
        out.push(n.name.clone());
        stack.extend(n.dependents.iter().rev());
    }
    out
}

/// Every name upstream of the root, once per path.
pub fn flatten_dependencies(node: &TaskNode) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack: Vec<&TaskNode> = node.dependencies.iter().rev().collect();
    while let Some(n) = stack.pop() {
        out.push(n.name.clone());
        stack.extend(n.dependencies.iter().rev());
    }
    out
}

/// The store error carried by a report.
pub fn store_error(report: &eyre::Report) -> StoreError {
    StoreError::from_report(report)
        .cloned()
        .unwrap_or_else(|| panic!("expected a StoreError, got: {:?}", report))
}
