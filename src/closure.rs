//! Closure expansion: a task's upstream and downstream trees.
//!
//! Expansion walks the stored edges depth-first with an explicit stack of
//! frames, one per task on the current path, so deep networks do not grow the
//! call stack. A task reachable along several paths appears once per path;
//! the output is a tree, never a shared DAG. A task that shows up again inside
//! its own subtree fails the expansion with [`StoreError::CycleDetected`].
//!
//! Trees are serialized and compared recursively, so a path longer than
//! [`MAX_DEPTH`] tasks fails with [`StoreError::TooDeep`] instead.

use crate::graph::Graph;
use crate::store::{Store, StoreError};
use crate::types::{Task, TaskNode};
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Longest root-to-leaf path, in tasks, that an expansion will build.
pub const MAX_DEPTH: usize = 256;

/// Which way to follow the edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Downstream: tasks that depend on this one.
    Dependents,
    /// Upstream: tasks this one depends on.
    Dependencies,
}

struct Frame {
    node: TaskNode,
    pending: std::vec::IntoIter<String>,
}

impl Frame {
    fn new(graph: &Graph<'_>, task: Task, direction: Direction) -> Result<Self> {
        let next = match direction {
            Direction::Dependents => graph
                .edges_into(&task.id)?
                .into_iter()
                .map(|edge| edge.task_id)
                .collect::<Vec<_>>(),
            Direction::Dependencies => graph
                .edges_out_of(&task.id)?
                .into_iter()
                .map(|edge| edge.depends_on_task_id)
                .collect::<Vec<_>>(),
        };
        Ok(Self {
            node: TaskNode::from(task),
            pending: next.into_iter(),
        })
    }
}

fn children(node: &mut TaskNode, direction: Direction) -> &mut Vec<TaskNode> {
    match direction {
        Direction::Dependents => &mut node.dependents,
        Direction::Dependencies => &mut node.dependencies,
    }
}

/// Expand `task` in one direction into a fresh tree.
pub fn expand(graph: &Graph<'_>, task: &Task, direction: Direction) -> Result<TaskNode> {
    let mut stack = vec![Frame::new(graph, task.clone(), direction)?];
    let mut on_path = HashSet::from([task.id.clone()]);
    let mut finished = None;

    while let Some(mut frame) = stack.pop() {
        match frame.pending.next() {
            Some(next_id) => {
                if on_path.contains(&next_id) {
                    log::warn!("Cycle through {} while expanding {}", next_id, task.name);
                    return Err(eyre::eyre!(StoreError::CycleDetected));
                }
                // frame and its new child would both sit on the path
                if stack.len() + 2 > MAX_DEPTH {
                    log::warn!("Expansion of {} exceeds {} tasks", task.name, MAX_DEPTH);
                    return Err(eyre::eyre!(StoreError::TooDeep(MAX_DEPTH)));
                }
                let next = graph
                    .task(&next_id)?
                    .ok_or_else(|| eyre::eyre!(StoreError::TaskNotFound(next_id.clone())))?;
                let child = Frame::new(graph, next, direction)?;
                on_path.insert(next_id);
                stack.push(frame);
                stack.push(child);
            }
            None => {
                on_path.remove(&frame.node.id);
                match stack.last_mut() {
                    Some(parent) => children(&mut parent.node, direction).push(frame.node),
                    None => finished = Some(frame.node),
                }
            }
        }
    }

    finished.ok_or_else(|| eyre::eyre!("expansion of {} produced no tree", task.id))
}

/// Extension trait for closure views on Store.
pub trait StoreClosureExt {
    /// Expand a task in one direction.
    fn expand(&self, task: &Task, direction: Direction) -> Result<TaskNode>;

    /// A task with both its dependencies and dependents expanded.
    fn task_view(&self, network_key: &str, name: &str) -> Result<TaskNode>;

    /// Every root of the network with its dependents expanded.
    fn network_view(&self, network_key: &str) -> Result<Vec<TaskNode>>;
}

impl StoreClosureExt for Store {
    fn expand(&self, task: &Task, direction: Direction) -> Result<TaskNode> {
        expand(&self.graph(), task, direction)
    }

    fn task_view(&self, network_key: &str, name: &str) -> Result<TaskNode> {
        let task = self.find_task(network_key, name)?;
        let graph = self.graph();

        let mut node = expand(&graph, &task, Direction::Dependencies)?;
        let mut down = expand(&graph, &task, Direction::Dependents)?;
        node.dependents = std::mem::take(&mut down.dependents);
        Ok(node)
    }

    fn network_view(&self, network_key: &str) -> Result<Vec<TaskNode>> {
        let network = self.require_network(network_key)?;
        let graph = self.graph();

        graph
            .roots(&network.id)?
            .iter()
            .map(|root| expand(&graph, root, Direction::Dependents))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Edge, TaskSpec};
    use chrono::Utc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Store, String) {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::init(temp_dir.path()).unwrap();
        let network = store.create_network("Boeing 777", "").unwrap();
        (temp_dir, store, network.id)
    }

    fn task(store: &mut Store, network_id: &str, name: &str) -> Task {
        store.create_task(&TaskSpec::new(network_id, name, name)).unwrap()
    }

    fn names(nodes: &[TaskNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_expand_isolated_task() {
        let (_temp_dir, mut store, network_id) = setup();
        let a = task(&mut store, &network_id, "a");

        let node = store.expand(&a, Direction::Dependents).unwrap();
        assert_eq!(node.name, "a");
        assert!(node.dependents.is_empty());
        assert!(node.dependencies.is_empty());
    }

    #[test]
    fn test_diamond_expands_once_per_path() {
        let (_temp_dir, mut store, network_id) = setup();
        let top = task(&mut store, &network_id, "top");
        let left = task(&mut store, &network_id, "left");
        let right = task(&mut store, &network_id, "right");
        let bottom = task(&mut store, &network_id, "bottom");
        store.add_edge(&left.id, &top.id).unwrap();
        store.add_edge(&right.id, &top.id).unwrap();
        store.add_edge(&bottom.id, &left.id).unwrap();
        store.add_edge(&bottom.id, &right.id).unwrap();

        let down = store.expand(&top, Direction::Dependents).unwrap();
        assert_eq!(names(&down.dependents), vec!["left", "right"]);
        assert_eq!(names(&down.dependents[0].dependents), vec!["bottom"]);
        assert_eq!(names(&down.dependents[1].dependents), vec!["bottom"]);
        assert!(down.dependencies.is_empty());

        let up = store.expand(&bottom, Direction::Dependencies).unwrap();
        assert_eq!(names(&up.dependencies), vec!["left", "right"]);
        assert_eq!(names(&up.dependencies[0].dependencies), vec!["top"]);
        assert!(up.dependents.is_empty());
    }

    #[test]
    fn test_expand_is_repeatable() {
        let (_temp_dir, mut store, network_id) = setup();
        let a = task(&mut store, &network_id, "a");
        let b = task(&mut store, &network_id, "b");
        store.add_edge(&b.id, &a.id).unwrap();

        let first = store.expand(&a, Direction::Dependents).unwrap();
        let second = store.expand(&a, Direction::Dependents).unwrap();
        assert_eq!(first, second);
    }

    /// A chain of `len` tasks where each one depends on the previous.
    fn chain(store: &mut Store, network_id: &str, len: usize) -> Task {
        let first = task(store, network_id, "step 0");
        let mut previous = first.clone();
        for i in 1..len {
            let next = task(store, network_id, &format!("step {}", i));
            // Bypass the cycle check to keep setup fast
            store
                .storage()
                .insert_edge(&Edge {
                    task_id: next.id.clone(),
                    depends_on_task_id: previous.id.clone(),
                    created_at: Utc::now(),
                })
                .unwrap();
            previous = next;
        }
        first
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let (_temp_dir, mut store, network_id) = setup();
        let first = chain(&mut store, &network_id, MAX_DEPTH);

        let node = store.expand(&first, Direction::Dependents).unwrap();

        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains(&format!("step {}", MAX_DEPTH - 1)));
        assert_eq!(node.clone(), node);

        let mut leaf = node;
        let mut depth = 0;
        while let Some(child) = leaf.dependents.pop() {
            leaf = child;
            depth += 1;
        }
        assert_eq!(depth, MAX_DEPTH - 1);
        assert_eq!(leaf.name, format!("step {}", MAX_DEPTH - 1));
    }

    #[test]
    fn test_chain_past_depth_limit_is_rejected() {
        let (_temp_dir, mut store, network_id) = setup();
        let first = chain(&mut store, &network_id, MAX_DEPTH + 1);

        let err = store.expand(&first, Direction::Dependents).unwrap_err();

        let store_err = StoreError::from_report(&err).cloned().unwrap();
        assert_eq!(store_err, StoreError::TooDeep(MAX_DEPTH));
        assert_eq!(store_err.kind(), crate::store::ErrorKind::Invalid);

        // Upstream from the far end is just as long
        let tail = store.find_task("Boeing 777", &format!("step {}", MAX_DEPTH)).unwrap();
        store.expand(&tail, Direction::Dependencies).unwrap_err();
        store.expand(&tail, Direction::Dependents).unwrap();
    }

    #[test]
    fn test_dropping_deep_tree_does_not_recurse() {
        let leaf = |i: usize| TaskNode {
            id: format!("tk-{:010}", i),
            name: format!("step {}", i),
            description: String::new(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
        };

        let mut node = leaf(0);
        for i in 1..200_000 {
            let mut parent = leaf(i);
            parent.dependents.push(node);
            node = parent;
        }

        drop(node);
    }

    #[test]
    fn test_stored_cycle_is_reported() {
        let (_temp_dir, mut store, network_id) = setup();
        let a = task(&mut store, &network_id, "a");
        let b = task(&mut store, &network_id, "b");
        store.add_edge(&b.id, &a.id).unwrap();
        // Write the closing edge directly, as a foreign writer could
        store
            .storage()
            .insert_edge(&Edge {
                task_id: a.id.clone(),
                depends_on_task_id: b.id.clone(),
                created_at: Utc::now(),
            })
            .unwrap();

        let err = store.expand(&a, Direction::Dependents).unwrap_err();
        assert_eq!(StoreError::from_report(&err), Some(&StoreError::CycleDetected));
    }
}
