//! Read-only graph queries: edge lookups by endpoint and root discovery.

use crate::storage::Storage;
use crate::types::{Edge, EdgeFilter, Task};
use eyre::Result;
use std::collections::HashSet;

/// Borrowed view for walking the dependency graph.
pub struct Graph<'a> {
    storage: &'a Storage,
}

impl<'a> Graph<'a> {
    pub(crate) fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Edges where `task_id` is the prerequisite, i.e. what depends on it.
    pub fn edges_into(&self, task_id: &str) -> Result<Vec<Edge>> {
        self.storage.filter_edges(&EdgeFilter::new().depends_on(task_id))
    }

    /// Edges where `task_id` is the dependent, i.e. its prerequisites.
    pub fn edges_out_of(&self, task_id: &str) -> Result<Vec<Edge>> {
        self.storage.filter_edges(&EdgeFilter::new().task(task_id))
    }

    /// Look up a task by id.
    pub fn task(&self, id: &str) -> Result<Option<Task>> {
        self.storage.get_task_by_id(id)
    }

    /// Tasks of the network that are not the dependent side of any edge.
    pub fn roots(&self, network_id: &str) -> Result<Vec<Task>> {
        let tasks = self.storage.list_tasks(network_id)?;
        let dependents: HashSet<String> = self
            .storage
            .filter_edges(&EdgeFilter::new().network(network_id))?
            .into_iter()
            .map(|edge| edge.task_id)
            .collect();

        Ok(tasks.into_iter().filter(|task| !dependents.contains(&task.id)).collect())
    }
}
