//! High-level store API for depnet.

use crate::graph::Graph;
use crate::id::{NETWORK_PREFIX, TASK_PREFIX, generate_id};
use crate::storage::Storage;
use crate::types::{Edge, EdgeFilter, Network, Task, TaskSpec, ValidationError};
use chrono::Utc;
use eyre::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

/// Errors that can occur during store operations.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Network not found (by key or id).
    NetworkNotFound(String),
    /// Task not found (by name or id).
    TaskNotFound(String),
    /// No edge between the two tasks.
    EdgeNotFound { task_id: String, depends_on_task_id: String },
    /// A network with this key already exists.
    NetworkExists(String),
    /// A task with this name already exists in the network.
    TaskExists(String),
    /// A batch sibling declares a different network than the main task.
    NetworkMismatch { expected: String, found: String },
    /// Edge endpoints live in different networks.
    CrossNetworkEdge,
    /// Self-referential edge.
    SelfReferentialEdge,
    /// Following the edges leads back to where they started.
    CycleDetected,
    /// A closure path is longer than the expansion limit.
    TooDeep(usize),
    /// Validation error.
    Validation(ValidationError),
}

/// Coarse classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Invalid,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NetworkNotFound(_) | StoreError::TaskNotFound(_) | StoreError::EdgeNotFound { .. } => {
                ErrorKind::NotFound
            }
            StoreError::NetworkExists(_) | StoreError::TaskExists(_) => ErrorKind::Conflict,
            _ => ErrorKind::Invalid,
        }
    }

    /// Find the store error inside a report, if there is one.
    pub fn from_report(report: &eyre::Report) -> Option<&StoreError> {
        report.downcast_ref::<StoreError>()
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NetworkNotFound(key) => write!(f, "network not found: {}", key),
            StoreError::TaskNotFound(name) => write!(f, "task not found: {}", name),
            StoreError::EdgeNotFound {
                task_id,
                depends_on_task_id,
            } => write!(f, "no dependency of {} on {}", task_id, depends_on_task_id),
            StoreError::NetworkExists(key) => write!(f, "network already exists: {}", key),
            StoreError::TaskExists(name) => write!(f, "task already exists: {}", name),
            StoreError::NetworkMismatch { expected, found } => {
                write!(f, "task declares network {} but batch is for {}", found, expected)
            }
            StoreError::CrossNetworkEdge => write!(f, "cannot link tasks of different networks"),
            StoreError::SelfReferentialEdge => write!(f, "a task cannot depend on itself"),
            StoreError::CycleDetected => write!(f, "dependency cycle detected"),
            StoreError::TooDeep(limit) => write!(f, "dependency chain longer than {} tasks", limit),
            StoreError::Validation(e) => write!(f, "validation error on {}: {}", e.field(), e),
        }
    }
}

impl std::error::Error for StoreError {}

/// The main depnet store.
pub struct Store {
    storage: Storage,
}

impl Store {
    /// Initialize a new store in the given directory.
    pub fn init(root: &Path) -> Result<Self> {
        let storage = Storage::init(root)?;
        Ok(Self { storage })
    }

    /// Open an existing store.
    pub fn open(root: &Path) -> Result<Self> {
        let storage = Storage::open(root)?;
        Ok(Self { storage })
    }

    pub(crate) fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Read-only graph queries over this store.
    pub fn graph(&self) -> Graph<'_> {
        Graph::new(&self.storage)
    }

    // Networks

    /// Create a new network. Fails if the key is taken.
    pub fn create_network(&mut self, key: &str, description: &str) -> Result<Network> {
        let now = Utc::now();
        let network = Network {
            id: generate_id(NETWORK_PREFIX, key, now),
            key: key.to_string(),
            description: description.to_string(),
            created_at: now,
        };

        // Validate before persisting
        network.validate().map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        if self.storage.get_network_by_key(key)?.is_some() {
            return Err(eyre::eyre!(StoreError::NetworkExists(key.to_string())));
        }

        self.storage
            .insert_network(&network)
            .map_err(|e| key_conflict(e, key, "Failed to persist network"))?;

        log::info!("Created network {} ({})", network.key, network.id);
        Ok(network)
    }

    /// Get a network by key.
    pub fn get_network(&self, key: &str) -> Result<Option<Network>> {
        self.storage.get_network_by_key(key)
    }

    /// Get a network by key, failing if absent.
    pub fn require_network(&self, key: &str) -> Result<Network> {
        self.storage
            .get_network_by_key(key)?
            .ok_or_else(|| eyre::eyre!(StoreError::NetworkNotFound(key.to_string())))
    }

    /// List all networks.
    pub fn list_networks(&self) -> Result<Vec<Network>> {
        self.storage.list_networks()
    }

    /// Change a network's key and/or description.
    pub fn update_network(&mut self, key: &str, new_key: Option<&str>, description: Option<&str>) -> Result<Network> {
        let existing = self.require_network(key)?;

        let updated = Network {
            key: new_key.map(String::from).unwrap_or_else(|| existing.key.clone()),
            description: description.map(String::from).unwrap_or_else(|| existing.description.clone()),
            ..existing
        };

        updated.validate().map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        if updated.key != key && self.storage.get_network_by_key(&updated.key)?.is_some() {
            return Err(eyre::eyre!(StoreError::NetworkExists(updated.key)));
        }

        self.storage
            .update_network(&updated)
            .map_err(|e| key_conflict(e, &updated.key, "Failed to persist network update"))?;

        Ok(updated)
    }

    /// Delete a network together with its tasks and edges.
    pub fn delete_network(&mut self, key: &str) -> Result<()> {
        let network = self.require_network(key)?;
        self.storage.delete_network(&network.id)?;
        log::info!("Deleted network {} ({})", network.key, network.id);
        Ok(())
    }

    // Tasks

    fn build_task(spec: &TaskSpec) -> Result<Task> {
        let now = Utc::now();
        let task = Task {
            id: generate_id(TASK_PREFIX, &spec.name, now),
            network_id: spec.network_id.clone(),
            name: spec.name.clone(),
            description: spec.description.clone(),
            created_at: now,
        };
        task.validate().map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;
        Ok(task)
    }

    fn ensure_network_id(&self, network_id: &str) -> Result<()> {
        if self.storage.get_network(network_id)?.is_none() {
            return Err(eyre::eyre!(StoreError::NetworkNotFound(network_id.to_string())));
        }
        Ok(())
    }

    /// Create a new task. Fails if the name is already used in the network.
    pub fn create_task(&mut self, spec: &TaskSpec) -> Result<Task> {
        self.ensure_network_id(&spec.network_id)?;

        if self.storage.get_task(&spec.network_id, &spec.name)?.is_some() {
            return Err(eyre::eyre!(StoreError::TaskExists(spec.name.clone())));
        }

        let task = Self::build_task(spec)?;
        self.storage.insert_task(&task).context("Failed to persist task")?;

        log::info!("Created task {} ({}) in {}", task.name, task.id, task.network_id);
        Ok(task)
    }

    /// Return the task with this network and name, creating it if needed.
    ///
    /// The lookup and the insert are separate statements, so two writers can
    /// both miss the lookup and create the same name twice.
    pub fn upsert_task(&mut self, spec: &TaskSpec) -> Result<Task> {
        self.ensure_network_id(&spec.network_id)?;

        if let Some(existing) = self.storage.get_task(&spec.network_id, &spec.name)? {
            log::debug!("Task {} already exists as {}", existing.name, existing.id);
            return Ok(existing);
        }

        let task = Self::build_task(spec)?;
        self.storage.insert_task(&task).context("Failed to persist task")?;

        log::info!("Created task {} ({}) in {}", task.name, task.id, task.network_id);
        Ok(task)
    }

    /// Get a task by network id and name.
    pub fn get_task(&self, network_id: &str, name: &str) -> Result<Option<Task>> {
        self.storage.get_task(network_id, name)
    }

    /// Get a task by id.
    pub fn get_task_by_id(&self, id: &str) -> Result<Option<Task>> {
        self.storage.get_task_by_id(id)
    }

    /// Resolve a task by network key and task name.
    pub fn find_task(&self, network_key: &str, name: &str) -> Result<Task> {
        let network = self.require_network(network_key)?;
        self.storage
            .get_task(&network.id, name)?
            .ok_or_else(|| eyre::eyre!(StoreError::TaskNotFound(name.to_string())))
    }

    /// List the tasks of a network.
    pub fn list_tasks(&self, network_id: &str) -> Result<Vec<Task>> {
        self.storage.list_tasks(network_id)
    }

    /// Rename and/or redescribe a task in place.
    pub fn update_task(
        &mut self,
        network_key: &str,
        name: &str,
        new_name: Option<&str>,
        description: Option<&str>,
    ) -> Result<Task> {
        let existing = self.find_task(network_key, name)?;

        let updated = Task {
            name: new_name.map(String::from).unwrap_or_else(|| existing.name.clone()),
            description: description.map(String::from).unwrap_or_else(|| existing.description.clone()),
            ..existing
        };

        updated.validate().map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        if updated.name != name && self.storage.get_task(&updated.network_id, &updated.name)?.is_some() {
            return Err(eyre::eyre!(StoreError::TaskExists(updated.name)));
        }

        self.storage
            .update_task(&updated)
            .context("Failed to persist task update")?;

        Ok(updated)
    }

    /// Delete a task and every edge touching it.
    pub fn delete_task(&mut self, network_key: &str, name: &str) -> Result<()> {
        let task = self.find_task(network_key, name)?;
        self.storage.delete_task(&task.id)?;
        log::info!("Deleted task {} ({})", task.name, task.id);
        Ok(())
    }

    // Edges

    /// Record that `task_id` depends on `depends_on_task_id`.
    ///
    /// Both tasks must exist and share a network, and the edge must not close
    /// a cycle. Adding an existing edge returns it unchanged.
    pub fn add_edge(&mut self, task_id: &str, depends_on_task_id: &str) -> Result<Edge> {
        // No self-referential edges
        if task_id == depends_on_task_id {
            return Err(eyre::eyre!(StoreError::SelfReferentialEdge));
        }

        // Both tasks must exist
        let task = self
            .storage
            .get_task_by_id(task_id)?
            .ok_or_else(|| eyre::eyre!(StoreError::TaskNotFound(task_id.to_string())))?;
        let depends_on = self
            .storage
            .get_task_by_id(depends_on_task_id)?
            .ok_or_else(|| eyre::eyre!(StoreError::TaskNotFound(depends_on_task_id.to_string())))?;

        if task.network_id != depends_on.network_id {
            return Err(eyre::eyre!(StoreError::CrossNetworkEdge));
        }

        // Idempotent
        if let Some(existing) = self.storage.get_edge(task_id, depends_on_task_id)? {
            return Ok(existing);
        }

        if self.would_create_cycle(task_id, depends_on_task_id)? {
            return Err(eyre::eyre!(StoreError::CycleDetected));
        }

        let edge = Edge {
            task_id: task_id.to_string(),
            depends_on_task_id: depends_on_task_id.to_string(),
            created_at: Utc::now(),
        };
        self.storage.insert_edge(&edge).context("Failed to persist edge")?;

        log::debug!("{} now depends on {}", task.name, depends_on.name);
        Ok(edge)
    }

    /// Remove the edge between two tasks.
    pub fn remove_edge(&mut self, task_id: &str, depends_on_task_id: &str) -> Result<()> {
        if !self.storage.delete_edge(task_id, depends_on_task_id)? {
            return Err(eyre::eyre!(StoreError::EdgeNotFound {
                task_id: task_id.to_string(),
                depends_on_task_id: depends_on_task_id.to_string(),
            }));
        }
        Ok(())
    }

    /// Edges matching a filter.
    pub fn edges(&self, filter: &EdgeFilter) -> Result<Vec<Edge>> {
        self.storage.filter_edges(filter)
    }

    /// Check if `task_id -> depends_on_task_id` would close a cycle.
    fn would_create_cycle(&self, task_id: &str, depends_on_task_id: &str) -> Result<bool> {
        // Walk the prerequisites of 'depends_on_task_id'; reaching 'task_id'
        // means it already depends on 'task_id'
        let graph = self.graph();
        let mut visited = HashSet::new();
        let mut stack = vec![depends_on_task_id.to_string()];

        while let Some(node) = stack.pop() {
            if node == task_id {
                return Ok(true);
            }
            if visited.insert(node.clone()) {
                for edge in graph.edges_out_of(&node)? {
                    stack.push(edge.depends_on_task_id);
                }
            }
        }

        Ok(false)
    }
}

/// Turn a UNIQUE violation into `NetworkExists`; the key check and the write
/// are separate statements, so another writer can take the key in between.
fn key_conflict(report: eyre::Report, key: &str, context: &'static str) -> eyre::Report {
    match report.downcast_ref::<rusqlite::Error>() {
        Some(rusqlite::Error::SqliteFailure(e, _)) if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => {
            log::warn!("Network key {} was taken concurrently", key);
            eyre::eyre!(StoreError::NetworkExists(key.to_string()))
        }
        _ => report.wrap_err(context),
    }
}
