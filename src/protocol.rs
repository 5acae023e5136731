//! Request/response types for driving the store from outside the crate.

use crate::batch::BatchReport;
use crate::types::{BatchSpec, Edge, Network, Task, TaskNode};
use serde::{Deserialize, Serialize};

/// Request handled by [`crate::Service`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Create a new network.
    CreateNetwork {
        key: String,
        #[serde(default)]
        description: String,
    },

    /// Whole network view: every root with its dependents.
    GetNetwork { key: String },

    /// List all networks.
    ListNetworks,

    /// Change a network's key and/or description.
    UpdateNetwork {
        key: String,
        new_key: Option<String>,
        description: Option<String>,
    },

    /// Delete a network with its tasks and edges.
    DeleteNetwork { key: String },

    /// Create a single task (no upsert).
    CreateTask {
        network_id: String,
        name: String,
        #[serde(default)]
        description: String,
    },

    /// Full task view: dependencies and dependents.
    GetTask { network: String, name: String },

    /// Rename and/or redescribe a task.
    UpdateTask {
        network: String,
        name: String,
        new_name: Option<String>,
        description: Option<String>,
    },

    /// Delete a task with its edges.
    DeleteTask { network: String, name: String },

    /// Create a task with prerequisites and dependents.
    CreateBatch { batch: BatchSpec },

    /// `task` depends on `depends_on_task`, both named within `network`.
    AddEdge {
        network: String,
        task: String,
        depends_on_task: String,
    },

    /// Remove a dependency.
    RemoveEdge {
        network: String,
        task: String,
        depends_on_task: String,
    },

    /// Ping to check the service is alive.
    Ping,
}

/// Response returned for a [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Single network.
    Network { network: Network },

    /// All networks.
    Networks { networks: Vec<Network> },

    /// Single task.
    Task { task: Task },

    /// One task with its closures.
    Tree { node: TaskNode },

    /// Roots of a network with their dependents.
    Forest { roots: Vec<TaskNode> },

    /// Single edge.
    Edge { edge: Edge },

    /// Batch where every sibling succeeded.
    Batch { report: BatchReport },

    /// Batch where the main task succeeded but some siblings failed.
    Partial { report: BatchReport },

    /// Referenced entity does not exist.
    NotFound { message: String },

    /// Rejected input: validation, conflicts, invariant violations.
    Invalid { message: String },

    /// Operation succeeded.
    Ok,

    /// Pong response to ping.
    Pong,

    /// Storage or other unexpected failure.
    Error { message: String },
}

impl Response {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
