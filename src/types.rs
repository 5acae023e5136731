//! Core data types for depnet dependency networks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of a network key (aircraft type).
pub const MAX_KEY_LEN: usize = 20;

/// Maximum length of a task name.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of any description.
pub const MAX_DESCRIPTION_LEN: usize = 200;

/// A named graph namespace, one per aircraft type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Network {
    /// Unique identifier: "nw-" + 10 hex chars
    pub id: String,

    /// Natural key, e.g. "Boeing 777"
    pub key: String,

    /// Free text
    #[serde(default)]
    pub description: String,

    /// When created
    pub created_at: DateTime<Utc>,
}

/// A unit of work belonging to exactly one network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier: "tk-" + 10 hex chars
    pub id: String,

    /// Owning network
    pub network_id: String,

    /// Unique within the network
    pub name: String,

    pub description: String,

    /// When created
    pub created_at: DateTime<Utc>,
}

/// `task` must occur after `depends_on_task` completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edge {
    /// The dependent (downstream) task
    pub task_id: String,

    /// The prerequisite (upstream) task
    pub depends_on_task_id: String,

    /// When the edge was created
    pub created_at: DateTime<Utc>,
}

/// A task with its expanded closures, ready for serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskNode {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<TaskNode>,
    #[serde(default)]
    pub dependents: Vec<TaskNode>,
}

impl Drop for TaskNode {
    // Flatten the subtree onto a worklist so long chains drop without recursion
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.dependencies);
        pending.append(&mut self.dependents);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.dependencies);
            pending.append(&mut node.dependents);
        }
    }
}

impl From<&Task> for TaskNode {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            name: task.name.clone(),
            description: task.description.clone(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
        }
    }
}

impl From<Task> for TaskNode {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            name: task.name,
            description: task.description,
            dependencies: Vec::new(),
            dependents: Vec::new(),
        }
    }
}

/// Declared shape of a task to create or find.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSpec {
    pub network_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl TaskSpec {
    pub fn new(network_id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            network_id: network_id.into(),
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A main task together with the tasks that must happen before and after it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSpec {
    /// The main task
    pub task: TaskSpec,

    /// Tasks the main task depends on
    #[serde(default)]
    pub dependencies: Vec<TaskSpec>,

    /// Tasks that depend on the main task
    #[serde(default)]
    pub dependents: Vec<TaskSpec>,
}

impl BatchSpec {
    pub fn new(task: TaskSpec) -> Self {
        Self {
            task,
            dependencies: Vec::new(),
            dependents: Vec::new(),
        }
    }

    /// Add a prerequisite.
    pub fn dependency(mut self, spec: TaskSpec) -> Self {
        self.dependencies.push(spec);
        self
    }

    /// Add a dependent.
    pub fn dependent(mut self, spec: TaskSpec) -> Self {
        self.dependents.push(spec);
        self
    }
}

/// Filter for edge lookups. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeFilter {
    pub task_id: Option<String>,
    pub depends_on_task_id: Option<String>,
    /// Network of the dependent task
    pub network_id: Option<String>,
}

impl EdgeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task(mut self, id: impl Into<String>) -> Self {
        self.task_id = Some(id.into());
        self
    }

    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on_task_id = Some(id.into());
        self
    }

    pub fn network(mut self, id: impl Into<String>) -> Self {
        self.network_id = Some(id.into());
        self
    }
}

/// Validation errors for networks and tasks.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyKey,
    KeyTooLong,
    EmptyName,
    NameTooLong,
    EmptyDescription,
    DescriptionTooLong,
    InvalidCharacters(&'static str),
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmptyKey | ValidationError::KeyTooLong => "key",
            ValidationError::EmptyName | ValidationError::NameTooLong => "name",
            ValidationError::EmptyDescription | ValidationError::DescriptionTooLong => "description",
            ValidationError::InvalidCharacters(field) => field,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyKey => write!(f, "key cannot be empty"),
            ValidationError::KeyTooLong => write!(f, "key exceeds {} characters", MAX_KEY_LEN),
            ValidationError::EmptyName => write!(f, "name cannot be empty"),
            ValidationError::NameTooLong => write!(f, "name exceeds {} characters", MAX_NAME_LEN),
            ValidationError::EmptyDescription => write!(f, "description cannot be empty"),
            ValidationError::DescriptionTooLong => {
                write!(f, "description exceeds {} characters", MAX_DESCRIPTION_LEN)
            }
            ValidationError::InvalidCharacters(field) => write!(f, "{} contains control characters", field),
        }
    }
}

impl std::error::Error for ValidationError {}

fn has_control(s: &str) -> bool {
    s.chars().any(|c| c.is_control())
}

impl Network {
    /// Validate the network's fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.key.trim().is_empty() {
            return Err(ValidationError::EmptyKey);
        }
        if self.key.chars().count() > MAX_KEY_LEN {
            return Err(ValidationError::KeyTooLong);
        }
        if has_control(&self.key) {
            return Err(ValidationError::InvalidCharacters("key"));
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ValidationError::DescriptionTooLong);
        }
        Ok(())
    }
}

impl Task {
    /// Validate the task's fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong);
        }
        if has_control(&self.name) {
            return Err(ValidationError::InvalidCharacters("name"));
        }

        // Description is required for tasks
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyDescription);
        }
        if self.description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ValidationError::DescriptionTooLong);
        }
        Ok(())
    }
}
