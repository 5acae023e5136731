//! Batch creation of a task together with its prerequisites and dependents.

use crate::store::{Store, StoreError};
use crate::types::{BatchSpec, Edge, Task, TaskSpec};
use eyre::Result;
use serde::{Deserialize, Serialize};

/// Which list of a batch a sibling came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Dependency,
    Dependent,
}

/// A sibling that could not be created or linked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub side: Side,
    /// Position in its list
    pub index: usize,
    /// Declared name
    pub name: String,
    pub reason: String,
}

/// Overall outcome of a batch whose main task succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Complete,
    Partial,
}

/// Result of a batch create operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// The main task, created or found.
    pub task: Task,
    /// Prerequisites successfully created or found and linked.
    pub dependencies: Vec<Task>,
    /// Dependents successfully created or found and linked.
    pub dependents: Vec<Task>,
    /// Edges created or found.
    pub edges: Vec<Edge>,
    /// Siblings that failed.
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn status(&self) -> BatchStatus {
        if self.failures.is_empty() {
            BatchStatus::Complete
        } else {
            BatchStatus::Partial
        }
    }
}

/// Extension trait for batch operations on Store.
pub trait StoreBatchExt {
    /// Create a main task plus prerequisites and dependents, linking each.
    ///
    /// Siblings that fail are reported and skipped; earlier successes stay.
    /// Fails outright, without writing, when a sibling names another network
    /// or the main task cannot be created or found.
    fn create_batch(&mut self, spec: &BatchSpec) -> Result<BatchReport>;
}

impl StoreBatchExt for Store {
    fn create_batch(&mut self, spec: &BatchSpec) -> Result<BatchReport> {
        let network_id = &spec.task.network_id;
        if let Some(stray) = spec
            .dependencies
            .iter()
            .chain(spec.dependents.iter())
            .find(|sibling| &sibling.network_id != network_id)
        {
            return Err(eyre::eyre!(StoreError::NetworkMismatch {
                expected: network_id.clone(),
                found: stray.network_id.clone(),
            }));
        }

        let task = self.upsert_task(&spec.task)?;

        let mut report = BatchReport {
            task: task.clone(),
            dependencies: Vec::new(),
            dependents: Vec::new(),
            edges: Vec::new(),
            failures: Vec::new(),
        };

        for (i, sibling) in spec.dependencies.iter().enumerate() {
            match link(self, sibling, |prerequisite| (task.id.clone(), prerequisite.id.clone())) {
                Ok((prerequisite, edge)) => {
                    report.dependencies.push(prerequisite);
                    report.edges.push(edge);
                }
                Err(e) => report.failures.push(failure(Side::Dependency, i, sibling, &e)),
            }
        }

        for (i, sibling) in spec.dependents.iter().enumerate() {
            match link(self, sibling, |dependent| (dependent.id.clone(), task.id.clone())) {
                Ok((dependent, edge)) => {
                    report.dependents.push(dependent);
                    report.edges.push(edge);
                }
                Err(e) => report.failures.push(failure(Side::Dependent, i, sibling, &e)),
            }
        }

        if report.status() == BatchStatus::Partial {
            log::warn!(
                "Batch for {} finished with {} failure(s)",
                task.name,
                report.failures.len()
            );
        } else {
            log::info!("Batch for {} complete: {} edge(s)", task.name, report.edges.len());
        }

        Ok(report)
    }
}

/// Upsert a sibling and add the edge chosen by `endpoints` (task, depends_on).
fn link<F>(store: &mut Store, sibling: &TaskSpec, endpoints: F) -> Result<(Task, Edge)>
where
    F: FnOnce(&Task) -> (String, String),
{
    let sibling_task = store.upsert_task(sibling)?;
    let (task_id, depends_on_task_id) = endpoints(&sibling_task);
    let edge = store.add_edge(&task_id, &depends_on_task_id)?;
    Ok((sibling_task, edge))
}

fn failure(side: Side, index: usize, sibling: &TaskSpec, error: &eyre::Report) -> BatchFailure {
    log::debug!("Batch sibling {:?}[{}] {} failed: {}", side, index, sibling.name, error);
    BatchFailure {
        side,
        index,
        name: sibling.name.clone(),
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeFilter;
    use tempfile::TempDir;

    fn setup_test_store() -> (TempDir, Store, String) {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::init(temp_dir.path()).unwrap();
        let network = store.create_network("Boeing 777", "").unwrap();
        (temp_dir, store, network.id)
    }

    #[test]
    fn test_batch_complete() {
        let (_temp_dir, mut store, nw) = setup_test_store();

        let spec = BatchSpec::new(TaskSpec::new(&nw, "boarding", "board"))
            .dependency(TaskSpec::new(&nw, "security check", "check"))
            .dependency(TaskSpec::new(&nw, "cabin check", "check"))
            .dependent(TaskSpec::new(&nw, "ADC", "ADC"))
            .dependent(TaskSpec::new(&nw, "pushback", "push"));

        let report = store.create_batch(&spec).unwrap();

        assert_eq!(report.status(), BatchStatus::Complete);
        assert_eq!(report.dependencies.len(), 2);
        assert_eq!(report.dependents.len(), 2);
        assert_eq!(store.list_tasks(&nw).unwrap().len(), 5);

        let edges = store.edges(&EdgeFilter::new()).unwrap();
        assert_eq!(edges.len(), 4);
        let out_of_main = store.edges(&EdgeFilter::new().task(&report.task.id)).unwrap();
        let into_main = store.edges(&EdgeFilter::new().depends_on(&report.task.id)).unwrap();
        assert_eq!(out_of_main.len(), 2);
        assert_eq!(into_main.len(), 2);
    }

    #[test]
    fn test_batch_partial_on_invalid_sibling() {
        let (_temp_dir, mut store, nw) = setup_test_store();

        let spec = BatchSpec::new(TaskSpec::new(&nw, "boarding", "board"))
            .dependent(TaskSpec::new(&nw, "", "nameless"))
            .dependent(TaskSpec::new(&nw, "ADC", "ADC"));

        let report = store.create_batch(&spec).unwrap();

        assert_eq!(report.status(), BatchStatus::Partial);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].side, Side::Dependent);
        assert_eq!(report.failures[0].index, 0);
        assert_eq!(store.list_tasks(&nw).unwrap().len(), 2);
        assert_eq!(store.edges(&EdgeFilter::new()).unwrap().len(), 1);
    }

    #[test]
    fn test_batch_network_mismatch_writes_nothing() {
        let (_temp_dir, mut store, nw) = setup_test_store();
        let other = store.create_network("Airbus A380", "").unwrap();

        let spec = BatchSpec::new(TaskSpec::new(&nw, "boarding", "board"))
            .dependency(TaskSpec::new(&nw, "cabin check", "check"))
            .dependent(TaskSpec::new(&other.id, "ADC", "ADC"));

        let err = store.create_batch(&spec).unwrap_err();

        assert!(matches!(
            StoreError::from_report(&err),
            Some(StoreError::NetworkMismatch { .. })
        ));
        assert!(store.list_tasks(&nw).unwrap().is_empty());
        assert!(store.list_tasks(&other.id).unwrap().is_empty());
    }

    #[test]
    fn test_batch_main_task_failure() {
        let (_temp_dir, mut store, nw) = setup_test_store();

        let spec = BatchSpec::new(TaskSpec::new(&nw, "boarding", "")).dependency(TaskSpec::new(&nw, "a", "a"));

        assert!(store.create_batch(&spec).is_err());
        assert!(store.list_tasks(&nw).unwrap().is_empty());
    }

    #[test]
    fn test_batch_retry_is_idempotent() {
        let (_temp_dir, mut store, nw) = setup_test_store();

        let spec = BatchSpec::new(TaskSpec::new(&nw, "boarding", "board"))
            .dependency(TaskSpec::new(&nw, "cabin check", "check"))
            .dependent(TaskSpec::new(&nw, "ADC", "ADC"));

        let first = store.create_batch(&spec).unwrap();
        let second = store.create_batch(&spec).unwrap();

        assert_eq!(first.task.id, second.task.id);
        assert_eq!(second.status(), BatchStatus::Complete);
        assert_eq!(store.list_tasks(&nw).unwrap().len(), 3);
        assert_eq!(store.edges(&EdgeFilter::new()).unwrap().len(), 2);
    }
}
