//! depnet: per-aircraft-type task dependency networks.
//!
//! Each network (one per aircraft type) holds named turnaround tasks and
//! "depends on" edges between them, persisted in SQLite. Tasks can be viewed
//! with their full upstream and downstream closures, and batches of tasks can
//! be created together with their edges.
//!
//! # Example
//!
//! ```no_run
//! use depnet::{BatchSpec, Store, StoreBatchExt, StoreClosureExt, TaskSpec};
//! use std::path::Path;
//!
//! let mut store = Store::init(Path::new(".")).unwrap();
//! let network = store.create_network("Boeing 777", "777 turnaround").unwrap();
//!
//! // boarding waits for the cabin check, ADC waits for boarding
//! let batch = BatchSpec::new(TaskSpec::new(&network.id, "boarding", "board passengers"))
//!     .dependency(TaskSpec::new(&network.id, "cabin check", "check the cabin"))
//!     .dependent(TaskSpec::new(&network.id, "ADC", "doors closed"));
//! store.create_batch(&batch).unwrap();
//!
//! let node = store.task_view("Boeing 777", "boarding").unwrap();
//! assert_eq!(node.dependencies[0].name, "cabin check");
//! assert_eq!(node.dependents[0].name, "ADC");
//! ```

mod id;
mod storage;
mod store;
mod types;

pub mod batch;
pub mod closure;
pub mod config;
pub mod graph;
pub mod protocol;
pub mod service;

// Re-export public API
pub use batch::{BatchFailure, BatchReport, BatchStatus, Side, StoreBatchExt};
pub use closure::{Direction, StoreClosureExt};
pub use config::Config;
pub use graph::Graph;
pub use protocol::{Request, Response};
pub use service::Service;
pub use store::{ErrorKind, Store, StoreError};
pub use types::{BatchSpec, Edge, EdgeFilter, Network, Task, TaskNode, TaskSpec, ValidationError};
