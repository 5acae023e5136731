//! Request dispatch onto the store.
//!
//! The service owns a [`Store`] and turns each [`Request`] into a
//! [`Response`], classifying store errors into not-found, invalid and
//! unexpected failures. [`Service::serve`] speaks JSON lines over any reader
//! and writer.

use crate::batch::{BatchStatus, StoreBatchExt};
use crate::closure::StoreClosureExt;
use crate::protocol::{Request, Response};
use crate::store::{ErrorKind, Store, StoreError};
use crate::types::TaskSpec;
use eyre::{Context, Result};
use std::io::{BufRead, Write};

/// Front door for request/response access to a store.
pub struct Service {
    store: Store,
}

impl Service {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }

    /// Read one JSON request per line and write one JSON response per line.
    pub fn serve<R: BufRead, W: Write>(&mut self, reader: R, mut writer: W) -> Result<usize> {
        let mut handled = 0;

        for line in reader.lines() {
            let line = line.context("Failed to read line")?;
            if line.trim().is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Request>(&line) {
                Ok(request) => self.handle(request),
                Err(e) => {
                    log::warn!("Rejected malformed request: {}", e);
                    Response::Invalid {
                        message: format!("malformed request: {}", e),
                    }
                }
            };

            let response_json = serde_json::to_string(&response)?;
            writeln!(writer, "{}", response_json)?;
            writer.flush()?;
            handled += 1;
        }

        Ok(handled)
    }

    /// Handle a single request.
    pub fn handle(&mut self, request: Request) -> Response {
        log::debug!("Handling {:?}", request);

        match request {
            Request::CreateNetwork { key, description } => match self.store.create_network(&key, &description) {
                Ok(network) => Response::Network { network },
                Err(e) => failure(e),
            },

            Request::GetNetwork { key } => match self.store.network_view(&key) {
                Ok(roots) => Response::Forest { roots },
                Err(e) => failure(e),
            },

            Request::ListNetworks => match self.store.list_networks() {
                Ok(networks) => Response::Networks { networks },
                Err(e) => failure(e),
            },

            Request::UpdateNetwork {
                key,
                new_key,
                description,
            } => match self
                .store
                .update_network(&key, new_key.as_deref(), description.as_deref())
            {
                Ok(network) => Response::Network { network },
                Err(e) => failure(e),
            },

            Request::DeleteNetwork { key } => match self.store.delete_network(&key) {
                Ok(()) => Response::Ok,
                Err(e) => failure(e),
            },

            Request::CreateTask {
                network_id,
                name,
                description,
            } => match self.store.create_task(&TaskSpec {
                network_id,
                name,
                description,
            }) {
                Ok(task) => Response::Task { task },
                Err(e) => failure(e),
            },

            Request::GetTask { network, name } => match self.store.task_view(&network, &name) {
                Ok(node) => Response::Tree { node },
                Err(e) => failure(e),
            },

            Request::UpdateTask {
                network,
                name,
                new_name,
                description,
            } => match self
                .store
                .update_task(&network, &name, new_name.as_deref(), description.as_deref())
            {
                Ok(task) => Response::Task { task },
                Err(e) => failure(e),
            },

            Request::DeleteTask { network, name } => match self.store.delete_task(&network, &name) {
                Ok(()) => Response::Ok,
                Err(e) => failure(e),
            },

            Request::CreateBatch { batch } => match self.store.create_batch(&batch) {
                Ok(report) => match report.status() {
                    BatchStatus::Complete => Response::Batch { report },
                    BatchStatus::Partial => Response::Partial { report },
                },
                Err(e) => failure(e),
            },

            Request::AddEdge {
                network,
                task,
                depends_on_task,
            } => {
                let result = self.resolve_pair(&network, &task, &depends_on_task).and_then(|(t, d)| {
                    self.store.add_edge(&t, &d)
                });
                match result {
                    Ok(edge) => Response::Edge { edge },
                    Err(e) => failure(e),
                }
            }

            Request::RemoveEdge {
                network,
                task,
                depends_on_task,
            } => {
                let result = self.resolve_pair(&network, &task, &depends_on_task).and_then(|(t, d)| {
                    self.store.remove_edge(&t, &d)
                });
                match result {
                    Ok(()) => Response::Ok,
                    Err(e) => failure(e),
                }
            }

            Request::Ping => Response::Pong,
        }
    }

    /// Resolve two task names in one network to their ids.
    fn resolve_pair(&self, network: &str, task: &str, depends_on_task: &str) -> Result<(String, String)> {
        let task = self.store.find_task(network, task)?;
        let depends_on = self.store.find_task(network, depends_on_task)?;
        Ok((task.id, depends_on.id))
    }
}

fn failure(report: eyre::Report) -> Response {
    match StoreError::from_report(&report).map(StoreError::kind) {
        Some(ErrorKind::NotFound) => Response::NotFound {
            message: report.to_string(),
        },
        Some(ErrorKind::Conflict | ErrorKind::Invalid) => Response::Invalid {
            message: report.to_string(),
        },
        None => {
            log::error!("Request failed: {:?}", report);
            Response::error(report.to_string())
        }
    }
}
