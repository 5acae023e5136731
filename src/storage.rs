//! Storage layer for depnet: SQLite tables for networks, tasks and edges.

use crate::types::{Edge, EdgeFilter, Network, Task};
use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use std::fs;
use std::path::Path;

/// Storage directory name.
pub const DEPNET_DIR: &str = ".depnet";

/// SQLite database file.
pub const DB_FILE: &str = "depnet.db";

const NETWORK_COLUMNS: &str = "id, network_key, description, created_at";
const TASK_COLUMNS: &str = "id, network_id, name, description, created_at";

/// Storage handle for reading/writing depnet data.
pub struct Storage {
    db: Connection,
}

impl Storage {
    /// Initialize storage in the given directory.
    pub fn init(root: &Path) -> Result<Self> {
        let depnet_dir = root.join(DEPNET_DIR);
        fs::create_dir_all(&depnet_dir).context("Failed to create .depnet directory")?;

        let db_path = depnet_dir.join(DB_FILE);
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let storage = Self { db };
        storage.init_schema()?;

        log::debug!("Initialized storage at {}", db_path.display());
        Ok(storage)
    }

    /// Open existing storage.
    pub fn open(root: &Path) -> Result<Self> {
        let depnet_dir = root.join(DEPNET_DIR);
        if !depnet_dir.exists() {
            eyre::bail!("No .depnet directory found. Run 'depnet init' first.");
        }

        let db_path = depnet_dir.join(DB_FILE);
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let storage = Self { db };
        storage.init_schema()?;

        Ok(storage)
    }

    /// Initialize SQLite schema.
    fn init_schema(&self) -> Result<()> {
        self.db
            .execute_batch(
                r#"
                PRAGMA foreign_keys = ON;

                CREATE TABLE IF NOT EXISTS networks (
                    id TEXT PRIMARY KEY,
                    network_key TEXT NOT NULL UNIQUE,
                    description TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id TEXT PRIMARY KEY,
                    network_id TEXT NOT NULL REFERENCES networks(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_tasks_network_name ON tasks(network_id, name);

                CREATE TABLE IF NOT EXISTS edges (
                    task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                    depends_on_task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
                    created_at TEXT NOT NULL,
                    UNIQUE (task_id, depends_on_task_id)
                );
                CREATE INDEX IF NOT EXISTS idx_edges_depends_on ON edges(depends_on_task_id);
            "#,
            )
            .context("Failed to initialize schema")?;

        Ok(())
    }

    // Networks

    /// Insert a network row.
    pub fn insert_network(&self, network: &Network) -> Result<()> {
        self.db
            .execute(
                "INSERT INTO networks (id, network_key, description, created_at) VALUES (?, ?, ?, ?)",
                params![
                    network.id,
                    network.key,
                    network.description,
                    network.created_at.to_rfc3339()
                ],
            )
            .context("Failed to insert network")?;
        Ok(())
    }

    /// Get a network by id.
    pub fn get_network(&self, id: &str) -> Result<Option<Network>> {
        let sql = format!("SELECT {} FROM networks WHERE id = ?", NETWORK_COLUMNS);
        let network = self
            .db
            .query_row(&sql, params![id], Self::row_to_network)
            .optional()?;
        Ok(network)
    }

    /// Get a network by its natural key.
    pub fn get_network_by_key(&self, key: &str) -> Result<Option<Network>> {
        let sql = format!("SELECT {} FROM networks WHERE network_key = ?", NETWORK_COLUMNS);
        let network = self
            .db
            .query_row(&sql, params![key], Self::row_to_network)
            .optional()?;
        Ok(network)
    }

    /// List all networks in insertion order.
    pub fn list_networks(&self) -> Result<Vec<Network>> {
        let sql = format!("SELECT {} FROM networks ORDER BY rowid", NETWORK_COLUMNS);
        let mut stmt = self.db.prepare(&sql)?;
        let networks = stmt
            .query_map([], Self::row_to_network)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(networks)
    }

    /// Overwrite key and description of an existing network. Returns false if absent.
    pub fn update_network(&self, network: &Network) -> Result<bool> {
        let changed = self
            .db
            .execute(
                "UPDATE networks SET network_key = ?, description = ? WHERE id = ?",
                params![network.key, network.description, network.id],
            )
            .context("Failed to update network")?;
        Ok(changed > 0)
    }

    /// Delete a network and, through the foreign keys, its tasks and edges.
    pub fn delete_network(&self, id: &str) -> Result<bool> {
        let changed = self
            .db
            .execute("DELETE FROM networks WHERE id = ?", params![id])
            .context("Failed to delete network")?;
        Ok(changed > 0)
    }

    // Tasks

    /// Insert a task row.
    pub fn insert_task(&self, task: &Task) -> Result<()> {
        self.db
            .execute(
                "INSERT INTO tasks (id, network_id, name, description, created_at) VALUES (?, ?, ?, ?, ?)",
                params![
                    task.id,
                    task.network_id,
                    task.name,
                    task.description,
                    task.created_at.to_rfc3339()
                ],
            )
            .context("Failed to insert task")?;
        Ok(())
    }

    /// Get a task by network and name. The first inserted match wins.
    pub fn get_task(&self, network_id: &str, name: &str) -> Result<Option<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE network_id = ? AND name = ? ORDER BY rowid LIMIT 1",
            TASK_COLUMNS
        );
        let task = self
            .db
            .query_row(&sql, params![network_id, name], Self::row_to_task)
            .optional()?;
        Ok(task)
    }

    /// Get a task by id.
    pub fn get_task_by_id(&self, id: &str) -> Result<Option<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?", TASK_COLUMNS);
        let task = self.db.query_row(&sql, params![id], Self::row_to_task).optional()?;
        Ok(task)
    }

    /// List the tasks of a network in insertion order.
    pub fn list_tasks(&self, network_id: &str) -> Result<Vec<Task>> {
        let sql = format!("SELECT {} FROM tasks WHERE network_id = ? ORDER BY rowid", TASK_COLUMNS);
        let mut stmt = self.db.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![network_id], Self::row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Overwrite name and description of an existing task. Returns false if absent.
    pub fn update_task(&self, task: &Task) -> Result<bool> {
        let changed = self
            .db
            .execute(
                "UPDATE tasks SET name = ?, description = ? WHERE id = ?",
                params![task.name, task.description, task.id],
            )
            .context("Failed to update task")?;
        Ok(changed > 0)
    }

    /// Delete a task and every edge touching it.
    pub fn delete_task(&self, id: &str) -> Result<bool> {
        let changed = self
            .db
            .execute("DELETE FROM tasks WHERE id = ?", params![id])
            .context("Failed to delete task")?;
        Ok(changed > 0)
    }

    // Edges

    /// Insert an edge row.
    pub fn insert_edge(&self, edge: &Edge) -> Result<()> {
        self.db
            .execute(
                "INSERT INTO edges (task_id, depends_on_task_id, created_at) VALUES (?, ?, ?)",
                params![edge.task_id, edge.depends_on_task_id, edge.created_at.to_rfc3339()],
            )
            .context("Failed to insert edge")?;
        Ok(())
    }

    /// Get the edge between two tasks, if any.
    pub fn get_edge(&self, task_id: &str, depends_on_task_id: &str) -> Result<Option<Edge>> {
        let edge = self
            .db
            .query_row(
                "SELECT task_id, depends_on_task_id, created_at FROM edges WHERE task_id = ? AND depends_on_task_id = ?",
                params![task_id, depends_on_task_id],
                Self::row_to_edge,
            )
            .optional()?;
        Ok(edge)
    }

    /// Edges matching the filter, in insertion order.
    pub fn filter_edges(&self, filter: &EdgeFilter) -> Result<Vec<Edge>> {
        let mut sql = String::from(
            r#"
            SELECT e.task_id, e.depends_on_task_id, e.created_at
            FROM edges e
            JOIN tasks t ON t.id = e.task_id
            WHERE 1 = 1
            "#,
        );
        let mut args: Vec<&str> = Vec::new();

        if let Some(id) = &filter.task_id {
            sql.push_str(" AND e.task_id = ?");
            args.push(id);
        }
        if let Some(id) = &filter.depends_on_task_id {
            sql.push_str(" AND e.depends_on_task_id = ?");
            args.push(id);
        }
        if let Some(id) = &filter.network_id {
            sql.push_str(" AND t.network_id = ?");
            args.push(id);
        }
        sql.push_str(" ORDER BY e.rowid");

        let mut stmt = self.db.prepare(&sql)?;
        let edges = stmt
            .query_map(params_from_iter(args), Self::row_to_edge)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    /// Delete the edge between two tasks. Returns false if absent.
    pub fn delete_edge(&self, task_id: &str, depends_on_task_id: &str) -> Result<bool> {
        let changed = self
            .db
            .execute(
                "DELETE FROM edges WHERE task_id = ? AND depends_on_task_id = ?",
                params![task_id, depends_on_task_id],
            )
            .context("Failed to delete edge")?;
        Ok(changed > 0)
    }

    fn row_to_network(row: &rusqlite::Row) -> rusqlite::Result<Network> {
        let created_at: String = row.get(3)?;
        Ok(Network {
            id: row.get(0)?,
            key: row.get(1)?,
            description: row.get(2)?,
            created_at: parse_timestamp(&created_at),
        })
    }

    fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        let created_at: String = row.get(4)?;
        Ok(Task {
            id: row.get(0)?,
            network_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            created_at: parse_timestamp(&created_at),
        })
    }

    fn row_to_edge(row: &rusqlite::Row) -> rusqlite::Result<Edge> {
        let created_at: String = row.get(2)?;
        Ok(Edge {
            task_id: row.get(0)?,
            depends_on_task_id: row.get(1)?,
            created_at: parse_timestamp(&created_at),
        })
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
