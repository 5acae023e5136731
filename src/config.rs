//! Where the store and the logs live.

use crate::storage::{DB_FILE, DEPNET_DIR};
use std::path::PathBuf;

/// Log file name inside the log directory.
const LOG_FILE: &str = "depnet.log";

/// Paths used by the binary.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory containing .depnet
    pub root: PathBuf,

    /// Directory for log files
    pub log_dir: PathBuf,
}

impl Config {
    /// Config rooted at `root` with the default log directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            log_dir: default_log_dir(),
        }
    }

    /// Use `dir` if given, otherwise the current directory.
    pub fn resolve(dir: Option<PathBuf>) -> Self {
        let root = dir.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        Self::new(root)
    }

    /// Override the log directory.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Get the database path.
    pub fn db_path(&self) -> PathBuf {
        self.root.join(DEPNET_DIR).join(DB_FILE)
    }

    /// Get the log file path.
    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(LOG_FILE)
    }
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("depnet")
        .join("logs")
}
