//! CLI argument parsing for depnet.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "depnet",
    about = "Turnaround task dependency networks per aircraft type",
    version,
    after_help = "Logs are written to: ~/.local/share/depnet/logs/depnet.log"
)]
pub struct Cli {
    /// Path to the depnet store directory (default: current directory)
    #[arg(short = 'd', long, global = true, env = "DEPNET_DIR")]
    pub dir: Option<PathBuf>,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Initialize a new depnet store in the current directory
    Init,

    /// Manage networks (one per aircraft type)
    #[command(subcommand)]
    Network(NetworkCommand),

    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Manage dependencies between tasks
    #[command(subcommand)]
    Dep(DepCommand),

    /// Create a task with prerequisites and dependents from a JSON or YAML file
    Batch {
        /// Batch file (.json, .yaml or .yml)
        file: PathBuf,
    },

    /// Read JSON requests from stdin, one per line, and answer on stdout
    Exec,
}

#[derive(Subcommand)]
pub enum NetworkCommand {
    /// Create a network
    Create {
        /// Aircraft type, e.g. "Boeing 777"
        key: String,

        /// Description
        #[arg(short = 'D', long, default_value = "")]
        description: String,
    },

    /// List networks
    List,

    /// Show every root task with its dependents
    Show {
        /// Aircraft type
        key: String,
    },

    /// Change a network's key or description
    Update {
        /// Aircraft type
        key: String,

        /// New aircraft type
        #[arg(short = 'k', long)]
        new_key: Option<String>,

        /// New description
        #[arg(short = 'D', long)]
        description: Option<String>,
    },

    /// Delete a network with all its tasks and dependencies
    Delete {
        /// Aircraft type
        key: String,
    },
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Create a task
    Create {
        /// Aircraft type
        network: String,

        /// Task name
        name: String,

        /// Description
        #[arg(short = 'D', long)]
        description: String,
    },

    /// Show a task with its dependencies and dependents
    Show {
        /// Aircraft type
        network: String,

        /// Task name
        name: String,
    },

    /// Rename or redescribe a task
    Update {
        /// Aircraft type
        network: String,

        /// Task name
        name: String,

        /// New name
        #[arg(short = 'n', long)]
        new_name: Option<String>,

        /// New description
        #[arg(short = 'D', long)]
        description: Option<String>,
    },

    /// Delete a task and its dependencies
    Delete {
        /// Aircraft type
        network: String,

        /// Task name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum DepCommand {
    /// Record that a task depends on another
    Add {
        /// Aircraft type
        network: String,

        /// Task that waits
        task: String,

        /// Task that must be completed first
        depends_on: String,
    },

    /// Remove a dependency
    Remove {
        /// Aircraft type
        network: String,

        /// Task that waits
        task: String,

        /// Task that must be completed first
        depends_on: String,
    },
}
