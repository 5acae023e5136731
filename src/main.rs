//! depnet CLI - turnaround task dependency networks per aircraft type.

use clap::Parser;
use colored::*;
use depnet::{
    BatchSpec, BatchStatus, Config, Direction, Service, Store, StoreBatchExt, StoreClosureExt, TaskNode, TaskSpec,
};
use eyre::{Context, Result};
use log::info;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

mod cli;

use cli::{Cli, Command, DepCommand, NetworkCommand, TaskCommand};

fn setup_logging(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.log_dir).context("Failed to create log directory")?;

    let log_file = config.log_file();

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
    Ok(())
}

/// Print one direction of a tree, indented by depth.
fn print_tree(node: &TaskNode, direction: Direction) {
    let mut stack = vec![(0usize, node)];
    while let Some((depth, node)) = stack.pop() {
        let marker = match (depth, direction) {
            (0, _) => "●".bold(),
            (_, Direction::Dependents) => "→".blue(),
            (_, Direction::Dependencies) => "←".yellow(),
        };
        println!("{}{} {}", "  ".repeat(depth), marker, node.name);

        let children = match direction {
            Direction::Dependents => &node.dependents,
            Direction::Dependencies => &node.dependencies,
        };
        for child in children.iter().rev() {
            stack.push((depth + 1, child));
        }
    }
}

fn load_batch(path: &Path) -> Result<BatchSpec> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let spec = if yaml {
        serde_yaml::from_str(&content).context("Failed to parse YAML batch")?
    } else {
        serde_json::from_str(&content).context("Failed to parse JSON batch")?
    };
    Ok(spec)
}

fn run_network(store_dir: &Path, json: bool, command: NetworkCommand) -> Result<()> {
    match command {
        NetworkCommand::Create { key, description } => {
            let mut store = Store::open(store_dir).context("Failed to open store")?;
            let network = store
                .create_network(&key, &description)
                .context("Failed to create network")?;

            if json {
                print_json(&network)?;
            } else {
                println!("{} Created: {} {}", "✓".green(), network.id.cyan(), network.key);
            }
        }

        NetworkCommand::List => {
            let store = Store::open(store_dir).context("Failed to open store")?;
            let networks = store.list_networks().context("Failed to list networks")?;

            if json {
                print_json(&networks)?;
            } else if networks.is_empty() {
                println!("{}", "No networks found".dimmed());
            } else {
                for network in networks {
                    println!("{} {} {}", network.id.cyan(), network.key, network.description.dimmed());
                }
            }
        }

        NetworkCommand::Show { key } => {
            let store = Store::open(store_dir).context("Failed to open store")?;
            let roots = store.network_view(&key).context("Failed to expand network")?;

            if json {
                print_json(&roots)?;
            } else if roots.is_empty() {
                println!("{}", "No tasks".dimmed());
            } else {
                for root in &roots {
                    print_tree(root, Direction::Dependents);
                }
            }
        }

        NetworkCommand::Update {
            key,
            new_key,
            description,
        } => {
            let mut store = Store::open(store_dir).context("Failed to open store")?;
            let network = store
                .update_network(&key, new_key.as_deref(), description.as_deref())
                .context("Failed to update network")?;

            println!("{} Updated: {} {}", "✓".green(), network.id.cyan(), network.key);
        }

        NetworkCommand::Delete { key } => {
            let mut store = Store::open(store_dir).context("Failed to open store")?;
            store.delete_network(&key).context("Failed to delete network")?;

            println!("{} Deleted network {}", "✓".green(), key);
        }
    }

    Ok(())
}

fn run_task(store_dir: &Path, json: bool, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::Create {
            network,
            name,
            description,
        } => {
            let mut store = Store::open(store_dir).context("Failed to open store")?;
            let network = store.require_network(&network)?;
            let task = store
                .create_task(&TaskSpec::new(network.id, name, description))
                .context("Failed to create task")?;

            if json {
                print_json(&task)?;
            } else {
                println!("{} Created: {} {}", "✓".green(), task.id.cyan(), task.name);
            }
        }

        TaskCommand::Show { network, name } => {
            let store = Store::open(store_dir).context("Failed to open store")?;
            let node = store.task_view(&network, &name).context("Failed to expand task")?;

            if json {
                print_json(&node)?;
            } else {
                println!("{}: {}", "Task".bold(), node.name);
                println!("{}: {}", "Description".bold(), node.description);
                println!("{}:", "Dependencies".bold());
                print_tree(&node, Direction::Dependencies);
                println!("{}:", "Dependents".bold());
                print_tree(&node, Direction::Dependents);
            }
        }

        TaskCommand::Update {
            network,
            name,
            new_name,
            description,
        } => {
            let mut store = Store::open(store_dir).context("Failed to open store")?;
            let task = store
                .update_task(&network, &name, new_name.as_deref(), description.as_deref())
                .context("Failed to update task")?;

            println!("{} Updated: {} {}", "✓".green(), task.id.cyan(), task.name);
        }

        TaskCommand::Delete { network, name } => {
            let mut store = Store::open(store_dir).context("Failed to open store")?;
            store.delete_task(&network, &name).context("Failed to delete task")?;

            println!("{} Deleted task {}", "✓".green(), name);
        }
    }

    Ok(())
}

fn run_dep(store_dir: &Path, command: DepCommand) -> Result<()> {
    let mut store = Store::open(store_dir).context("Failed to open store")?;

    match command {
        DepCommand::Add {
            network,
            task,
            depends_on,
        } => {
            let t = store.find_task(&network, &task)?;
            let d = store.find_task(&network, &depends_on)?;
            store.add_edge(&t.id, &d.id).context("Failed to add dependency")?;

            println!("{} {} now depends on {}", "✓".green(), task.cyan(), depends_on.cyan());
        }

        DepCommand::Remove {
            network,
            task,
            depends_on,
        } => {
            let t = store.find_task(&network, &task)?;
            let d = store.find_task(&network, &depends_on)?;
            store.remove_edge(&t.id, &d.id).context("Failed to remove dependency")?;

            println!("{} {} no longer depends on {}", "✓".green(), task.cyan(), depends_on.cyan());
        }
    }

    Ok(())
}

fn run(cli: Cli, config: &Config) -> Result<()> {
    let store_dir = config.root.as_path();

    match cli.command {
        Command::Init => {
            Store::init(store_dir).context("Failed to initialize depnet store")?;
            println!("{} Initialized depnet store in {}", "✓".green(), store_dir.display());
        }

        Command::Network(command) => run_network(store_dir, cli.json, command)?,

        Command::Task(command) => run_task(store_dir, cli.json, command)?,

        Command::Dep(command) => run_dep(store_dir, command)?,

        Command::Batch { file } => {
            let spec = load_batch(&file)?;
            let mut store = Store::open(store_dir).context("Failed to open store")?;
            let report = store.create_batch(&spec).context("Batch failed")?;

            if cli.json {
                print_json(&report)?;
            } else {
                println!(
                    "{} {}: {} dependencies, {} dependents, {} edges",
                    "✓".green(),
                    report.task.name,
                    report.dependencies.len(),
                    report.dependents.len(),
                    report.edges.len()
                );
                for failure in &report.failures {
                    println!(
                        "  {} {:?} #{} {}: {}",
                        "✗".red(),
                        failure.side,
                        failure.index,
                        failure.name,
                        failure.reason.dimmed()
                    );
                }
            }

            if report.status() == BatchStatus::Partial {
                eyre::bail!("{} of the batch siblings failed", report.failures.len());
            }
        }

        Command::Exec => {
            let store = Store::open(store_dir).context("Failed to open store")?;
            let mut service = Service::new(store);
            let handled = service
                .serve(io::stdin().lock(), io::stdout().lock())
                .context("Request loop failed")?;
            info!("Handled {} request(s)", handled);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(cli.dir.clone());

    setup_logging(&config).context("Failed to setup logging")?;
    info!("Command: {:?}", std::env::args().collect::<Vec<_>>());
    info!("Store database: {}", config.db_path().display());

    if let Err(e) = run(cli, &config) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
