//! CLI entry point for BoxVM.
//!
//! This binary provides the `boxvm` command: `run` executes a guest module
//! directly, and `vm` manages a registry of named guests.

mod cli;
mod registry;
mod run;
mod snapshot;
mod template;

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, VmAction};
use crate::registry::{VmEntry, VmRegistry};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("info");

    match cli.command {
        Commands::Run { guest, options } => run::run_guest(&guest, &options, None).await,
        Commands::Vm { registry, action } => cmd_vm(&registry, action).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: vm
// ---------------------------------------------------------------------------

async fn cmd_vm(registry_path: &Path, action: VmAction) -> Result<()> {
    let mut registry = VmRegistry::load(registry_path)?;

    match action {
        VmAction::Add {
            name,
            path,
            description,
            ram,
            cpu,
        } => {
            if !path.exists() {
                bail!("guest file {} does not exist", path.display());
            }
            let entry = VmEntry {
                path,
                description,
                ram,
                cpu,
            };
            registry.add(name.as_str(), entry)?;
            println!("  VM '{name}' registered.");
        }

        VmAction::New {
            name,
            dir,
            description,
            ram,
            cpu,
        } => {
            let name = template::normalize_name(&name)?;
            if registry.get(&name).is_some() {
                bail!("VM '{name}' is already registered");
            }
            let path = template::scaffold(&name, &dir)?;
            let entry = VmEntry {
                path: path.clone(),
                description,
                ram,
                cpu,
            };
            registry.add(name.as_str(), entry)?;
            println!("  VM '{name}' created at {}.", path.display());
        }

        VmAction::Remove { name } => {
            if registry.remove(&name)? {
                println!("  VM '{name}' removed.");
            } else {
                bail!("VM '{name}' not found");
            }
        }

        VmAction::List => {
            if registry.is_empty() {
                println!("  No VMs registered.");
                return Ok(());
            }
            println!();
            println!("  {:<16} {:>8} {:>4}  {:<32} {}", "NAME", "RAM(MB)", "CPU", "PATH", "DESCRIPTION");
            for (name, entry) in registry.iter() {
                println!(
                    "  {:<16} {:>8} {:>4}  {:<32} {}",
                    name,
                    entry.ram,
                    entry.cpu,
                    entry.path.display(),
                    entry.description
                );
            }
            println!();
        }

        VmAction::Launch { name, options } => {
            let entry = registry
                .get(&name)
                .with_context(|| format!("VM '{name}' not found"))?;
            if !entry.path.exists() {
                bail!("guest file {} for VM '{name}' is missing", entry.path.display());
            }
            info!(
                vm = %name,
                path = %entry.path.display(),
                memory_limit_kb = options.mem_kb.unwrap_or(entry.memory_limit_kb()),
                "launching VM"
            );
            run::run_guest(&entry.path, &options, Some(entry.memory_limit_kb())).await?;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber with the given default log level.
///
/// The level can be overridden with the `RUST_LOG` environment variable.
fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
