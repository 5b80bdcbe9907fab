//! CLI argument definitions for BoxVM.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// BoxVM -- run guest programs inside a tiny virtual machine.
#[derive(Parser)]
#[command(
    name = "boxvm",
    version,
    about = "BoxVM -- run guest programs inside a tiny virtual machine",
    long_about = "Runs WebAssembly guests under CPU-time and memory quotas with a virtual \
                  filesystem and a virtual display, and keeps a registry of named VMs."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a guest program (WebAssembly text or binary).
    Run {
        /// Path to the guest module.
        guest: PathBuf,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Manage the VM registry.
    Vm {
        /// Registry file.
        #[arg(long, global = true, default_value = "vms.json")]
        registry: PathBuf,

        #[command(subcommand)]
        action: VmAction,
    },
}

/// Actions for managing registered VMs.
#[derive(Subcommand)]
pub enum VmAction {
    /// Register a guest under a name, replacing any existing entry.
    Add {
        /// Name of the VM.
        name: String,
        /// Path to the guest module.
        path: PathBuf,
        /// Free-form description.
        #[arg(long, short, default_value = "No description")]
        description: String,
        /// RAM in MB; becomes the memory limit at launch.
        #[arg(long, default_value_t = 64)]
        ram: u64,
        /// CPU cores (descriptive only).
        #[arg(long, default_value_t = 1)]
        cpu: u32,
    },
    /// Scaffold a starter guest and register it.
    New {
        /// Name of the VM.
        name: String,
        /// Directory the guest is created under.
        #[arg(long, default_value = "guests")]
        dir: PathBuf,
        /// Free-form description.
        #[arg(long, short, default_value = "No description")]
        description: String,
        /// RAM in MB.
        #[arg(long, default_value_t = 64)]
        ram: u64,
        /// CPU cores (descriptive only).
        #[arg(long, default_value_t = 1)]
        cpu: u32,
    },
    /// Remove a VM from the registry.
    Remove {
        /// Name of the VM.
        name: String,
    },
    /// List registered VMs.
    List,
    /// Run a registered VM.
    Launch {
        /// Name of the VM.
        name: String,

        #[command(flatten)]
        options: RunOptions,
    },
}

/// Settings shared by `run` and `vm launch`. Flags override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct RunOptions {
    /// Kernel config file (TOML).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// CPU-time budget in seconds.
    #[arg(long)]
    pub cpu_secs: Option<f64>,

    /// Memory limit in KiB.
    #[arg(long)]
    pub mem_kb: Option<u64>,

    /// Run without a virtual display.
    #[arg(long)]
    pub no_display: bool,

    /// Display width in pixels.
    #[arg(long)]
    pub width: Option<u32>,

    /// Display height in pixels.
    #[arg(long)]
    pub height: Option<u32>,

    /// Input script replayed into the display.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Write the final framebuffer to this PNG file.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    /// Interrupt the guest after this many milliseconds, even without
    /// mediated calls.
    #[arg(long)]
    pub deadline_ms: Option<u64>,

    /// Seed for the guest RNG.
    #[arg(long)]
    pub seed: Option<u64>,
}
