//! VM registry.
//!
//! A JSON file mapping VM names to guest paths and descriptive metadata:
//!
//! ```json
//! {
//!   "demo": { "path": "guests/demo/main.wat", "description": "No description", "ram": 64, "cpu": 1 }
//! }
//! ```
//!
//! `ram` (MB) becomes the kernel memory limit when a VM is launched. `cpu`
//! is informational; the CPU-time budget comes from the kernel config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One registered VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmEntry {
    pub path: PathBuf,
    #[serde(default = "default_description")]
    pub description: String,
    /// RAM in MB.
    #[serde(default = "default_ram")]
    pub ram: u64,
    /// CPU cores.
    #[serde(default = "default_cpu")]
    pub cpu: u32,
}

fn default_description() -> String {
    "No description".into()
}

fn default_ram() -> u64 {
    64
}

fn default_cpu() -> u32 {
    1
}

impl VmEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            description: default_description(),
            ram: default_ram(),
            cpu: default_cpu(),
        }
    }

    /// Kernel memory limit derived from `ram`.
    pub fn memory_limit_kb(&self) -> u64 {
        self.ram.saturating_mul(1024)
    }
}

/// Registry persisted to a JSON file.
#[derive(Debug)]
pub struct VmRegistry {
    path: PathBuf,
    vms: BTreeMap<String, VmEntry>,
}

impl VmRegistry {
    /// Load the registry at `path`.
    ///
    /// A missing file is an empty registry. So is an unparsable one, with a
    /// warning; the next save overwrites it.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let vms = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(vms) => vms,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "could not parse VM registry, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        Ok(Self { path, vms })
    }

    pub fn save(&self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.vms).context("failed to serialize VM registry")?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), count = self.vms.len(), "VM registry saved");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace `name` and save.
    pub fn add(&mut self, name: impl Into<String>, entry: VmEntry) -> Result<()> {
        let name = name.into();
        tracing::info!(vm = %name, path = %entry.path.display(), "registering VM");
        self.vms.insert(name, entry);
        self.save()
    }

    /// Remove `name` and save. Returns whether it was registered.
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        if self.vms.remove(name).is_none() {
            return Ok(false);
        }
        tracing::info!(vm = %name, "VM removed");
        self.save()?;
        Ok(true)
    }

    pub fn get(&self, name: &str) -> Option<&VmEntry> {
        self.vms.get(name)
    }

    /// Entries sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &VmEntry)> {
        self.vms.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.vms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vms.is_empty()
    }
}
