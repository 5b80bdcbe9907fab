//! Kernel configuration.
//!
//! [`KernelConfig`] carries the per-run quotas and display settings used to
//! build a [`MediatedApi`](crate::api::MediatedApi). It deserializes from
//! TOML; every field is optional and falls back to the [`Default`] values:
//!
//! ```toml
//! cpu_time_secs = 2.0
//! memory_limit_kb = 65536
//! rng_seed = 7
//!
//! [display]
//! enabled = true
//! width = 160
//! height = 120
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};
use crate::memory::DEFAULT_LIMIT_KB;

/// Default wall-clock CPU budget, in seconds.
pub const DEFAULT_CPU_SECS: f64 = 2.0;

/// Virtual display settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Whether the guest gets a display at all.
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 160,
            height: 120,
        }
    }
}

/// Quotas and capabilities for one guest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Wall-clock budget checked at every mediated call.
    ///
    /// Default: **2.0** seconds.
    pub cpu_time_secs: f64,

    /// Memory ledger limit in KiB.
    ///
    /// Default: **65 536** (64 MiB).
    pub memory_limit_kb: u64,

    pub display: DisplayConfig,

    /// Seed for the guest RNG. Unseeded runs draw from OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            cpu_time_secs: DEFAULT_CPU_SECS,
            memory_limit_kb: DEFAULT_LIMIT_KB,
            display: DisplayConfig::default(),
            rng_seed: None,
        }
    }
}

impl KernelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| KernelError::Config {
            reason: format!("failed to parse TOML config: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| KernelError::Config {
            reason: format!("failed to read {}: {e}", path.display()),
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.display(), "kernel config loaded");
        Ok(config)
    }

    /// Reject values no run could start with.
    pub fn validate(&self) -> Result<()> {
        if !self.cpu_time_secs.is_finite() || self.cpu_time_secs < 0.0 {
            return Err(KernelError::Config {
                reason: format!(
                    "cpu_time_secs must be a non-negative number, got {}",
                    self.cpu_time_secs
                ),
            });
        }
        if self.display.enabled && (self.display.width == 0 || self.display.height == 0) {
            return Err(KernelError::Config {
                reason: format!(
                    "display size must be non-zero, got {}x{}",
                    self.display.width, self.display.height
                ),
            });
        }
        Ok(())
    }

    /// CPU budget as a [`Duration`]. Invalid values collapse to zero.
    pub fn cpu_limit(&self) -> Duration {
        Duration::try_from_secs_f64(self.cpu_time_secs).unwrap_or(Duration::ZERO)
    }

    /// Display size, or `None` when the display is disabled.
    pub fn display_size(&self) -> Option<(u32, u32)> {
        self.display
            .enabled
            .then_some((self.display.width, self.display.height))
    }

    pub fn with_cpu_time_secs(mut self, secs: f64) -> Self {
        self.cpu_time_secs = secs;
        self
    }

    pub fn with_memory_limit_kb(mut self, kb: u64) -> Self {
        self.memory_limit_kb = kb;
        self
    }

    /// Enable a display of the given size.
    pub fn with_display(mut self, width: u32, height: u32) -> Self {
        self.display = DisplayConfig {
            enabled: true,
            width,
            height,
        };
        self
    }

    pub fn without_display(mut self) -> Self {
        self.display.enabled = false;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}
