//! Sandbox configuration.
//!
//! [`SandboxConfig`] controls the engine-level limits applied to every guest
//! instance. These sit outside the kernel's cooperative quotas: the kernel
//! governor only sees mediated calls, while these limits are enforced by the
//! engine itself.

use std::time::Duration;

/// Engine-level limits for guest runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    /// Maximum linear memory a guest may hold, in bytes.
    ///
    /// Instantiation fails if a guest declares more; `memory.grow` past the
    /// limit returns -1 to the guest.
    ///
    /// Default: **16 MiB** (16 * 1024 * 1024).
    pub max_linear_memory: usize,

    /// Optional wall-clock limit after which a running guest is interrupted,
    /// in milliseconds.
    ///
    /// Unlike the kernel's CPU budget this also stops guests that never
    /// make a mediated call. A host call already in progress (such as
    /// `sleep`) finishes first.
    ///
    /// Default: **none**.
    pub hard_deadline_ms: Option<u64>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            max_linear_memory: 16 * 1024 * 1024,
            hard_deadline_ms: None,
        }
    }
}

impl SandboxConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the linear memory cap (in bytes).
    pub fn with_max_linear_memory(mut self, bytes: usize) -> Self {
        self.max_linear_memory = bytes;
        self
    }

    /// Enable the hard deadline (in milliseconds).
    pub fn with_hard_deadline_ms(mut self, ms: u64) -> Self {
        self.hard_deadline_ms = Some(ms);
        self
    }

    pub fn hard_deadline(&self) -> Option<Duration> {
        self.hard_deadline_ms.map(Duration::from_millis)
    }
}
