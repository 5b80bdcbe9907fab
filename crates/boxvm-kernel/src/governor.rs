//! Resource governor.
//!
//! [`ResourceGovernor`] enforces the CPU-time and memory quotas of one guest
//! run. Enforcement is cooperative: the mediated API calls the checkpoints
//! before forwarding each guest request. Nothing here interrupts a guest that
//! stops calling into the API; that requires a host-level mechanism.

use std::time::{Duration, Instant};

use crate::error::ResourceError;
use crate::memory::MemoryLedger;

/// CPU deadline plus the memory ledger for a single run.
#[derive(Debug, Clone)]
pub struct ResourceGovernor {
    started: Instant,
    cpu_limit: Duration,
    mem_limit: u64,
    ledger: MemoryLedger,
}

impl ResourceGovernor {
    /// Start the clock now with the given quotas.
    pub fn start(cpu_limit: Duration, mem_limit_kb: u64) -> Self {
        tracing::debug!(
            cpu_limit_ms = cpu_limit.as_millis() as u64,
            mem_limit_kb,
            "resource governor started"
        );
        Self {
            started: Instant::now(),
            cpu_limit,
            mem_limit: mem_limit_kb,
            ledger: MemoryLedger::new(mem_limit_kb),
        }
    }

    /// Fail once more than `cpu_limit` has elapsed since start.
    pub fn check_cpu(&self) -> Result<(), ResourceError> {
        let elapsed = self.started.elapsed();
        if elapsed > self.cpu_limit {
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                limit_ms = self.cpu_limit.as_millis() as u64,
                "cpu time limit exceeded"
            );
            return Err(ResourceError::CpuExceeded {
                limit: self.cpu_limit,
                elapsed,
            });
        }
        Ok(())
    }

    /// Fail if `used_kb` is over the memory limit.
    pub fn check_memory(&self, used_kb: u64) -> Result<(), ResourceError> {
        if used_kb > self.mem_limit {
            tracing::warn!(used_kb, limit_kb = self.mem_limit, "memory limit exceeded");
            return Err(ResourceError::MemoryExceeded {
                used: used_kb,
                limit: self.mem_limit,
            });
        }
        Ok(())
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before `check_cpu` starts failing (zero once expired).
    pub fn remaining(&self) -> Duration {
        self.cpu_limit.saturating_sub(self.started.elapsed())
    }

    pub fn cpu_limit(&self) -> Duration {
        self.cpu_limit
    }

    pub fn mem_limit(&self) -> u64 {
        self.mem_limit
    }

    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut MemoryLedger {
        &mut self.ledger
    }
}
