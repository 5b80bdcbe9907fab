//! Memory ledger.
//!
//! [`MemoryLedger`] is pure accounting: it never touches real allocations.
//! Guests reserve and release KiB through the mediated API and the ledger
//! tracks the running total against a fixed limit.

use crate::error::ResourceError;

/// Default ledger limit: 64 MiB expressed in KiB.
pub const DEFAULT_LIMIT_KB: u64 = 64 * 1024;

/// Used/limit budget in KiB.
///
/// `used <= limit` is checked on [`allocate`](Self::allocate), not enforced
/// structurally; callers relying on it must go through the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryLedger {
    used: u64,
    limit: u64,
}

impl MemoryLedger {
    /// Create an empty ledger with the given limit in KiB.
    pub fn new(limit_kb: u64) -> Self {
        Self {
            used: 0,
            limit: limit_kb,
        }
    }

    /// Reserve `size_kb`. Fails without changing `used` if the reservation
    /// would push usage past the limit.
    pub fn allocate(&mut self, size_kb: u64) -> Result<(), ResourceError> {
        let wanted = self.used.saturating_add(size_kb);
        if wanted > self.limit {
            tracing::debug!(
                requested_kb = size_kb,
                used_kb = self.used,
                limit_kb = self.limit,
                "allocation rejected"
            );
            return Err(ResourceError::MemoryExceeded {
                used: wanted,
                limit: self.limit,
            });
        }
        self.used = wanted;
        Ok(())
    }

    /// Release `size_kb`. Over-freeing clamps usage to zero.
    pub fn free(&mut self, size_kb: u64) {
        if size_kb > self.used {
            tracing::debug!(
                freed_kb = size_kb,
                used_kb = self.used,
                "free exceeds usage, clamping to zero"
            );
        }
        self.used = self.used.saturating_sub(size_kb);
    }

    /// Currently reserved KiB.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Configured limit in KiB.
    pub fn limit(&self) -> u64 {
        self.limit
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT_KB)
    }
}
