//! Sandbox error types.
//!
//! Every way a guest run can end badly is a [`SandboxError`]. Failures raised
//! by the kernel inside a mediated call keep their original
//! [`KernelError`] so hosts can tell quota violations from guest bugs.

use boxvm_kernel::KernelError;

/// Unified error type for guest loading and execution.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// The guest has no callable `main` entry point.
    #[error("missing entry point: {reason}")]
    MissingEntryPoint {
        /// What was wrong with the `main` export.
        reason: String,
    },

    /// Guest source failed to parse or validate.
    #[error("guest compilation error: {0}")]
    Compilation(String),

    /// The guest could not be instantiated (e.g. imports outside `api`).
    #[error("guest instantiation error: {0}")]
    Instantiation(String),

    /// The guest trapped on its own (e.g. `unreachable`).
    #[error("guest trap: {0}")]
    Trap(String),

    /// The hard deadline elapsed before the guest returned.
    #[error("hard deadline exceeded: guest ran longer than {limit_ms}ms")]
    DeadlineExceeded {
        /// The configured limit in milliseconds.
        limit_ms: u64,
    },

    /// The host interrupted the run.
    #[error("guest interrupted by host")]
    Interrupted,

    /// A mediated call failed and terminated the run.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// An I/O error occurred (e.g. reading a guest file from disk).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Whether the run was stopped by a kernel quota.
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Kernel(err) if err.is_resource())
    }
}

/// Convenience alias used throughout the sandbox crate.
pub type Result<T> = std::result::Result<T, SandboxError>;
