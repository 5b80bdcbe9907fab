//! Kernel error types.
//!
//! Every kernel subsystem surfaces failures through [`KernelError`], which
//! wraps the two domain taxonomies: [`ResourceError`] for quota violations
//! raised by the governor and [`FsError`] for virtual filesystem failures.
//! No operation retries or partially recovers; an error aborts the current
//! mediated call.

use std::time::Duration;

/// A quota enforced by the resource governor was exceeded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// The wall-clock CPU budget for this run has elapsed.
    #[error("cpu time limit exceeded: {elapsed:?} elapsed, limit {limit:?}")]
    CpuExceeded {
        /// Configured budget.
        limit: Duration,
        /// Time elapsed since the governor started.
        elapsed: Duration,
    },

    /// The memory ledger would exceed (or already exceeds) its limit.
    #[error("memory limit exceeded: {used} KiB > {limit} KiB")]
    MemoryExceeded {
        /// Usage, in KiB, that triggered the failure.
        used: u64,
        /// Configured limit in KiB.
        limit: u64,
    },
}

/// Virtual filesystem failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FsError {
    /// The leaf or an intermediate directory does not exist.
    #[error("path not found: {path}")]
    PathNotFound { path: String },

    /// A directory was expected but the leaf is a file.
    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    /// A file was expected but the leaf is a directory.
    #[error("is a directory: {path}")]
    IsADirectory { path: String },

    /// A file already occupies the path.
    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    /// The path is not absolute, or names the root where that is forbidden.
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Unified error type for the BoxVM kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Fs(#[from] FsError),

    /// A guest supplied an argument the operation cannot accept.
    #[error("invalid argument to {operation}: {reason}")]
    InvalidArgument { operation: String, reason: String },

    /// Reading from or writing to the host console failed.
    #[error("console error: {0}")]
    Console(#[from] std::io::Error),

    /// Kernel configuration could not be parsed.
    #[error("config error: {reason}")]
    Config { reason: String },
}

impl KernelError {
    /// Whether this error is a quota violation.
    pub fn is_resource(&self) -> bool {
        matches!(self, KernelError::Resource(_))
    }
}

/// Convenience alias used throughout the kernel crate.
pub type Result<T> = std::result::Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_exceeded_display() {
        let err = ResourceError::CpuExceeded {
            limit: Duration::from_secs(2),
            elapsed: Duration::from_secs(3),
        };
        assert_eq!(
            err.to_string(),
            "cpu time limit exceeded: 3s elapsed, limit 2s"
        );
    }

    #[test]
    fn memory_exceeded_display() {
        let err = ResourceError::MemoryExceeded {
            used: 70_000,
            limit: 65_536,
        };
        assert_eq!(
            err.to_string(),
            "memory limit exceeded: 70000 KiB > 65536 KiB"
        );
    }

    #[test]
    fn fs_errors_display() {
        let err = FsError::PathNotFound {
            path: "/missing".into(),
        };
        assert_eq!(err.to_string(), "path not found: /missing");

        let err = FsError::InvalidPath {
            path: "rel".into(),
            reason: "only absolute paths are allowed".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid path `rel`: only absolute paths are allowed"
        );
    }

    #[test]
    fn kernel_error_is_transparent() {
        let err = KernelError::from(FsError::IsADirectory { path: "/d".into() });
        assert_eq!(err.to_string(), "is a directory: /d");
        assert!(!err.is_resource());

        let err = KernelError::from(ResourceError::MemoryExceeded { used: 2, limit: 1 });
        assert!(err.is_resource());
    }

    #[test]
    fn console_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin closed");
        let err = KernelError::from(io_err);
        assert!(err.to_string().contains("stdin closed"));
    }
}
