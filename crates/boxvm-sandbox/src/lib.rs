//! BoxVM guest sandbox.
//!
//! This crate loads untrusted guest programs and runs them against a
//! [`boxvm_kernel::MediatedApi`]:
//!
//! - **[`config`]** -- [`SandboxConfig`] controls the linear memory cap and
//!   the optional hard deadline.
//! - **[`error`]** -- [`SandboxError`] enumerates every way a run can end
//!   badly.
//! - **[`host`]** -- the `api` import module: host functions, status codes
//!   and the event record layout guests see.
//! - **[`loader`]** -- [`SandboxLoader`] is the main entry point: compile
//!   guest source, bind the API, call `main`.
//!
//! Guests are WebAssembly modules (text or binary) exporting `main: () -> ()`
//! and, if they pass strings, a `memory`. The loader binds nothing but the
//! `api` module. That boundary is a property of the engine rather than
//! something the kernel enforces; the kernel itself stays advisory.

pub mod config;
pub mod error;
pub mod host;
pub mod loader;

// Re-export the most commonly used types at the crate root.
pub use config::SandboxConfig;
pub use error::{Result, SandboxError};
pub use loader::{InterruptHandle, RunOutcome, SandboxLoader};
