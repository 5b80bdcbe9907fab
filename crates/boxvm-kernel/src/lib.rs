//! BoxVM execution kernel.
//!
//! This crate provides everything a guest program can reach during one run:
//!
//! - **[`memory`]** -- [`MemoryLedger`], the used/limit KiB budget.
//! - **[`governor`]** -- [`ResourceGovernor`], the wall-clock CPU deadline
//!   plus the ledger. Checks are cooperative checkpoints, never preemptive.
//! - **[`vfs`]** -- [`VirtualFilesystem`], an in-memory tree of files and
//!   directories addressed by absolute paths.
//! - **[`display`]** -- framebuffer, windows, widgets, the window manager and
//!   the [`DisplayServer`] that queues input for the guest.
//! - **[`api`]** -- [`MediatedApi`], the sole capability surface guest code
//!   holds. Every call passes through a governor check first.
//! - **[`console`]** -- the [`Console`] trait behind guest `print`/`input`.
//! - **[`config`]** -- [`KernelConfig`], per-run quotas loaded from TOML.
//! - **[`error`]** -- [`KernelError`] and its resource and filesystem
//!   taxonomies via [`thiserror`].
//!
//! A kernel instance is exclusively owned by one run. Hosts running several
//! guests build one [`MediatedApi`] per guest; nothing here is global.

pub mod api;
pub mod config;
pub mod console;
pub mod display;
pub mod error;
pub mod governor;
pub mod memory;
pub mod vfs;

// Re-export the most commonly used types at the crate root for convenience.
pub use api::MediatedApi;
pub use config::{DisplayConfig, KernelConfig};
pub use console::{BufferConsole, Console, StdConsole};
pub use display::{
    Button, Callback, DisplayServer, Event, FrameBuffer, Rgb, ScriptedInput, VirtualWindow,
    WindowId, WindowManager,
};
pub use error::{FsError, KernelError, ResourceError, Result};
pub use governor::ResourceGovernor;
pub use memory::MemoryLedger;
pub use vfs::VirtualFilesystem;
