//! Mediated API.
//!
//! [`MediatedApi`] is the only capability a guest program holds. It owns
//! one run's [`ResourceGovernor`], [`VirtualFilesystem`], optional
//! [`DisplayServer`] and [`Console`], and forwards guest calls to them.
//!
//! Every operation calls [`ResourceGovernor::check_cpu`] before doing
//! anything else, so a call made after the deadline fails without side
//! effects. Graphics calls are silent no-ops when no display is attached.

use std::fmt;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::KernelConfig;
use crate::console::{Console, StdConsole};
use crate::display::{
    Button, Callback, DisplayServer, Event, FrameBuffer, MAX_WINDOW_SIZE, Rgb, WindowId,
};
use crate::error::{KernelError, Result};
use crate::governor::ResourceGovernor;
use crate::vfs::VirtualFilesystem;

/// Capability surface handed to guest code for one run.
pub struct MediatedApi {
    governor: ResourceGovernor,
    fs: VirtualFilesystem,
    display: Option<DisplayServer>,
    console: Box<dyn Console>,
    rng: StdRng,
}

impl MediatedApi {
    /// Headless API over `governor` and `fs`, printing to stdout.
    pub fn new(governor: ResourceGovernor, fs: VirtualFilesystem) -> Self {
        Self {
            governor,
            fs,
            display: None,
            console: Box::new(StdConsole),
            rng: StdRng::from_entropy(),
        }
    }

    /// Build a fresh kernel instance from `config`.
    ///
    /// The governor clock starts now.
    pub fn from_config(config: &KernelConfig) -> Self {
        let governor = ResourceGovernor::start(config.cpu_limit(), config.memory_limit_kb);
        let mut api = Self::new(governor, VirtualFilesystem::new());
        if let Some((width, height)) = config.display_size() {
            api.display = Some(DisplayServer::new(width, height));
        }
        if let Some(seed) = config.rng_seed {
            api.rng = StdRng::seed_from_u64(seed);
        }
        tracing::debug!(
            cpu_secs = config.cpu_time_secs,
            memory_limit_kb = config.memory_limit_kb,
            display = api.display.is_some(),
            "mediated api created"
        );
        api
    }

    pub fn with_display(mut self, display: DisplayServer) -> Self {
        self.display = Some(display);
        self
    }

    pub fn without_display(mut self) -> Self {
        self.display = None;
        self
    }

    pub fn with_console(mut self, console: impl Console + 'static) -> Self {
        self.console = Box::new(console);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn governor(&self) -> &ResourceGovernor {
        &self.governor
    }

    pub fn filesystem(&self) -> &VirtualFilesystem {
        &self.fs
    }

    /// Direct filesystem access for the host, bypassing governor checks.
    pub fn filesystem_mut(&mut self) -> &mut VirtualFilesystem {
        &mut self.fs
    }

    pub fn display(&self) -> Option<&DisplayServer> {
        self.display.as_ref()
    }

    pub fn display_mut(&mut self) -> Option<&mut DisplayServer> {
        self.display.as_mut()
    }

    /// The composited framebuffer, if a display is attached.
    pub fn framebuffer(&self) -> Option<&FrameBuffer> {
        self.display.as_ref().map(DisplayServer::framebuffer)
    }

    // -- governor --------------------------------------------------------

    /// Explicit CPU checkpoint.
    pub fn check_cpu(&self) -> Result<()> {
        self.governor.check_cpu()?;
        Ok(())
    }

    /// Explicit memory checkpoint against the current ledger usage.
    pub fn check_memory(&self) -> Result<()> {
        self.check_cpu()?;
        self.governor.check_memory(self.governor.ledger().used())?;
        Ok(())
    }

    // -- filesystem ------------------------------------------------------

    pub fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        self.check_cpu()?;
        Ok(self.fs.list_dir(path)?)
    }

    pub fn read_file(&self, path: &str) -> Result<String> {
        self.check_cpu()?;
        Ok(self.fs.read_file(path)?)
    }

    pub fn write_file(&mut self, path: &str, content: impl Into<String>) -> Result<()> {
        self.check_cpu()?;
        let content = content.into();
        tracing::debug!(path, bytes = content.len(), "guest write_file");
        Ok(self.fs.write_file(path, content)?)
    }

    pub fn make_dir(&mut self, path: &str) -> Result<()> {
        self.check_cpu()?;
        tracing::debug!(path, "guest make_dir");
        Ok(self.fs.make_dir(path)?)
    }

    pub fn delete(&mut self, path: &str) -> Result<()> {
        self.check_cpu()?;
        tracing::debug!(path, "guest delete");
        Ok(self.fs.delete(path)?)
    }

    pub fn file_exists(&self, path: &str) -> Result<bool> {
        self.check_cpu()?;
        Ok(self.fs.file_exists(path))
    }

    // -- console ---------------------------------------------------------

    pub fn print(&mut self, text: &str) -> Result<()> {
        self.check_cpu()?;
        self.console.write_line(text)?;
        Ok(())
    }

    pub fn input(&mut self, prompt: &str) -> Result<String> {
        self.check_cpu()?;
        Ok(self.console.read_line(prompt)?)
    }

    // -- misc ------------------------------------------------------------

    /// Block the calling thread for `seconds`.
    pub fn sleep(&self, seconds: f64) -> Result<()> {
        self.check_cpu()?;
        let duration = Duration::try_from_secs_f64(seconds).map_err(|_| {
            KernelError::InvalidArgument {
                operation: "sleep".into(),
                reason: format!("expected a non-negative finite duration, got {seconds}"),
            }
        })?;
        std::thread::sleep(duration);
        Ok(())
    }

    /// Uniform integer in `lo..=hi`.
    pub fn rand(&mut self, lo: i64, hi: i64) -> Result<i64> {
        self.check_cpu()?;
        if lo > hi {
            return Err(KernelError::InvalidArgument {
                operation: "rand".into(),
                reason: format!("empty range {lo}..={hi}"),
            });
        }
        Ok(self.rng.gen_range(lo..=hi))
    }

    // -- memory ----------------------------------------------------------

    pub fn memory_used(&self) -> Result<u64> {
        self.check_cpu()?;
        Ok(self.governor.ledger().used())
    }

    pub fn memory_limit(&self) -> Result<u64> {
        self.check_cpu()?;
        Ok(self.governor.ledger().limit())
    }

    /// Charge `kb` KiB to the ledger.
    pub fn allocate(&mut self, kb: u64) -> Result<()> {
        self.check_cpu()?;
        self.governor.ledger_mut().allocate(kb)?;
        self.governor
            .check_memory(self.governor.ledger().used())?;
        Ok(())
    }

    pub fn free(&mut self, kb: u64) -> Result<()> {
        self.check_cpu()?;
        self.governor.ledger_mut().free(kb);
        Ok(())
    }

    // -- graphics --------------------------------------------------------

    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) -> Result<()> {
        self.check_cpu()?;
        if let Some(display) = self.display.as_mut() {
            display.framebuffer_mut().set_pixel(x, y, color);
        }
        Ok(())
    }

    pub fn clear_screen(&mut self, color: Rgb) -> Result<()> {
        self.check_cpu()?;
        if let Some(display) = self.display.as_mut() {
            display.framebuffer_mut().clear(color);
        }
        Ok(())
    }

    /// Fill a rectangle one pixel at a time.
    pub fn draw_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Rgb) -> Result<()> {
        self.check_cpu()?;
        let Some(display) = self.display.as_mut() else {
            return Ok(());
        };
        let fb = display.framebuffer_mut();
        for i in 0..width.max(0) {
            for j in 0..height.max(0) {
                fb.set_pixel(x.saturating_add(i), y.saturating_add(j), color);
            }
        }
        Ok(())
    }

    /// Drain queued input events, oldest first, after pumping host input.
    pub fn get_events(&mut self) -> Result<Vec<Event>> {
        self.check_cpu()?;
        let Some(display) = self.display.as_mut() else {
            return Ok(Vec::new());
        };
        display.pump();
        Ok(display.drain_events())
    }

    // -- windowing -------------------------------------------------------

    /// Create a focused top-level window. `None` without a display.
    ///
    /// Sizes above [`MAX_WINDOW_SIZE`] are rejected; negative sizes make an
    /// empty window.
    pub fn create_window(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        title: &str,
    ) -> Result<Option<WindowId>> {
        self.check_cpu()?;
        check_size("create_window", width, height)?;
        Ok(self
            .display
            .as_mut()
            .map(|display| display.window_manager_mut().create_window(x, y, width, height, title)))
    }

    /// Write a content-local pixel. Returns `false` if the window is gone.
    pub fn window_set_pixel(&mut self, id: WindowId, x: i32, y: i32, color: Rgb) -> Result<bool> {
        self.check_cpu()?;
        Ok(match self.window_mut(id) {
            Some(window) => {
                window.set_pixel(x, y, color);
                true
            }
            None => false,
        })
    }

    pub fn window_clear(&mut self, id: WindowId, color: Rgb) -> Result<bool> {
        self.check_cpu()?;
        Ok(match self.window_mut(id) {
            Some(window) => {
                window.clear(color);
                true
            }
            None => false,
        })
    }

    /// Attach a button to a window. Returns `false` if the window is gone.
    #[allow(clippy::too_many_arguments)]
    pub fn add_button(
        &mut self,
        id: WindowId,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        label: &str,
        callback: Callback,
    ) -> Result<bool> {
        self.check_cpu()?;
        check_size("add_button", width, height)?;
        let Some(window) = self.window_mut(id) else {
            return Ok(false);
        };
        window.add_widget(Button::new(x, y, width, height, label).with_callback(callback));
        tracing::debug!(window = %id, label, "button added");
        Ok(true)
    }

    /// Composite one frame, reaping closed windows.
    pub fn draw_all(&mut self) -> Result<()> {
        self.check_cpu()?;
        if let Some(display) = self.display.as_mut() {
            display.draw_all();
        }
        Ok(())
    }

    fn window_mut(&mut self, id: WindowId) -> Option<&mut crate::display::VirtualWindow> {
        self.display
            .as_mut()
            .and_then(|display| display.window_manager_mut().window_mut(id))
    }
}

impl fmt::Debug for MediatedApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediatedApi")
            .field("governor", &self.governor)
            .field("fs", &self.fs)
            .field("display", &self.display)
            .finish_non_exhaustive()
    }
}

fn check_size(operation: &str, width: i32, height: i32) -> Result<()> {
    if width > MAX_WINDOW_SIZE || height > MAX_WINDOW_SIZE {
        return Err(KernelError::InvalidArgument {
            operation: operation.into(),
            reason: format!("size {width}x{height} exceeds {MAX_WINDOW_SIZE}x{MAX_WINDOW_SIZE}"),
        });
    }
    Ok(())
}
