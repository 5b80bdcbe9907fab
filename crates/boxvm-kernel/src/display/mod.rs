//! Virtual display: framebuffer, windows, widgets and the window manager.
//!
//! - **[`framebuffer`]** -- [`FrameBuffer`], the global compositing surface.
//! - **[`window`]** -- [`VirtualWindow`], a movable, closable surface with
//!   its own content buffer.
//! - **[`widget`]** -- the [`Widget`] trait and the [`Button`] widget.
//! - **[`manager`]** -- [`WindowManager`], which owns every window, keeps
//!   z-order and routes pointer input.
//! - **[`server`]** -- [`DisplayServer`], the capability the mediated API
//!   holds: window manager plus guest event queue.
//! - **[`input`]** -- host input sources feeding the display server.
//! - **[`font`]** -- the 5x5 bitmap glyph table used for labels.
//!
//! Coordinates are signed with the origin at the top-left. Window-local
//! coordinates are relative to a window's outer origin; widgets live in
//! them. Content-local coordinates are relative to the top-left pixel of a
//! window's content area; guest pixel writes use them.

pub mod font;
pub mod framebuffer;
pub mod input;
pub mod manager;
pub mod server;
pub mod widget;
pub mod window;

pub use framebuffer::FrameBuffer;
pub use input::{InputAction, InputSource, ScriptedInput};
pub use manager::WindowManager;
pub use server::DisplayServer;
pub use widget::{Button, Callback, Widget};
pub use window::{MAX_WINDOW_SIZE, VirtualWindow, WindowId};

use serde::{Deserialize, Serialize};

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    pub const WHITE: Rgb = Rgb(255, 255, 255);
}

/// Anything pixels can be written to.
///
/// Writes outside the surface are silently dropped.
pub trait Surface {
    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb);

    /// Writable region in this surface's own coordinates.
    fn bounds(&self) -> Bounds;
}

/// Half-open rectangle `[x0, x1) x [y0, y1)`, wide enough that shifting by
/// any `i32` cannot overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl Bounds {
    pub fn new(width: i64, height: i64) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: width.max(0),
            y1: height.max(0),
        }
    }

    fn shifted(self, dx: i32, dy: i32) -> Self {
        let (dx, dy) = (i64::from(dx), i64::from(dy));
        Self {
            x0: self.x0 - dx,
            y0: self.y0 - dy,
            x1: self.x1 - dx,
            y1: self.y1 - dy,
        }
    }

    /// Columns and rows of the `width x height` rectangle at `(x, y)` that
    /// fall inside these bounds.
    pub fn clip(
        self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    ) -> (std::ops::Range<i32>, std::ops::Range<i32>) {
        let span = |start: i32, len: i32, lo: i64, hi: i64| {
            let start = i64::from(start);
            let from = start.max(lo);
            let to = (start + i64::from(len.max(0))).min(hi);
            if from >= to {
                return 0..0;
            }
            saturate(from)..saturate(to)
        };
        (
            span(x, width, self.x0, self.x1),
            span(y, height, self.y0, self.y1),
        )
    }
}

pub(crate) fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// A surface view shifted by a fixed offset.
pub(crate) struct Offset<'a, S: Surface + ?Sized> {
    pub(crate) inner: &'a mut S,
    pub(crate) dx: i32,
    pub(crate) dy: i32,
}

impl<S: Surface + ?Sized> Surface for Offset<'_, S> {
    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        if let (Some(x), Some(y)) = (x.checked_add(self.dx), y.checked_add(self.dy)) {
            self.inner.set_pixel(x, y, color);
        }
    }

    fn bounds(&self) -> Bounds {
        self.inner.bounds().shifted(self.dx, self.dy)
    }
}

/// Input event queued for the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Click { x: i32, y: i32 },
    Key { ch: char },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_keeps_the_overlap() {
        let bounds = Bounds::new(100, 50);
        assert_eq!(bounds.clip(-10, 40, 30, 30), (0..20, 40..50));
        assert_eq!(bounds.clip(200, 0, 10, 10).0, 0..0);
        assert_eq!(bounds.clip(0, 0, -5, 10).0, 0..0);
    }

    #[test]
    fn clip_handles_extreme_rectangles() {
        let bounds = Bounds::new(100, 50);
        assert_eq!(bounds.clip(0, 0, i32::MAX, i32::MAX), (0..100, 0..50));
        assert_eq!(bounds.clip(i32::MAX - 1, 0, i32::MAX, 10).0, 0..0);
        assert_eq!(bounds.clip(i32::MIN, i32::MIN, i32::MAX, i32::MAX).0, 0..0);
    }

    #[test]
    fn offset_drops_overflowing_writes() {
        let mut fb = FrameBuffer::new(4, 4);
        let mut view = Offset {
            inner: &mut fb,
            dx: i32::MAX,
            dy: 0,
        };
        view.set_pixel(1, 0, Rgb::WHITE);
        assert_eq!(view.bounds().x1, 4 - i64::from(i32::MAX));
        assert!(fb.to_rgb_bytes().iter().all(|&b| b == 0));
    }
}
