//! Virtual windows.
//!
//! A window is drawn as a 1 px border ring, a title band of height
//! [`TITLE_HEIGHT`] and a content area beneath the band. The content area
//! has its own pixel buffer; guests draw into it in content-local
//! coordinates. Widgets use window-local coordinates, relative to the outer
//! origin. A close hot-zone sits near the top-right corner.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::font;
use super::widget::Widget;
use super::{Bounds, FrameBuffer, Offset, Rgb, Surface};

/// Height of the title band, including the top border row.
pub const TITLE_HEIGHT: i32 = 12;
/// Close hot-zone origin relative to the window's right edge / top edge.
pub const CLOSE_OFFSET: (i32, i32) = (-8, 3);
/// Close hot-zone size.
pub const CLOSE_SIZE: (i32, i32) = (6, 6);
/// Largest width or height a window can have.
pub const MAX_WINDOW_SIZE: i32 = 2048;

const BORDER: Rgb = Rgb(200, 200, 200);
const TITLE_FOCUSED: Rgb = Rgb(50, 50, 100);
const TITLE_UNFOCUSED: Rgb = Rgb(30, 30, 30);
const CLOSE_FILL: Rgb = Rgb(200, 60, 60);

/// Unique, monotonically assigned window identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "win-{}", self.0)
    }
}

/// A movable, closable surface owned by the window manager.
#[derive(Debug)]
pub struct VirtualWindow {
    id: WindowId,
    pub x: i32,
    pub y: i32,
    width: i32,
    height: i32,
    pub title: String,
    pub visible: bool,
    content: Vec<Rgb>,
    pub(crate) dragging: bool,
    pub(crate) drag_offset: (i32, i32),
    widgets: Vec<Box<dyn Widget>>,
    should_close: bool,
}

impl VirtualWindow {
    /// Sizes are clamped to `0..=MAX_WINDOW_SIZE`.
    pub fn new(id: WindowId, x: i32, y: i32, width: i32, height: i32, title: impl Into<String>) -> Self {
        let width = width.clamp(0, MAX_WINDOW_SIZE);
        let height = height.clamp(0, MAX_WINDOW_SIZE);
        let (cw, ch) = content_size(width, height);
        Self {
            id,
            x,
            y,
            width,
            height,
            title: title.into(),
            visible: true,
            content: vec![Rgb::BLACK; cw as usize * ch as usize],
            dragging: false,
            drag_offset: (0, 0),
            widgets: Vec::new(),
            should_close: false,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Size of the content area: the window minus border and title band.
    pub fn content_size(&self) -> (i32, i32) {
        content_size(self.width, self.height)
    }

    /// Window-local position of the content area's top-left pixel.
    pub fn content_origin(&self) -> (i32, i32) {
        (1, TITLE_HEIGHT)
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn should_close(&self) -> bool {
        self.should_close
    }

    /// Mark for removal at the next compositing pass.
    pub fn close(&mut self) {
        self.should_close = true;
    }

    fn content_index(&self, x: i32, y: i32) -> Option<usize> {
        let (cw, ch) = self.content_size();
        if x < 0 || y < 0 || x >= cw || y >= ch {
            return None;
        }
        Some(y as usize * cw as usize + x as usize)
    }

    /// Write a content-local pixel. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        if let Some(i) = self.content_index(x, y) {
            self.content[i] = color;
        }
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Rgb> {
        self.content_index(x, y).map(|i| self.content[i])
    }

    /// Fill the whole content area.
    pub fn clear(&mut self, color: Rgb) {
        self.content.fill(color);
    }

    pub fn add_widget(&mut self, widget: impl Widget + 'static) {
        self.widgets.push(Box::new(widget));
    }

    pub fn widgets(&self) -> &[Box<dyn Widget>] {
        &self.widgets
    }

    pub(crate) fn widgets_mut(&mut self) -> &mut [Box<dyn Widget>] {
        &mut self.widgets
    }

    /// Whether a global point falls inside the outer window rectangle.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (i64::from(x), i64::from(y));
        let (wx, wy) = (i64::from(self.x), i64::from(self.y));
        wx <= x && x < wx + i64::from(self.width) && wy <= y && y < wy + i64::from(self.height)
    }

    /// Whether a window-local point hits the close button.
    pub fn close_button_hit(&self, rel_x: i32, rel_y: i32) -> bool {
        let (cx, cy) = self.close_origin();
        cx <= rel_x && rel_x < cx + CLOSE_SIZE.0 && cy <= rel_y && rel_y < cy + CLOSE_SIZE.1
    }

    /// Window-local top-left of the close hot-zone.
    fn close_origin(&self) -> (i32, i32) {
        (self.width + CLOSE_OFFSET.0, CLOSE_OFFSET.1)
    }

    /// Composite this window onto `fb`. Invisible windows draw nothing.
    pub fn blit(&self, fb: &mut FrameBuffer, focused: bool) {
        if !self.visible {
            return;
        }

        let title_bg = if focused {
            TITLE_FOCUSED
        } else {
            TITLE_UNFOCUSED
        };
        let (ox, oy) = self.content_origin();

        // Window-local view; only the part overlapping the framebuffer is walked.
        let mut canvas = Offset {
            inner: fb,
            dx: self.x,
            dy: self.y,
        };
        let (cols, rows) = canvas.bounds().clip(0, 0, self.width, self.height);
        for lx in cols {
            for ly in rows.clone() {
                let color = if lx == 0 || ly == 0 || lx == self.width - 1 || ly == self.height - 1 {
                    BORDER
                } else if ly < TITLE_HEIGHT {
                    title_bg
                } else {
                    self.get_pixel(lx - ox, ly - oy).unwrap_or(Rgb::BLACK)
                };
                canvas.set_pixel(lx, ly, color);
            }
        }

        font::draw_text(&mut canvas, 4, 4, &self.title, Rgb::WHITE);

        let (cx, cy) = self.close_origin();
        for dx in 0..CLOSE_SIZE.0 {
            for dy in 0..CLOSE_SIZE.1 {
                canvas.set_pixel(cx + dx, cy + dy, CLOSE_FILL);
            }
        }
        for d in 0..CLOSE_SIZE.0 {
            canvas.set_pixel(cx + d, cy + d, Rgb::WHITE);
            canvas.set_pixel(cx + d, cy + CLOSE_SIZE.1 - 1 - d, Rgb::WHITE);
        }

        for widget in &self.widgets {
            widget.draw(&mut canvas);
        }
    }
}

impl Surface for VirtualWindow {
    fn set_pixel(&mut self, x: i32, y: i32, color: Rgb) {
        VirtualWindow::set_pixel(self, x, y, color);
    }

    fn bounds(&self) -> Bounds {
        let (cw, ch) = self.content_size();
        Bounds::new(i64::from(cw), i64::from(ch))
    }
}

fn content_size(width: i32, height: i32) -> (i32, i32) {
    ((width - 2).max(0), (height - TITLE_HEIGHT - 1).max(0))
}
