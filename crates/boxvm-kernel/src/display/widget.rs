//! Window widgets.
//!
//! Widgets live inside a window and use that window's local coordinates,
//! relative to its outer top-left corner, for drawing, clicks and hover.

use std::fmt;

use super::font;
use super::{Rgb, Surface};

const BUTTON_BORDER: Rgb = Rgb(100, 100, 100);
const BUTTON_FILL: Rgb = Rgb(50, 50, 100);
const BUTTON_FILL_HOVER: Rgb = Rgb(80, 80, 180);

/// Opaque no-argument action attached to a widget.
///
/// The kernel never inspects what a callback does. Guest loaders typically
/// wrap an integer handle so nothing guest-owned outlives the run.
pub struct Callback(Box<dyn FnMut() + Send>);

impl Callback {
    pub fn new(f: impl FnMut() + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn invoke(&mut self) {
        (self.0)()
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback(..)")
    }
}

/// Behavior shared by every widget a window can own.
pub trait Widget: Send + fmt::Debug {
    /// Render onto `surface`, which is already offset to the window origin.
    fn draw(&self, surface: &mut dyn Surface);

    /// Offer a click. Returns `true` when the widget claims it.
    fn handle_click(&mut self, x: i32, y: i32) -> bool;

    /// Update hover state from the pointer position.
    fn handle_hover(&mut self, x: i32, y: i32);

    fn is_hovered(&self) -> bool {
        false
    }
}

/// Rectangular push button with a text label.
#[derive(Debug)]
pub struct Button {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub label: String,
    callback: Option<Callback>,
    hover: bool,
}

impl Button {
    pub fn new(x: i32, y: i32, width: i32, height: i32, label: impl Into<String>) -> Self {
        Self {
            x,
            y,
            width,
            height,
            label: label.into(),
            callback: None,
            hover: false,
        }
    }

    /// Attach the action run when the button is clicked.
    pub fn with_callback(mut self, callback: Callback) -> Self {
        self.callback = Some(callback);
        self
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (i64::from(x), i64::from(y));
        let (bx, by) = (i64::from(self.x), i64::from(self.y));
        bx <= x && x < bx + i64::from(self.width) && by <= y && y < by + i64::from(self.height)
    }
}

impl Widget for Button {
    fn draw(&self, surface: &mut dyn Surface) {
        let fill = if self.hover {
            BUTTON_FILL_HOVER
        } else {
            BUTTON_FILL
        };
        let (cols, rows) = surface
            .bounds()
            .clip(self.x, self.y, self.width, self.height);
        let (left, top) = (i64::from(self.x), i64::from(self.y));
        let right = left + i64::from(self.width) - 1;
        let bottom = top + i64::from(self.height) - 1;
        for px in cols {
            for py in rows.clone() {
                let (i, j) = (i64::from(px), i64::from(py));
                let edge = i == left || j == top || i == right || j == bottom;
                let color = if edge { BUTTON_BORDER } else { fill };
                surface.set_pixel(px, py, color);
            }
        }
        font::draw_text(
            surface,
            self.x.saturating_add(3),
            self.y.saturating_add(self.height / 2 - 3),
            &self.label,
            Rgb::WHITE,
        );
    }

    fn handle_click(&mut self, x: i32, y: i32) -> bool {
        if !self.contains(x, y) {
            return false;
        }
        tracing::debug!(label = %self.label, "button clicked");
        if let Some(callback) = self.callback.as_mut() {
            callback.invoke();
        }
        true
    }

    fn handle_hover(&mut self, x: i32, y: i32) {
        self.hover = self.contains(x, y);
    }

    fn is_hovered(&self) -> bool {
        self.hover
    }
}
