//! Window manager.
//!
//! The manager is the sole owner of every [`VirtualWindow`]: an id-keyed
//! arena plus a z-order list (last entry is topmost). Windows never hold a
//! reference back to the manager. Closing is deferred: a close click only
//! flags the window, and the next [`draw_all`](WindowManager::draw_all)
//! reaps it.

use std::collections::HashMap;

use super::window::{VirtualWindow, WindowId};
use super::{FrameBuffer, Rgb};

/// Owns the framebuffer and all windows, composites and routes input.
#[derive(Debug)]
pub struct WindowManager {
    framebuffer: FrameBuffer,
    windows: HashMap<WindowId, VirtualWindow>,
    z_order: Vec<WindowId>,
    next_id: u32,
    focused: Option<WindowId>,
}

impl WindowManager {
    pub fn new(framebuffer: FrameBuffer) -> Self {
        Self {
            framebuffer,
            windows: HashMap::new(),
            z_order: Vec::new(),
            next_id: 1,
            focused: None,
        }
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    pub fn framebuffer_mut(&mut self) -> &mut FrameBuffer {
        &mut self.framebuffer
    }

    /// Create a window on top of the stack and focus it.
    pub fn create_window(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        title: impl Into<String>,
    ) -> WindowId {
        let id = WindowId(self.next_id);
        self.next_id += 1;

        let window = VirtualWindow::new(id, x, y, width, height, title);
        tracing::debug!(window = %id, x, y, width, height, title = %window.title, "window created");

        self.windows.insert(id, window);
        self.z_order.push(id);
        self.focused = Some(id);
        id
    }

    pub fn window(&self, id: WindowId) -> Option<&VirtualWindow> {
        self.windows.get(&id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut VirtualWindow> {
        self.windows.get_mut(&id)
    }

    /// Window ids bottom to top.
    pub fn window_ids(&self) -> &[WindowId] {
        &self.z_order
    }

    pub fn focused(&self) -> Option<WindowId> {
        self.focused
    }

    pub fn len(&self) -> usize {
        self.z_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z_order.is_empty()
    }

    /// One compositing frame: reap closed windows, clear, blit bottom to top.
    pub fn draw_all(&mut self) {
        self.reap_closed();
        self.framebuffer.clear(Rgb::BLACK);
        for id in &self.z_order {
            if let Some(window) = self.windows.get(id) {
                window.blit(&mut self.framebuffer, self.focused == Some(*id));
            }
        }
    }

    fn reap_closed(&mut self) {
        let windows = &mut self.windows;
        let focused = &mut self.focused;
        self.z_order.retain(|id| {
            let close = windows.get(id).is_some_and(VirtualWindow::should_close);
            if close {
                windows.remove(id);
                if *focused == Some(*id) {
                    *focused = None;
                }
                tracing::debug!(window = %id, "window reaped");
            }
            !close
        });
    }

    /// Route a click to the topmost visible window under the pointer.
    ///
    /// Returns the window that took the click, or `None` when the click
    /// missed every window or hit a close button.
    pub fn handle_click(&mut self, x: i32, y: i32) -> Option<WindowId> {
        let id = self
            .z_order
            .iter()
            .rev()
            .copied()
            .find(|id| self.windows.get(id).is_some_and(|w| w.visible && w.contains(x, y)))?;
        let window = self.windows.get_mut(&id)?;

        let rel_x = x - window.x;
        let rel_y = y - window.y;

        if window.close_button_hit(rel_x, rel_y) {
            window.close();
            tracing::debug!(window = %id, "close requested");
            return None;
        }

        let claimed = window
            .widgets_mut()
            .iter_mut()
            .any(|widget| widget.handle_click(rel_x, rel_y));
        if claimed {
            self.bring_to_front(id);
            return Some(id);
        }

        window.dragging = true;
        window.drag_offset = (rel_x, rel_y);
        self.focused = Some(id);
        self.bring_to_front(id);
        Some(id)
    }

    /// Move dragged windows and update hover on the focused window.
    pub fn handle_mouse_move(&mut self, x: i32, y: i32) {
        for window in self.windows.values_mut() {
            if window.dragging {
                let (dx, dy) = window.drag_offset;
                window.x = x.saturating_sub(dx);
                window.y = y.saturating_sub(dy);
            }
        }

        let Some(window) = self.focused.and_then(|id| self.windows.get_mut(&id)) else {
            return;
        };
        if !window.visible {
            return;
        }
        let rel_x = x.saturating_sub(window.x);
        let rel_y = y.saturating_sub(window.y);
        for widget in window.widgets_mut() {
            widget.handle_hover(rel_x, rel_y);
        }
    }

    /// End every drag.
    pub fn handle_mouse_release(&mut self) {
        for window in self.windows.values_mut() {
            window.dragging = false;
        }
    }

    /// Make `id` the topmost (last drawn) window.
    pub fn bring_to_front(&mut self, id: WindowId) {
        if let Some(pos) = self.z_order.iter().position(|w| *w == id) {
            let id = self.z_order.remove(pos);
            self.z_order.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::display::{Button, Callback};

    fn manager() -> WindowManager {
        WindowManager::new(FrameBuffer::new(200, 150))
    }

    #[test]
    fn ids_are_monotonic_and_newest_is_focused() {
        let mut wm = manager();
        let a = wm.create_window(0, 0, 50, 50, "A");
        let b = wm.create_window(10, 10, 50, 50, "B");
        assert_eq!(a, WindowId(1));
        assert_eq!(b, WindowId(2));
        assert_eq!(wm.focused(), Some(b));
        assert_eq!(wm.window_ids(), &[a, b]);
    }

    #[test]
    fn ids_are_not_reused_after_reap() {
        let mut wm = manager();
        let a = wm.create_window(0, 0, 50, 50, "A");
        wm.window_mut(a).unwrap().close();
        wm.draw_all();
        let b = wm.create_window(0, 0, 50, 50, "B");
        assert_eq!(b, WindowId(2));
    }

    #[test]
    fn close_is_deferred_until_draw_all() {
        let mut wm = manager();
        let a = wm.create_window(0, 0, 50, 50, "A");
        wm.window_mut(a).unwrap().close();
        assert!(wm.window(a).is_some());
        assert_eq!(wm.focused(), Some(a));

        wm.draw_all();
        assert!(wm.window(a).is_none());
        assert_eq!(wm.focused(), None);
        assert!(wm.is_empty());
    }

    #[test]
    fn reaping_unfocused_window_keeps_focus() {
        let mut wm = manager();
        let a = wm.create_window(0, 0, 50, 50, "A");
        let b = wm.create_window(60, 0, 50, 50, "B");
        wm.window_mut(a).unwrap().close();
        wm.draw_all();
        assert_eq!(wm.focused(), Some(b));
        assert_eq!(wm.window_ids(), &[b]);
    }

    #[test]
    fn click_in_overlap_goes_to_topmost() {
        let mut wm = manager();
        let a = wm.create_window(0, 0, 60, 60, "A");
        let b = wm.create_window(30, 30, 60, 60, "B");
        assert_eq!(wm.handle_click(45, 45), Some(b));
        assert_eq!(wm.focused(), Some(b));
        assert_eq!(wm.handle_click(5, 5), Some(a));
        assert_eq!(wm.focused(), Some(a));
        assert_eq!(wm.window_ids(), &[b, a]);
    }

    #[test]
    fn close_hit_flags_only_the_top_window() {
        let mut wm = manager();
        let a = wm.create_window(0, 0, 100, 100, "A");
        let b = wm.create_window(0, 0, 60, 60, "B");
        // B's close zone starts at (60 - 8, 3).
        assert_eq!(wm.handle_click(53, 4), None);
        assert!(wm.window(b).unwrap().should_close());
        assert!(!wm.window(a).unwrap().should_close());
        assert!(!wm.window(b).unwrap().is_dragging());

        wm.draw_all();
        assert!(wm.window(b).is_none());
        assert!(wm.window(a).is_some());
        assert_eq!(wm.focused(), None);
    }

    #[test]
    fn close_hit_does_not_change_focus_or_order() {
        let mut wm = manager();
        let a = wm.create_window(0, 0, 60, 60, "A");
        let b = wm.create_window(100, 0, 60, 60, "B");
        assert_eq!(wm.handle_click(53, 4), None);
        assert_eq!(wm.focused(), Some(b));
        assert_eq!(wm.window_ids(), &[a, b]);
    }

    #[test]
    fn miss_returns_none() {
        let mut wm = manager();
        wm.create_window(0, 0, 20, 20, "A");
        assert_eq!(wm.handle_click(150, 140), None);
    }

    #[test]
    fn invisible_windows_are_skipped() {
        let mut wm = manager();
        let a = wm.create_window(0, 0, 60, 60, "A");
        let b = wm.create_window(0, 0, 60, 60, "B");
        wm.window_mut(b).unwrap().visible = false;
        assert_eq!(wm.handle_click(20, 30), Some(a));
    }

    #[test]
    fn widget_click_raises_without_focus_or_drag() {
        let hits = Arc::new(AtomicU32::new(0));
        let h = Arc::clone(&hits);

        let mut wm = manager();
        let a = wm.create_window(0, 0, 80, 60, "A");
        wm.window_mut(a).unwrap().add_widget(
            Button::new(5, 5, 20, 10, "Go").with_callback(Callback::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            })),
        );
        let b = wm.create_window(100, 0, 50, 50, "B");

        // Widgets are hit-tested in window-local coordinates.
        assert_eq!(wm.handle_click(6, 6), Some(a));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(wm.window_ids(), &[b, a]);
        assert_eq!(wm.focused(), Some(b));
        assert!(!wm.window(a).unwrap().is_dragging());
    }

    #[test]
    fn first_claiming_widget_wins() {
        let hits = Arc::new(AtomicU32::new(0));
        let (h1, h2) = (Arc::clone(&hits), Arc::clone(&hits));

        let mut wm = manager();
        let a = wm.create_window(0, 0, 80, 60, "A");
        let win = wm.window_mut(a).unwrap();
        win.add_widget(Button::new(0, 0, 20, 10, "A").with_callback(Callback::new(move || {
            h1.fetch_add(1, Ordering::SeqCst);
        })));
        win.add_widget(Button::new(0, 0, 20, 10, "B").with_callback(Callback::new(move || {
            h2.fetch_add(10, Ordering::SeqCst);
        })));

        wm.handle_click(2, 3);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drag_moves_window_until_release() {
        let mut wm = manager();
        let a = wm.create_window(10, 10, 50, 50, "A");
        assert_eq!(wm.handle_click(15, 12), Some(a));
        assert!(wm.window(a).unwrap().is_dragging());

        wm.handle_mouse_move(40, 30);
        let win = wm.window(a).unwrap();
        assert_eq!((win.x, win.y), (35, 28));

        wm.handle_mouse_release();
        wm.handle_mouse_move(90, 90);
        let win = wm.window(a).unwrap();
        assert_eq!((win.x, win.y), (35, 28));
        assert!(!win.is_dragging());
    }

    #[test]
    fn hover_only_updates_focused_window() {
        let mut wm = manager();
        let a = wm.create_window(0, 0, 60, 60, "A");
        wm.window_mut(a).unwrap().add_widget(Button::new(0, 0, 20, 10, ""));
        let b = wm.create_window(100, 0, 60, 60, "B");
        wm.window_mut(b).unwrap().add_widget(Button::new(0, 0, 20, 10, ""));

        // B is focused; pointing at A's button must not hover it.
        wm.handle_mouse_move(3, 4);
        assert!(!hovered(&wm, a));

        wm.handle_mouse_move(103, 4);
        assert!(hovered(&wm, b));
    }

    fn hovered(wm: &WindowManager, id: WindowId) -> bool {
        wm.window(id).unwrap().widgets()[0].is_hovered()
    }

    #[test]
    fn bring_to_front_reorders() {
        let mut wm = manager();
        let a = wm.create_window(0, 0, 10, 10, "A");
        let b = wm.create_window(0, 0, 10, 10, "B");
        let c = wm.create_window(0, 0, 10, 10, "C");
        wm.bring_to_front(a);
        assert_eq!(wm.window_ids(), &[b, c, a]);
        wm.bring_to_front(WindowId(99));
        assert_eq!(wm.window_ids(), &[b, c, a]);
    }

    #[test]
    fn topmost_window_is_drawn_last() {
        let mut wm = manager();
        let a = wm.create_window(0, 0, 60, 60, "");
        let b = wm.create_window(0, 0, 60, 60, "");
        wm.window_mut(a).unwrap().clear(Rgb(1, 1, 1));
        wm.window_mut(b).unwrap().clear(Rgb(2, 2, 2));

        wm.draw_all();
        assert_eq!(wm.framebuffer().get_pixel(20, 30), Some(Rgb(2, 2, 2)));

        wm.bring_to_front(a);
        wm.draw_all();
        assert_eq!(wm.framebuffer().get_pixel(20, 30), Some(Rgb(1, 1, 1)));
    }

    #[test]
    fn draw_all_clears_previous_frame() {
        let mut wm = manager();
        wm.framebuffer_mut().set_pixel(199, 149, Rgb::WHITE);
        wm.draw_all();
        assert_eq!(wm.framebuffer().get_pixel(199, 149), Some(Rgb::BLACK));
    }

    #[test]
    fn windows_near_the_coordinate_limits_composite_safely() {
        let mut wm = manager();
        let edge = wm.create_window(i32::MAX - 10, 0, 50, 40, "edge");
        let far = wm.create_window(i32::MIN, i32::MIN, 50, 40, "far");
        wm.window_mut(edge)
            .unwrap()
            .add_widget(Button::new(i32::MAX, i32::MAX, i32::MAX, i32::MAX, "X"));
        wm.draw_all();
        assert!(wm.framebuffer().to_rgb_bytes().iter().all(|&b| b == 0));

        assert_eq!(wm.handle_click(i32::MAX, 20), Some(edge));
        wm.handle_mouse_move(i32::MIN, i32::MIN);
        assert_eq!(wm.window(edge).unwrap().x, i32::MIN);
        wm.handle_mouse_release();
        // Dragged on top of `far`, so it takes the click there.
        assert_eq!(wm.handle_click(i32::MIN + 20, i32::MIN + 20), Some(edge));
        assert_eq!(wm.window_ids(), &[far, edge]);
    }

    #[test]
    fn huge_window_and_button_draw_in_one_frame() {
        let mut wm = manager();
        let a = wm.create_window(0, 0, 70_000, 70_000, "big");
        wm.window_mut(a)
            .unwrap()
            .add_widget(Button::new(0, 0, i32::MAX, i32::MAX, ""));
        wm.draw_all();
        assert_eq!(wm.window(a).unwrap().width(), crate::display::MAX_WINDOW_SIZE);
        assert_eq!(wm.framebuffer().get_pixel(199, 149), Some(Rgb(50, 50, 100)));
    }
}
