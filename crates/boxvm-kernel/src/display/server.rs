//! Display server.
//!
//! [`DisplayServer`] is the display capability handed to the mediated API.
//! It owns the [`WindowManager`] (and through it the framebuffer), the queue
//! of events waiting for the guest, and an optional host [`InputSource`].

use std::collections::VecDeque;
use std::fmt;

use super::input::{InputAction, InputSource};
use super::{Event, FrameBuffer, WindowManager};

/// Window manager plus the guest-facing event queue.
pub struct DisplayServer {
    wm: WindowManager,
    events: VecDeque<Event>,
    input: Option<Box<dyn InputSource>>,
}

impl DisplayServer {
    /// Create a display of the given size with no windows.
    pub fn new(width: u32, height: u32) -> Self {
        tracing::debug!(width, height, "display server created");
        Self {
            wm: WindowManager::new(FrameBuffer::new(width, height)),
            events: VecDeque::new(),
            input: None,
        }
    }

    /// Attach the source [`pump`](Self::pump) drains input from.
    pub fn with_input(mut self, input: impl InputSource + 'static) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    pub fn window_manager(&self) -> &WindowManager {
        &self.wm
    }

    pub fn window_manager_mut(&mut self) -> &mut WindowManager {
        &mut self.wm
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        self.wm.framebuffer()
    }

    pub fn framebuffer_mut(&mut self) -> &mut FrameBuffer {
        self.wm.framebuffer_mut()
    }

    /// Pointer press: routed to the window manager and queued for the guest.
    pub fn click(&mut self, x: i32, y: i32) {
        self.wm.handle_click(x, y);
        self.events.push_back(Event::Click { x, y });
    }

    pub fn mouse_move(&mut self, x: i32, y: i32) {
        self.wm.handle_mouse_move(x, y);
    }

    pub fn mouse_release(&mut self) {
        self.wm.handle_mouse_release();
    }

    pub fn key(&mut self, ch: char) {
        self.events.push_back(Event::Key { ch });
    }

    /// Apply one host action.
    pub fn apply(&mut self, action: InputAction) {
        match action {
            InputAction::Click { x, y } => self.click(x, y),
            InputAction::Move { x, y } => self.mouse_move(x, y),
            InputAction::Release => self.mouse_release(),
            InputAction::Key(ch) => self.key(ch),
        }
    }

    /// Apply the next batch from the attached input source, if any.
    pub fn pump(&mut self) {
        let Some(input) = self.input.as_mut() else {
            return;
        };
        let batch = input.poll();
        if !batch.is_empty() {
            tracing::trace!(actions = batch.len(), "pumping host input");
        }
        for action in batch {
            self.apply(action);
        }
    }

    /// Drain every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Composite one frame.
    pub fn draw_all(&mut self) {
        self.wm.draw_all();
    }
}

impl fmt::Debug for DisplayServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayServer")
            .field("wm", &self.wm)
            .field("events", &self.events)
            .field("input", &self.input.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::ScriptedInput;

    #[test]
    fn events_drain_oldest_first() {
        let mut display = DisplayServer::new(64, 48);
        display.click(1, 2);
        display.key('q');
        assert_eq!(display.pending_events(), 2);
        assert_eq!(
            display.drain_events(),
            vec![Event::Click { x: 1, y: 2 }, Event::Key { ch: 'q' }]
        );
        assert!(display.drain_events().is_empty());
    }

    #[test]
    fn move_and_release_queue_nothing() {
        let mut display = DisplayServer::new(64, 48);
        display.mouse_move(3, 3);
        display.mouse_release();
        assert_eq!(display.pending_events(), 0);
    }

    #[test]
    fn click_is_routed_to_windows() {
        let mut display = DisplayServer::new(100, 100);
        let id = display
            .window_manager_mut()
            .create_window(0, 0, 50, 50, "W");
        display.click(45, 5);
        assert!(display.window_manager().window(id).unwrap().should_close());
        display.draw_all();
        assert!(display.window_manager().is_empty());
    }

    #[test]
    fn pump_replays_one_batch() {
        let script = ScriptedInput::parse("click 10 10\nkey x\n---\nkey y").unwrap();
        let mut display = DisplayServer::new(32, 32).with_input(script);

        display.pump();
        assert_eq!(
            display.drain_events(),
            vec![Event::Click { x: 10, y: 10 }, Event::Key { ch: 'x' }]
        );
        display.pump();
        assert_eq!(display.drain_events(), vec![Event::Key { ch: 'y' }]);
        display.pump();
        assert!(display.drain_events().is_empty());
    }

    #[test]
    fn pump_without_source_is_noop() {
        let mut display = DisplayServer::new(8, 8);
        display.pump();
        assert_eq!(display.pending_events(), 0);
    }
}
