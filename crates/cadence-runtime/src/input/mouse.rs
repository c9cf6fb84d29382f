//! Mouse device

use super::device::InputDevice;
use super::types::{InputEvent, MouseButton, MouseButtonState, MouseWheelDelta};
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashSet;

/// Pixels per wheel notch when folding pixel deltas into the wheel value.
const PIXELS_PER_LINE: f32 = 120.0;

/// Producer side of a [`Mouse`].
#[derive(Clone)]
pub struct MouseFeed {
    tx: Sender<InputEvent>,
}

impl MouseFeed {
    pub fn send(&self, event: InputEvent) {
        let _ = self.tx.send(event);
    }

    pub fn moved(&self, x: f32, y: f32) {
        self.send(InputEvent::PointerMoved { x, y });
    }

    pub fn button(&self, button: MouseButton, state: MouseButtonState) {
        self.send(InputEvent::PointerButton { button, state });
    }

    pub fn wheel(&self, delta: MouseWheelDelta) {
        self.send(InputEvent::MouseWheel(delta));
    }
}

#[derive(Debug, Clone, Default)]
struct MouseSnapshot {
    position: Option<(f32, f32)>,
    buttons: HashSet<MouseButton>,
    /// Whole wheel notches, positive away from the user
    wheel_lines: f32,
}

/// Tracks pointer position, held buttons and the accumulated scroll wheel
/// value. Like [`Keyboard`](super::Keyboard), queries read the snapshot taken
/// at the last update.
pub struct Mouse {
    rx: Receiver<InputEvent>,
    feed: MouseFeed,
    live: MouseSnapshot,
    /// Sub-notch remainder of pixel scrolling
    pixel_scroll: f32,
    current: MouseSnapshot,
}

impl Default for Mouse {
    fn default() -> Self {
        Self::new()
    }
}

impl Mouse {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            rx,
            feed: MouseFeed { tx },
            live: MouseSnapshot::default(),
            pixel_scroll: 0.0,
            current: MouseSnapshot::default(),
        }
    }

    pub fn feed(&self) -> MouseFeed {
        self.feed.clone()
    }

    /// Pointer position, or `None` while outside the viewport.
    pub fn position(&self) -> Option<(f32, f32)> {
        self.current.position
    }

    pub fn is_button_pressed(&self, button: MouseButton) -> bool {
        self.current.buttons.contains(&button)
    }

    /// Accumulated vertical wheel value in notches since the device started.
    pub fn scroll_wheel_value(&self) -> f32 {
        self.current.wheel_lines
    }

    fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerMoved { x, y } => self.live.position = Some((x, y)),
            InputEvent::PointerLeft => self.live.position = None,
            InputEvent::PointerButton {
                button,
                state: MouseButtonState::Pressed,
            } => {
                self.live.buttons.insert(button);
            }
            InputEvent::PointerButton {
                button,
                state: MouseButtonState::Released,
            } => {
                self.live.buttons.remove(&button);
            }
            InputEvent::MouseWheel(MouseWheelDelta::Line { y, .. }) => {
                self.live.wheel_lines += y;
            }
            InputEvent::MouseWheel(MouseWheelDelta::Pixel { y, .. }) => {
                self.pixel_scroll += y;
                let lines = (self.pixel_scroll / PIXELS_PER_LINE).trunc();
                self.pixel_scroll -= lines * PIXELS_PER_LINE;
                self.live.wheel_lines += lines;
            }
            InputEvent::Focused(false) => self.live.buttons.clear(),
            _ => {}
        }
    }
}

impl InputDevice for Mouse {
    fn update(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
        }
        self.current = self.live.clone();
    }

    fn release(&mut self) {
        self.live.buttons.clear();
        self.current.buttons.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_and_buttons() {
        let mut mouse = Mouse::new();
        let feed = mouse.feed();

        feed.moved(10.0, 20.0);
        feed.button(MouseButton::Left, MouseButtonState::Pressed);
        assert_eq!(mouse.position(), None);

        mouse.update();
        assert_eq!(mouse.position(), Some((10.0, 20.0)));
        assert!(mouse.is_button_pressed(MouseButton::Left));
        assert!(!mouse.is_button_pressed(MouseButton::Right));

        feed.button(MouseButton::Left, MouseButtonState::Released);
        feed.send(InputEvent::PointerLeft);
        mouse.update();
        assert!(!mouse.is_button_pressed(MouseButton::Left));
        assert_eq!(mouse.position(), None);
    }

    #[test]
    fn test_wheel_accumulates() {
        let mut mouse = Mouse::new();
        let feed = mouse.feed();

        feed.wheel(MouseWheelDelta::Line { x: 0.0, y: 1.0 });
        feed.wheel(MouseWheelDelta::Line { x: 0.0, y: 2.0 });
        mouse.update();
        assert_eq!(mouse.scroll_wheel_value(), 3.0);

        feed.wheel(MouseWheelDelta::Line { x: 0.0, y: -1.0 });
        mouse.update();
        assert_eq!(mouse.scroll_wheel_value(), 2.0);
    }

    #[test]
    fn test_pixel_scroll_folds_into_notches() {
        let mut mouse = Mouse::new();
        let feed = mouse.feed();

        feed.wheel(MouseWheelDelta::Pixel { x: 0.0, y: 60.0 });
        mouse.update();
        assert_eq!(mouse.scroll_wheel_value(), 0.0);

        feed.wheel(MouseWheelDelta::Pixel { x: 0.0, y: 60.0 });
        mouse.update();
        assert_eq!(mouse.scroll_wheel_value(), 1.0);
    }
}
