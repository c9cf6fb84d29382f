//! Input devices and key bindings.
//!
//! Devices are pull-style: a toolkit adapter pushes platform events into a
//! device feed, and the loop worker calls `update()` once per tick so that
//! gameplay code reads a stable snapshot.

mod bindings;
mod device;
mod keyboard;
mod mouse;
mod types;

pub use bindings::{KeyAction, KeyBindings, KeyStroke};
pub use device::{InputDevice, InputDevices};
pub use keyboard::{Keyboard, KeyboardFeed};
pub use mouse::{Mouse, MouseFeed};
pub use types::{
    InputEvent, Key, KeyState, Modifiers, MouseButton, MouseButtonState, MouseWheelDelta,
};
