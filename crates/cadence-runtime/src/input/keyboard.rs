//! Keyboard device

use super::device::InputDevice;
use super::types::{InputEvent, Key, KeyState, Modifiers};
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashSet;

/// Producer side of a [`Keyboard`]. The toolkit adapter owns one and pushes
/// platform events into it from its own thread.
#[derive(Clone)]
pub struct KeyboardFeed {
    tx: Sender<InputEvent>,
}

impl KeyboardFeed {
    /// Push an event. Events sent after the keyboard is dropped are discarded.
    pub fn send(&self, event: InputEvent) {
        let _ = self.tx.send(event);
    }

    pub fn key_down(&self, key: Key, modifiers: Modifiers) {
        self.send(InputEvent::Key {
            key,
            state: KeyState::Pressed,
            modifiers,
        });
    }

    pub fn key_up(&self, key: Key, modifiers: Modifiers) {
        self.send(InputEvent::Key {
            key,
            state: KeyState::Released,
            modifiers,
        });
    }
}

/// Tracks held keys. State only changes inside [`InputDevice::update`], so
/// every query within one tick sees the same snapshot.
pub struct Keyboard {
    rx: Receiver<InputEvent>,
    feed: KeyboardFeed,
    /// Keys held according to the events drained so far
    live: HashSet<Key>,
    live_modifiers: Modifiers,
    /// Keys held as of the last update
    keys_down: HashSet<Key>,
    /// Keys that went down since the previous update
    keys_just_pressed: HashSet<Key>,
    modifiers: Modifiers,
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Keyboard {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            rx,
            feed: KeyboardFeed { tx },
            live: HashSet::new(),
            live_modifiers: Modifiers::NONE,
            keys_down: HashSet::new(),
            keys_just_pressed: HashSet::new(),
            modifiers: Modifiers::NONE,
        }
    }

    /// A new producer handle for this keyboard.
    pub fn feed(&self) -> KeyboardFeed {
        self.feed.clone()
    }

    /// Is a key currently held down?
    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    /// Did the key go down since the previous update?
    pub fn is_key_just_pressed(&self, key: Key) -> bool {
        self.keys_just_pressed.contains(&key)
    }

    pub fn pressed_keys(&self) -> Vec<Key> {
        self.keys_down.iter().copied().collect()
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key {
                key,
                state: KeyState::Pressed,
                modifiers,
            } => {
                self.live.insert(key);
                self.live_modifiers = modifiers;
            }
            InputEvent::Key {
                key,
                state: KeyState::Released,
                modifiers,
            } => {
                self.live.remove(&key);
                self.live_modifiers = modifiers;
            }
            InputEvent::ModifiersChanged(modifiers) => self.live_modifiers = modifiers,
            // Release events are lost while unfocused
            InputEvent::Focused(false) => {
                self.live.clear();
                self.live_modifiers = Modifiers::NONE;
            }
            _ => {}
        }
    }
}

impl InputDevice for Keyboard {
    fn update(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.apply(event);
        }

        self.keys_just_pressed = self.live.difference(&self.keys_down).copied().collect();
        self.keys_down = self.live.clone();
        self.modifiers = self.live_modifiers;
    }

    fn release(&mut self) {
        self.live.clear();
        self.keys_down.clear();
        self.keys_just_pressed.clear();
    }
}
