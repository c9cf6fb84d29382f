//! Key binding table: key stroke → action.

use super::types::{Key, Modifiers};
use cadence_core::Result;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A bound action. Runs on whichever thread the toolkit adapter dispatches from.
pub type KeyAction = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// A key plus modifiers, fired either on press or on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyStroke {
    pub key: Key,
    pub modifiers: Modifiers,
    pub on_release: bool,
}

impl KeyStroke {
    pub fn pressed(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
            on_release: false,
        }
    }

    pub fn released(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
            on_release: true,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Per-scene key bindings. Loaded into the render sink on scene activation.
#[derive(Clone, Default)]
pub struct KeyBindings {
    map: HashMap<KeyStroke, KeyAction>,
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `action` to `stroke`, replacing an existing binding. `None`
    /// removes the binding instead.
    pub fn put(&mut self, stroke: KeyStroke, action: Option<KeyAction>) {
        match action {
            Some(action) => {
                self.map.insert(stroke, action);
            }
            None => {
                self.map.remove(&stroke);
            }
        }
    }

    pub fn get(&self, stroke: &KeyStroke) -> Option<&KeyAction> {
        self.map.get(stroke)
    }

    pub fn contains(&self, stroke: &KeyStroke) -> bool {
        self.map.contains_key(stroke)
    }

    /// Run the action bound to the stroke, if any. Returns whether one ran.
    pub fn dispatch(&self, key: Key, modifiers: Modifiers, released: bool) -> Result<bool> {
        let stroke = KeyStroke {
            key,
            modifiers,
            on_release: released,
        };
        match self.map.get(&stroke) {
            Some(action) => {
                action()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn strokes(&self) -> impl Iterator<Item = &KeyStroke> {
        self.map.keys()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for KeyBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.map.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter_action(counter: &Arc<AtomicU32>) -> KeyAction {
        let counter = counter.clone();
        Arc::new(move || -> Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_dispatch_matches_full_stroke() {
        let hits = Arc::new(AtomicU32::new(0));
        let mut bindings = KeyBindings::new();
        bindings.put(KeyStroke::pressed(Key::P), Some(counter_action(&hits)));

        assert!(bindings.dispatch(Key::P, Modifiers::NONE, false).unwrap());
        // Release and modified strokes are distinct bindings
        assert!(!bindings.dispatch(Key::P, Modifiers::NONE, true).unwrap());
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        assert!(!bindings.dispatch(Key::P, ctrl, false).unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        bindings.put(
            KeyStroke::pressed(Key::P).with_modifiers(ctrl),
            Some(counter_action(&hits)),
        );
        assert!(ctrl.any());
        assert!(!Modifiers::NONE.any());
        assert!(bindings.dispatch(Key::P, ctrl, false).unwrap());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_none_removes_binding() {
        let hits = Arc::new(AtomicU32::new(0));
        let mut bindings = KeyBindings::new();
        let stroke = KeyStroke::released(Key::Escape);

        bindings.put(stroke, Some(counter_action(&hits)));
        assert!(bindings.contains(&stroke));

        bindings.put(stroke, None);
        assert!(bindings.is_empty());
        assert!(!bindings.dispatch(Key::Escape, Modifiers::NONE, true).unwrap());
    }

    #[test]
    fn test_action_error_propagates() {
        let mut bindings = KeyBindings::new();
        bindings.put(
            KeyStroke::pressed(Key::F1),
            Some(Arc::new(|| -> Result<()> {
                Err(cadence_core::CadenceError::Runtime("boom".into()))
            })),
        );
        assert!(bindings.dispatch(Key::F1, Modifiers::NONE, false).is_err());
    }
}
