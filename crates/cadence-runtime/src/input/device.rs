//! Pull-style input device registry.

use cadence_core::{CadenceError, Result};
use parking_lot::Mutex;
use std::any::{type_name, Any, TypeId};
use std::sync::Arc;

/// An input device polled by the loop worker.
///
/// `initialize` runs once when the worker starts, `update` once per tick
/// before any gameplay event, and `release` once when the worker shuts down.
pub trait InputDevice: Send + 'static {
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn update(&mut self);

    fn release(&mut self) {}
}

#[derive(Clone)]
struct DeviceEntry {
    type_id: TypeId,
    name: &'static str,
    device: Arc<Mutex<dyn InputDevice>>,
    typed: Arc<dyn Any + Send + Sync>,
}

/// Registered input devices, one per concrete type.
///
/// Clones share the same devices, so the loop worker and the owning
/// `GameLoop` see identical state.
#[derive(Clone, Default)]
pub struct InputDevices {
    entries: Vec<DeviceEntry>,
}

impl InputDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device, replacing any previous device of the same type.
    /// Returns the shared handle to it.
    pub fn insert<T: InputDevice>(&mut self, device: T) -> Arc<Mutex<T>> {
        let shared = Arc::new(Mutex::new(device));
        let entry = DeviceEntry {
            type_id: TypeId::of::<T>(),
            name: type_name::<T>(),
            device: shared.clone(),
            typed: shared.clone(),
        };

        match self.entries.iter_mut().find(|e| e.type_id == entry.type_id) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        shared
    }

    /// Fetch the device of type `T`.
    pub fn get<T: InputDevice>(&self) -> Result<Arc<Mutex<T>>> {
        self.entries
            .iter()
            .find(|e| e.type_id == TypeId::of::<T>())
            .and_then(|e| e.typed.clone().downcast::<Mutex<T>>().ok())
            .ok_or_else(|| CadenceError::InputDeviceNotFound(type_name::<T>().to_string()))
    }

    pub fn contains<T: InputDevice>(&self) -> bool {
        self.entries.iter().any(|e| e.type_id == TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn initialize_all(&self) -> Result<()> {
        for entry in &self.entries {
            log::debug!("initializing input device {}", entry.name);
            entry.device.lock().initialize()?;
        }
        Ok(())
    }

    pub(crate) fn update_all(&self) {
        for entry in &self.entries {
            entry.device.lock().update();
        }
    }

    pub(crate) fn release_all(&self) {
        for entry in &self.entries {
            log::debug!("releasing input device {}", entry.name);
            entry.device.lock().release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Gamepad {
        initialized: bool,
        updates: u32,
        released: bool,
    }

    impl InputDevice for Gamepad {
        fn initialize(&mut self) -> Result<()> {
            self.initialized = true;
            Ok(())
        }

        fn update(&mut self) {
            self.updates += 1;
        }

        fn release(&mut self) {
            self.released = true;
        }
    }

    struct Joystick;

    impl InputDevice for Joystick {
        fn update(&mut self) {}
    }

    #[test]
    fn test_lookup_by_type() {
        let mut devices = InputDevices::new();
        devices.insert(Gamepad::default());

        assert!(devices.get::<Gamepad>().is_ok());
        let err = devices.get::<Joystick>().err().unwrap();
        assert!(matches!(err, CadenceError::InputDeviceNotFound(_)));
    }

    #[test]
    fn test_lifecycle_calls() {
        let mut devices = InputDevices::new();
        let pad = devices.insert(Gamepad::default());

        devices.initialize_all().unwrap();
        devices.update_all();
        devices.update_all();
        devices.release_all();

        let pad = pad.lock();
        assert!(pad.initialized);
        assert_eq!(pad.updates, 2);
        assert!(pad.released);
    }

    #[test]
    fn test_same_type_replaces() {
        let mut devices = InputDevices::new();
        devices.insert(Gamepad::default());
        let second = devices.insert(Gamepad::default());
        assert_eq!(devices.len(), 1);

        devices.update_all();
        assert_eq!(second.lock().updates, 1);
    }

    #[test]
    fn test_clones_share_devices() {
        let mut devices = InputDevices::new();
        devices.insert(Gamepad::default());
        let worker_view = devices.clone();

        worker_view.update_all();
        assert_eq!(devices.get::<Gamepad>().unwrap().lock().updates, 1);
    }
}
