//! Render ordering and the external render sink.
//!
//! A scene's render events are sorted once, when the scene starts, into an
//! immutable [`RenderList`]. The sink receives the list on activation and is
//! then asked to draw it once per frame with an interpolation factor.

use crate::input::KeyBindings;
use cadence_core::{CadenceError, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Draw layer. Lower values are drawn first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ZIndex(u32);

impl ZIndex {
    pub const BOTTOM: ZIndex = ZIndex(0);

    /// Rejects negative layers.
    pub fn new(z: i32) -> Result<Self> {
        u32::try_from(z)
            .map(ZIndex)
            .map_err(|_| CadenceError::InvalidArgument(format!("z-index must be >= 0, got {z}")))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ZIndex {
    fn from(z: u32) -> Self {
        ZIndex(z)
    }
}

/// Something drawn onto the sink's surface once per frame, in z order.
pub trait RenderEvent<S: ?Sized>: Send + Sync {
    /// `interpolation` is the progress towards the next tick, in `[0, 1)`.
    fn render(&self, surface: &mut S, interpolation: f64) -> Result<()>;
}

impl<S: ?Sized, T: RenderEvent<S> + ?Sized> RenderEvent<S> for Arc<Mutex<T>> {
    fn render(&self, surface: &mut S, interpolation: f64) -> Result<()> {
        self.lock().render(surface, interpolation)
    }
}

/// A drawable with its layer. Ordered by layer only.
pub struct RenderEntry<S: ?Sized + 'static> {
    pub z: ZIndex,
    pub event: Arc<dyn RenderEvent<S>>,
}

impl<S: ?Sized + 'static> Clone for RenderEntry<S> {
    fn clone(&self) -> Self {
        Self {
            z: self.z,
            event: self.event.clone(),
        }
    }
}

impl<S: ?Sized + 'static> fmt::Debug for RenderEntry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderEntry").field("z", &self.z).finish()
    }
}

/// Immutable, z-sorted snapshot of a scene's render events.
///
/// Entries on the same layer keep their registration order.
pub struct RenderList<S: ?Sized + 'static>(Arc<[RenderEntry<S>]>);

impl<S: ?Sized + 'static> RenderList<S> {
    pub fn empty() -> Self {
        RenderList(Arc::from(Vec::new()))
    }

    pub(crate) fn sorted(mut entries: Vec<RenderEntry<S>>) -> Self {
        // `sort_by_key` is stable
        entries.sort_by_key(|e| e.z);
        RenderList(Arc::from(entries))
    }

    /// Draw every entry in order. Stops at the first failing entry.
    pub fn render_all(&self, surface: &mut S, interpolation: f64) -> Result<()> {
        for entry in self.0.iter() {
            entry.event.render(surface, interpolation)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RenderEntry<S>> {
        self.0.iter()
    }

    pub fn z_indices(&self) -> Vec<ZIndex> {
        self.0.iter().map(|e| e.z).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: ?Sized + 'static> Clone for RenderList<S> {
    fn clone(&self) -> Self {
        RenderList(self.0.clone())
    }
}

impl<S: ?Sized + 'static> Default for RenderList<S> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S: ?Sized + 'static> fmt::Debug for RenderList<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}

/// Consumer of render lists. Owned by the loop worker.
pub trait RenderSink<S: ?Sized + 'static>: Send {
    /// A new scene became active. Called on the worker before the first
    /// frame of that scene.
    fn load_scene(&mut self, _scene: &str, _list: &RenderList<S>, _bindings: Arc<KeyBindings>) {}

    /// Draw one frame.
    fn render(&mut self, list: &RenderList<S>, interpolation: f64) -> Result<()>;
}

/// A sink that draws straight onto a surface it owns.
pub struct SurfaceSink<S> {
    surface: S,
    scene: Option<String>,
    bindings: Arc<KeyBindings>,
    frames: u64,
}

impl<S> SurfaceSink<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            scene: None,
            bindings: Arc::new(KeyBindings::new()),
            frames: 0,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Id of the scene whose list is being drawn.
    pub fn scene(&self) -> Option<&str> {
        self.scene.as_deref()
    }

    pub fn bindings(&self) -> Arc<KeyBindings> {
        self.bindings.clone()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl<S: Send + 'static> RenderSink<S> for SurfaceSink<S> {
    fn load_scene(&mut self, scene: &str, _list: &RenderList<S>, bindings: Arc<KeyBindings>) {
        self.scene = Some(scene.to_string());
        self.bindings = bindings;
    }

    fn render(&mut self, list: &RenderList<S>, interpolation: f64) -> Result<()> {
        self.frames += 1;
        list.render_all(&mut self.surface, interpolation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Label(&'static str);

    impl RenderEvent<Vec<String>> for Label {
        fn render(&self, surface: &mut Vec<String>, _interpolation: f64) -> Result<()> {
            surface.push(self.0.to_string());
            Ok(())
        }
    }

    fn entry(name: &'static str, z: i32) -> RenderEntry<Vec<String>> {
        RenderEntry {
            z: ZIndex::new(z).unwrap(),
            event: Arc::new(Label(name)),
        }
    }

    #[test]
    fn test_negative_z_rejected() {
        assert_eq!(ZIndex::new(0).unwrap(), ZIndex::BOTTOM);
        let err = ZIndex::new(-1).unwrap_err();
        assert!(matches!(err, CadenceError::InvalidArgument(_)));
    }

    #[test]
    fn test_equal_layers_keep_registration_order() {
        let list = RenderList::sorted(vec![entry("A", 0), entry("B", 1), entry("C", 0)]);
        assert_eq!(
            list.z_indices(),
            vec![ZIndex::BOTTOM, ZIndex::BOTTOM, ZIndex::from(1)]
        );
        let mut surface = Vec::new();
        list.render_all(&mut surface, 0.0).unwrap();
        assert_eq!(surface, vec!["A", "C", "B"]);
    }

    #[test]
    fn test_surface_sink_draws_list() {
        let list = RenderList::sorted(vec![entry("top", 5), entry("bottom", 0)]);
        let mut sink = SurfaceSink::new(Vec::new());
        sink.load_scene("menu", &list, Arc::new(KeyBindings::new()));
        sink.render(&list, 0.5).unwrap();

        assert_eq!(sink.scene(), Some("menu"));
        assert_eq!(sink.frames(), 1);
        assert_eq!(sink.surface(), &vec!["bottom".to_string(), "top".to_string()]);
    }
}
