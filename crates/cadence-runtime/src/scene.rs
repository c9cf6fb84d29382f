//! Scenes: user-defined bundles of events with their own clock.
//!
//! A [`Scene`] populates its registries once, through the [`SceneBuilder`]
//! handed to [`Scene::on_start`]. After that its configuration is fixed; the
//! loop worker only drives the lifecycle hooks and ticks its events.

use crate::events::{Callback, CollisionEvent, Map, MovementEvent};
use crate::input::{Key, KeyAction, KeyBindings, KeyStroke, Modifiers};
use crate::render::{RenderEntry, RenderEvent, RenderList, ZIndex};
use crate::scheduler::CallbackId;
use crate::state::SceneState;
use crate::timeline::Timeline;
use cadence_core::{CadenceError, Result, TimeSpan};
use parking_lot::Mutex;
use std::sync::Arc;

/// One mode of the application (menu, level, ...). `S` is the surface type
/// render events draw on.
///
/// Every hook defaults to a no-op.
pub trait Scene<S: ?Sized + 'static>: Send {
    /// Called exactly once, the first time the scene becomes active.
    fn on_start(&mut self, _builder: &mut SceneBuilder<'_, S>) -> Result<()> {
        Ok(())
    }

    /// Called every time the scene becomes active, right after `on_start` included.
    fn on_resume(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called when another scene is about to become active.
    fn on_pause(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once at shutdown, only if the scene was ever started.
    fn on_stop(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Opaque index of a registered scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneKey(pub(crate) usize);

/// A scheduled callback: owning scene plus its record in that scene's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackHandle {
    pub scene: SceneKey,
    pub(crate) id: CallbackId,
}

struct SceneContents<S: ?Sized + 'static> {
    movements: Vec<Box<dyn MovementEvent>>,
    renders: Vec<RenderEntry<S>>,
    collisions: Vec<Box<dyn CollisionEvent>>,
    map: Option<Arc<dyn Map>>,
    bindings: KeyBindings,
}

impl<S: ?Sized + 'static> Default for SceneContents<S> {
    fn default() -> Self {
        Self {
            movements: Vec::new(),
            renders: Vec::new(),
            collisions: Vec::new(),
            map: None,
            bindings: KeyBindings::new(),
        }
    }
}

/// Write-once registration surface, only usable inside [`Scene::on_start`].
///
/// Calls made once the scene has left `Pending` are ignored.
pub struct SceneBuilder<'a, S: ?Sized + 'static> {
    id: &'a str,
    key: SceneKey,
    state: SceneState,
    now: TimeSpan,
    contents: &'a mut SceneContents<S>,
    timeline: &'a Mutex<Timeline>,
}

impl<'a, S: ?Sized + 'static> SceneBuilder<'a, S> {
    fn open(&self) -> bool {
        self.state == SceneState::Pending
    }

    /// Id the scene was registered under.
    pub fn scene_id(&self) -> &str {
        self.id
    }

    pub fn scene_key(&self) -> SceneKey {
        self.key
    }

    /// Scene time at the moment the scene started.
    pub fn scene_time(&self) -> TimeSpan {
        self.timeline.lock().scene_time(self.now)
    }

    pub fn add_movement_event(&mut self, event: impl MovementEvent + 'static) {
        if self.open() {
            self.contents.movements.push(Box::new(event));
        }
    }

    /// Register a drawable on layer `z_index`. Negative layers are rejected.
    pub fn add_render_event(&mut self, event: impl RenderEvent<S> + 'static, z_index: i32) -> Result<()> {
        let z = ZIndex::new(z_index)?;
        if self.open() {
            self.contents.renders.push(RenderEntry {
                z,
                event: Arc::new(event),
            });
        }
        Ok(())
    }

    /// Collision events need a map; see [`set_map`](Self::set_map).
    pub fn add_collision_event(&mut self, event: impl CollisionEvent + 'static) {
        if self.open() {
            self.contents.collisions.push(Box::new(event));
        }
    }

    pub fn set_map(&mut self, map: Arc<dyn Map>) {
        if self.open() {
            self.contents.map = Some(map);
        }
    }

    /// Bind `action` to a key stroke, or remove the binding with `None`.
    pub fn put_key_binding(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        on_release: bool,
        action: Option<KeyAction>,
    ) {
        if self.open() {
            let stroke = KeyStroke {
                key,
                modifiers,
                on_release,
            };
            self.contents.bindings.put(stroke, action);
        }
    }

    /// Schedule a callback on this scene's clock.
    pub fn schedule_callback(
        &mut self,
        callback: impl Callback + 'static,
        wait: TimeSpan,
    ) -> CallbackHandle {
        let mut timeline = self.timeline.lock();
        let now = timeline.scene_time(self.now);
        let id = timeline.callbacks.schedule(Box::new(callback), wait, now);
        CallbackHandle {
            scene: self.key,
            id,
        }
    }
}

/// A registered scene and everything the worker needs to drive it.
pub(crate) struct SceneSlot<S: ?Sized + 'static> {
    id: String,
    key: SceneKey,
    scene: Box<dyn Scene<S>>,
    state: SceneState,
    contents: SceneContents<S>,
    render_list: RenderList<S>,
    bindings: Arc<KeyBindings>,
    timeline: Arc<Mutex<Timeline>>,
}

impl<S: ?Sized + 'static> SceneSlot<S> {
    pub(crate) fn new(
        id: impl Into<String>,
        key: SceneKey,
        scene: Box<dyn Scene<S>>,
        timeline: Arc<Mutex<Timeline>>,
    ) -> Self {
        Self {
            id: id.into(),
            key,
            scene,
            state: SceneState::Pending,
            contents: SceneContents::default(),
            render_list: RenderList::empty(),
            bindings: Arc::new(KeyBindings::new()),
            timeline,
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn state(&self) -> SceneState {
        self.state
    }

    pub(crate) fn render_list(&self) -> &RenderList<S> {
        &self.render_list
    }

    pub(crate) fn bindings(&self) -> Arc<KeyBindings> {
        self.bindings.clone()
    }

    /// Start the scene clock if the scene was never activated.
    pub(crate) fn stamp_clock(&mut self, now: TimeSpan) {
        if self.state == SceneState::Pending {
            self.timeline.lock().clock.start(now);
        }
    }

    /// First activation: run `on_start`, check the map requirement, and
    /// freeze the registries. No-op once started.
    pub(crate) fn start(&mut self, now: TimeSpan) -> Result<()> {
        if self.state != SceneState::Pending {
            return Ok(());
        }
        self.stamp_clock(now);

        let mut builder = SceneBuilder {
            id: &self.id,
            key: self.key,
            state: self.state,
            now,
            contents: &mut self.contents,
            timeline: &self.timeline,
        };
        self.scene.on_start(&mut builder)?;

        if !self.contents.collisions.is_empty() && self.contents.map.is_none() {
            return Err(CadenceError::InvalidState(format!(
                "scene '{}' registers collision events but has no map",
                self.id
            )));
        }

        let renders = std::mem::take(&mut self.contents.renders);
        self.render_list = RenderList::sorted(renders);
        self.bindings = Arc::new(std::mem::take(&mut self.contents.bindings));
        self.state = SceneState::Playing;
        log::info!("scene '{}' started", self.id);
        Ok(())
    }

    /// Activation: run `on_resume` and fold any time spent switched away
    /// out of the scene clock.
    pub(crate) fn resume(&mut self, now: TimeSpan) -> Result<()> {
        if !matches!(self.state, SceneState::Playing | SceneState::Paused) {
            return Ok(());
        }
        self.scene.on_resume()?;
        {
            let mut timeline = self.timeline.lock();
            // a driver-level pause keeps the clock stopped until `play`
            if self.state == SceneState::Paused && !timeline.paused {
                timeline.clock.resume(now);
            }
        }
        self.state = SceneState::Playing;
        log::debug!("scene '{}' resumed", self.id);
        Ok(())
    }

    /// Deactivation: run `on_pause` and stop the scene clock.
    pub(crate) fn pause(&mut self, now: TimeSpan) -> Result<()> {
        if self.state != SceneState::Playing {
            return Ok(());
        }
        self.scene.on_pause()?;
        self.state = SceneState::Paused;
        self.timeline.lock().clock.suspend(now);
        log::debug!("scene '{}' paused", self.id);
        Ok(())
    }

    /// Shutdown. Runs `on_stop` at most once, and only for started scenes.
    pub(crate) fn stop(&mut self) -> Result<()> {
        if !self.state.was_started() || !self.state.can_transition(SceneState::Stopped) {
            return Ok(());
        }
        self.state = SceneState::Stopped;
        log::info!("scene '{}' stopped", self.id);
        self.scene.on_stop()
    }

    /// One simulation step: due callbacks, then collisions, then movements.
    pub(crate) fn tick(&mut self, now: TimeSpan) -> Result<()> {
        if self.timeline.lock().paused {
            return Ok(());
        }

        self.fire_callbacks(now)?;

        // a callback may have frozen or paused the scene
        {
            let timeline = self.timeline.lock();
            if timeline.frozen || timeline.paused {
                return Ok(());
            }
        }

        if let Some(map) = &self.contents.map {
            let tester = map.collision_test();
            for event in self.contents.collisions.iter_mut() {
                event.detect_collision(tester)?;
            }
        }

        let scene_time = self.timeline.lock().scene_time(now);
        for event in self.contents.movements.iter_mut() {
            event.on_move(scene_time)?;
        }
        Ok(())
    }

    /// Fire every callback due at `now`. The timeline lock is released while
    /// a callback runs so that it may schedule or cancel callbacks itself.
    fn fire_callbacks(&mut self, now: TimeSpan) -> Result<()> {
        let watermark = self.timeline.lock().callbacks.watermark();
        loop {
            let popped = {
                let mut timeline = self.timeline.lock();
                let scene_time = timeline.scene_time(now);
                timeline.callbacks.pop_due(scene_time, watermark)
            };
            let Some((id, mut callback)) = popped else {
                return Ok(());
            };

            let result = callback.call();
            self.timeline.lock().callbacks.restore(id, callback);
            result?;
        }
    }
}
