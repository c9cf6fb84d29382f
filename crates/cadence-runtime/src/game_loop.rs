//! The fixed-timestep game loop driver.
//!
//! [`GameLoop`] owns the scene registry and input devices while it is being
//! set up. [`GameLoop::start_loop`] locks registration and moves everything
//! onto a dedicated worker thread, which runs frames of the form:
//!
//! 1. sleep until the render-rate cap allows a new frame,
//! 2. activate the requested scene if it changed,
//! 3. run up to `max_frame_skip` owed ticks (input, callbacks, collisions,
//!    movements),
//! 4. hand the active scene's render list to the sink with the
//!    interpolation factor.
//!
//! Any error raised inside a frame is fatal: the worker logs it and exits
//! the process.
//!
//! [`LoopHandle`] is the cloneable control surface (scene switching,
//! freeze/pause, callback control) usable from any thread, including from
//! inside event handlers.

use crate::clock::FixedStep;
use crate::config::LoopConfig;
use crate::events::Callback;
use crate::input::{InputDevice, InputDevices, Key, KeyBindings, Modifiers};
use crate::render::RenderSink;
use crate::scene::{CallbackHandle, Scene, SceneKey, SceneSlot};
use crate::timeline::Timeline;
use cadence_core::{CadenceError, Clock, Result, SystemClock, TimeSpan};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Default)]
struct SceneDirectory {
    keys: HashMap<String, SceneKey>,
    ids: Vec<String>,
    timelines: Vec<Arc<Mutex<Timeline>>>,
}

/// State shared between the driver, its handles and the worker.
struct Shared {
    clock: Arc<dyn Clock>,
    locked: AtomicBool,
    running: AtomicBool,
    stop_requested: AtomicBool,
    directory: RwLock<SceneDirectory>,
    requested: Mutex<Option<SceneKey>>,
    active: Mutex<Option<SceneKey>>,
    active_bindings: RwLock<Arc<KeyBindings>>,
}

/// Cloneable control surface of a [`GameLoop`].
#[derive(Clone)]
pub struct LoopHandle {
    shared: Arc<Shared>,
}

impl LoopHandle {
    fn now(&self) -> TimeSpan {
        self.shared.clock.now()
    }

    fn timeline(&self, key: SceneKey) -> Result<Arc<Mutex<Timeline>>> {
        self.shared
            .directory
            .read()
            .timelines
            .get(key.0)
            .cloned()
            .ok_or_else(|| CadenceError::SceneNotFound(format!("#{}", key.0)))
    }

    fn active_timeline(&self) -> Result<(SceneKey, Arc<Mutex<Timeline>>)> {
        let key = (*self.shared.active.lock())
            .ok_or_else(|| CadenceError::InvalidState("no active scene".into()))?;
        Ok((key, self.timeline(key)?))
    }

    /// Request a scene switch. Takes effect at the start of the next frame.
    pub fn switch_scene(&self, id: &str) -> Result<()> {
        let key = self
            .shared
            .directory
            .read()
            .keys
            .get(id)
            .copied()
            .ok_or_else(|| CadenceError::SceneNotFound(id.to_string()))?;
        *self.shared.requested.lock() = Some(key);
        log::debug!("scene '{}' requested", id);
        Ok(())
    }

    /// Id of the scene the worker currently drives.
    pub fn active_scene(&self) -> Option<String> {
        let key = (*self.shared.active.lock())?;
        self.shared.directory.read().ids.get(key.0).cloned()
    }

    /// Local clock of the active scene.
    pub fn scene_time(&self) -> Result<TimeSpan> {
        let (_, timeline) = self.active_timeline()?;
        let now = self.now();
        let time = timeline.lock().scene_time(now);
        Ok(time)
    }

    /// Stop movement and collision updates on the active scene. Rendering,
    /// callbacks and the scene clock keep running.
    pub fn freeze(&self) -> Result<()> {
        let (_, timeline) = self.active_timeline()?;
        timeline.lock().frozen = true;
        Ok(())
    }

    pub fn unfreeze(&self) -> Result<()> {
        let (_, timeline) = self.active_timeline()?;
        timeline.lock().frozen = false;
        Ok(())
    }

    /// Stop everything but rendering on the active scene and stop its clock,
    /// the same way switching away from it would.
    pub fn pause(&self) -> Result<()> {
        let (_, timeline) = self.active_timeline()?;
        let now = self.now();
        let mut timeline = timeline.lock();
        timeline.paused = true;
        timeline.clock.suspend(now);
        Ok(())
    }

    /// Lift a pause and a freeze on the active scene.
    pub fn play(&self) -> Result<()> {
        let (_, timeline) = self.active_timeline()?;
        let now = self.now();
        let mut timeline = timeline.lock();
        if timeline.paused {
            timeline.paused = false;
            timeline.clock.resume(now);
        }
        timeline.frozen = false;
        Ok(())
    }

    pub fn is_frozen(&self) -> Result<bool> {
        let (_, timeline) = self.active_timeline()?;
        let frozen = timeline.lock().frozen;
        Ok(frozen)
    }

    pub fn is_paused(&self) -> Result<bool> {
        let (_, timeline) = self.active_timeline()?;
        let paused = timeline.lock().paused;
        Ok(paused)
    }

    /// Run `callback` once `wait` has passed on the active scene's clock.
    pub fn schedule_callback(
        &self,
        callback: impl Callback + 'static,
        wait: TimeSpan,
    ) -> Result<CallbackHandle> {
        let (scene, timeline) = self.active_timeline()?;
        let now = self.now();
        let mut timeline = timeline.lock();
        let scene_time = timeline.scene_time(now);
        let id = timeline
            .callbacks
            .schedule(Box::new(callback), wait, scene_time);
        Ok(CallbackHandle { scene, id })
    }

    /// Queue a fired, cancelled or paused callback again. Fails with a state
    /// error while it is still queued.
    pub fn reschedule_callback(&self, handle: CallbackHandle) -> Result<()> {
        self.with_queue(handle, |timeline, now| {
            let scene_time = timeline.scene_time(now);
            timeline.callbacks.reschedule(handle.id, scene_time)
        })
    }

    pub fn cancel_callback(&self, handle: CallbackHandle) -> Result<()> {
        self.with_queue(handle, |timeline, _| timeline.callbacks.cancel(handle.id))
    }

    pub fn pause_callback(&self, handle: CallbackHandle) -> Result<()> {
        self.with_queue(handle, |timeline, now| {
            let scene_time = timeline.scene_time(now);
            timeline.callbacks.pause(handle.id, scene_time)
        })
    }

    pub fn unpause_callback(&self, handle: CallbackHandle) -> Result<()> {
        self.with_queue(handle, |timeline, now| {
            let scene_time = timeline.scene_time(now);
            timeline.callbacks.unpause(handle.id, scene_time)
        })
    }

    /// Forget the callback. The handle becomes invalid.
    pub fn release_callback(&self, handle: CallbackHandle) -> Result<()> {
        self.with_queue(handle, |timeline, _| timeline.callbacks.release(handle.id))
    }

    pub fn is_callback_queued(&self, handle: CallbackHandle) -> Result<bool> {
        self.with_queue(handle, |timeline, _| timeline.callbacks.is_queued(handle.id))
    }

    fn with_queue<T>(
        &self,
        handle: CallbackHandle,
        f: impl FnOnce(&mut Timeline, TimeSpan) -> Result<T>,
    ) -> Result<T> {
        let timeline = self.timeline(handle.scene)?;
        let now = self.now();
        let mut timeline = timeline.lock();
        f(&mut *timeline, now)
    }

    /// Run the active scene's binding for a key stroke. Called by toolkit
    /// adapters; returns whether a binding ran.
    pub fn dispatch_key(&self, key: Key, modifiers: Modifiers, released: bool) -> Result<bool> {
        let bindings = self.shared.active_bindings.read().clone();
        bindings.dispatch(key, modifiers, released)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}

/// What one frame did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct FrameReport {
    pub ticks: u32,
    pub interpolation: f64,
}

/// What the worker hands back at shutdown.
struct WorkerExit<S: ?Sized + 'static> {
    slots: Vec<SceneSlot<S>>,
    sink: Box<dyn RenderSink<S>>,
}

/// The loop body. Owned by the worker thread while the loop runs.
pub(crate) struct Worker<S: ?Sized + 'static> {
    shared: Arc<Shared>,
    slots: Vec<SceneSlot<S>>,
    sink: Box<dyn RenderSink<S>>,
    devices: InputDevices,
    pacer: FixedStep,
    active: Option<SceneKey>,
}

impl<S: ?Sized + 'static> Worker<S> {
    fn run(&mut self) {
        if let Err(e) = self.devices.initialize_all() {
            fatal(&e.to_string());
        }

        while !self.shared.stop_requested.load(Ordering::SeqCst) {
            let wait = self.pacer.frame_wait(self.shared.clock.now());
            if let Some(wait) = wait.to_std() {
                if !wait.is_zero() {
                    thread::sleep(wait);
                }
            }

            match panic::catch_unwind(AssertUnwindSafe(|| self.iterate())) {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => fatal(&e.to_string()),
                Err(_) => fatal("event handler panicked"),
            }
        }

        self.devices.release_all();
    }

    /// One frame: scene switch, catch-up ticks, render.
    pub(crate) fn iterate(&mut self) -> Result<FrameReport> {
        let clock = self.shared.clock.clone();
        let frame_start = clock.now();
        self.pacer.begin_frame(frame_start);

        self.switch_if_requested(frame_start)?;

        let mut ticks = 0;
        while self.pacer.should_tick(clock.now()) {
            self.devices.update_all();
            if let Some(key) = self.active {
                self.slots[key.0].tick(clock.now())?;
            }
            self.pacer.consume_tick();
            ticks += 1;
        }

        let now = clock.now();
        if self.pacer.is_behind(now) {
            log::debug!(
                "frame skip cap of {} reached; next tick overdue by {}",
                self.pacer.max_skip,
                now - self.pacer.next_tick()
            );
        }

        let interpolation = self.pacer.interpolation(now);
        if let Some(key) = self.active {
            self.sink.render(self.slots[key.0].render_list(), interpolation)?;
        }

        Ok(FrameReport {
            ticks,
            interpolation,
        })
    }

    fn switch_if_requested(&mut self, now: TimeSpan) -> Result<()> {
        let Some(next) = *self.shared.requested.lock() else {
            return Ok(());
        };
        if self.active == Some(next) {
            return Ok(());
        }

        if let Some(previous) = self.active {
            self.slots[previous.0].pause(now)?;
        }
        // handles may read the scene clock as soon as the scene is published
        self.slots[next.0].stamp_clock(now);
        self.active = Some(next);
        *self.shared.active.lock() = Some(next);

        let slot = &mut self.slots[next.0];
        slot.start(now)?;
        slot.resume(now)?;
        log::info!("scene '{}' active", slot.id());

        *self.shared.active_bindings.write() = slot.bindings();
        self.sink.load_scene(slot.id(), slot.render_list(), slot.bindings());
        Ok(())
    }

    fn into_exit(self) -> WorkerExit<S> {
        WorkerExit {
            slots: self.slots,
            sink: self.sink,
        }
    }
}

fn fatal(message: &str) -> ! {
    log::error!("fatal error in game loop: {}", message);
    std::process::exit(1)
}

struct RunningWorker<S: ?Sized + 'static> {
    thread: JoinHandle<()>,
    exit: Receiver<WorkerExit<S>>,
}

/// The game loop driver.
///
/// `S` is the surface type render events draw on. Construct it, register
/// scenes and input devices, then call [`start_loop`](Self::start_loop).
pub struct GameLoop<S: ?Sized + 'static> {
    config: LoopConfig,
    shared: Arc<Shared>,
    slots: Vec<SceneSlot<S>>,
    sink: Option<Box<dyn RenderSink<S>>>,
    devices: InputDevices,
    worker: Option<RunningWorker<S>>,
    finished: bool,
}

impl<S: ?Sized + 'static> GameLoop<S> {
    pub fn new(config: LoopConfig, sink: impl RenderSink<S> + 'static) -> Result<Self> {
        Self::with_clock(config, sink, SystemClock::new())
    }

    /// Construct a loop reading time from `clock`.
    pub fn with_clock(
        config: LoopConfig,
        sink: impl RenderSink<S> + 'static,
        clock: impl Clock + 'static,
    ) -> Result<Self> {
        config.validate()?;
        let shared = Shared {
            clock: Arc::new(clock),
            locked: AtomicBool::new(false),
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            directory: RwLock::new(SceneDirectory::default()),
            requested: Mutex::new(None),
            active: Mutex::new(None),
            active_bindings: RwLock::new(Arc::new(KeyBindings::new())),
        };
        Ok(Self {
            config,
            shared: Arc::new(shared),
            slots: Vec::new(),
            sink: Some(Box::new(sink)),
            devices: InputDevices::new(),
            worker: None,
            finished: false,
        })
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            shared: self.shared.clone(),
        }
    }

    fn is_locked(&self) -> bool {
        self.shared.locked.load(Ordering::SeqCst)
    }

    /// Register a scene under `id` and make it the requested scene. Adding
    /// an existing id replaces that scene. Ignored once the loop has started.
    pub fn add_scene(&mut self, id: impl Into<String>, scene: impl Scene<S> + 'static) {
        let id = id.into();
        if self.is_locked() {
            log::warn!("add_scene('{}') ignored: loop already started", id);
            return;
        }

        let timeline = Arc::new(Mutex::new(Timeline::default()));
        let mut directory = self.shared.directory.write();
        let existing = directory.keys.get(&id).copied();
        let key = match existing {
            Some(key) => {
                directory.timelines[key.0] = timeline.clone();
                self.slots[key.0] = SceneSlot::new(id.clone(), key, Box::new(scene), timeline);
                key
            }
            None => {
                let key = SceneKey(self.slots.len());
                directory.keys.insert(id.clone(), key);
                directory.ids.push(id.clone());
                directory.timelines.push(timeline.clone());
                self.slots
                    .push(SceneSlot::new(id.clone(), key, Box::new(scene), timeline));
                key
            }
        };
        drop(directory);

        *self.shared.requested.lock() = Some(key);
        log::debug!("scene '{}' registered", id);
    }

    /// Register an input device, replacing one of the same type. Ignored
    /// once the loop has started.
    pub fn add_input_device<T: InputDevice>(&mut self, device: T) {
        if self.is_locked() {
            log::warn!(
                "add_input_device::<{}>() ignored: loop already started",
                std::any::type_name::<T>()
            );
            return;
        }
        self.devices.insert(device);
    }

    pub fn get_input_device<T: InputDevice>(&self) -> Result<Arc<Mutex<T>>> {
        self.devices.get::<T>()
    }

    /// Lock registration and start the worker thread. No-op while running.
    pub fn start_loop(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let mut worker = self.build_worker()?;

        let (exit_tx, exit_rx) = crossbeam_channel::bounded(1);
        let thread = thread::Builder::new()
            .name("cadence-loop".into())
            .spawn(move || {
                worker.run();
                let _ = exit_tx.send(worker.into_exit());
            })?;

        self.worker = Some(RunningWorker {
            thread,
            exit: exit_rx,
        });
        self.shared.running.store(true, Ordering::SeqCst);
        log::info!(
            "game loop started ({} ups, {} fps cap, max {} skipped)",
            self.config.updates_per_second,
            self.config.max_fps,
            self.config.max_frame_skip
        );
        Ok(())
    }

    /// Stop the worker after its current frame and run `on_stop` on every
    /// scene that was ever started. Returns the first `on_stop` error.
    pub fn stop_loop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.shared.stop_requested.store(true, Ordering::SeqCst);

        let exit = match worker.exit.recv_timeout(self.config.shutdown_timeout()) {
            Ok(exit) => exit,
            Err(RecvTimeoutError::Timeout) => {
                self.shared.running.store(false, Ordering::SeqCst);
                self.finished = true;
                return Err(CadenceError::InvalidState(format!(
                    "loop worker did not stop within {} ms",
                    self.config.shutdown_timeout_ms
                )));
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = worker.thread.join();
                self.shared.running.store(false, Ordering::SeqCst);
                self.finished = true;
                return Err(CadenceError::Runtime("loop worker exited abnormally".into()));
            }
        };
        let _ = worker.thread.join();
        self.shared.running.store(false, Ordering::SeqCst);
        self.teardown(exit)
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn build_worker(&mut self) -> Result<Worker<S>> {
        if self.finished {
            return Err(CadenceError::InvalidState("game loop already shut down".into()));
        }
        if self.slots.is_empty() {
            return Err(CadenceError::InvalidState("no scenes registered".into()));
        }
        let sink = self
            .sink
            .take()
            .ok_or_else(|| CadenceError::InvalidState("render sink already in use".into()))?;

        self.shared.locked.store(true, Ordering::SeqCst);
        self.shared.stop_requested.store(false, Ordering::SeqCst);

        let mut pacer = FixedStep::from_config(&self.config);
        pacer.reset(self.shared.clock.now());

        Ok(Worker {
            shared: self.shared.clone(),
            slots: std::mem::take(&mut self.slots),
            sink,
            devices: self.devices.clone(),
            pacer,
            active: None,
        })
    }

    fn teardown(&mut self, exit: WorkerExit<S>) -> Result<()> {
        self.slots = exit.slots;
        self.sink = Some(exit.sink);
        self.finished = true;

        let mut first_error = None;
        for slot in self.slots.iter_mut() {
            if let Err(e) = slot.stop() {
                log::error!("scene '{}' failed to stop: {}", slot.id(), e);
                first_error.get_or_insert(e);
            }
        }
        *self.shared.active.lock() = None;
        log::info!("game loop stopped");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // Shorthands for the handle's control surface.

    pub fn switch_scene(&self, id: &str) -> Result<()> {
        self.handle().switch_scene(id)
    }

    pub fn freeze(&self) -> Result<()> {
        self.handle().freeze()
    }

    pub fn unfreeze(&self) -> Result<()> {
        self.handle().unfreeze()
    }

    pub fn pause(&self) -> Result<()> {
        self.handle().pause()
    }

    pub fn play(&self) -> Result<()> {
        self.handle().play()
    }

    pub fn schedule_callback(
        &self,
        callback: impl Callback + 'static,
        wait: TimeSpan,
    ) -> Result<CallbackHandle> {
        self.handle().schedule_callback(callback, wait)
    }

    pub fn reschedule_callback(&self, handle: CallbackHandle) -> Result<()> {
        self.handle().reschedule_callback(handle)
    }

    pub fn cancel_callback(&self, handle: CallbackHandle) -> Result<()> {
        self.handle().cancel_callback(handle)
    }
}

impl<S: ?Sized + 'static> Drop for GameLoop<S> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.stop_loop() {
                log::error!("error while stopping game loop: {}", e);
            }
        }
    }
}
