//! Cadence Runtime - Fixed-timestep game loop
//!
//! Provides the scheduler core:
//! - `GameLoop` / `LoopHandle` - the driver and its cloneable control surface
//! - `Scene` / `SceneBuilder` - lifecycle hooks and write-once registration
//! - `MovementEvent`, `CollisionEvent`, `RenderEvent`, `Callback` - what a scene ticks
//! - `CallbackQueue` - per-scene deferred callbacks with pause/cancel/reschedule
//! - `FixedStep` - tick deadlines, frame-skip cap and render throttle
//! - `InputDevices`, `Keyboard`, `Mouse`, `KeyBindings` - pull-style input
//! - `LoopConfig` - TOML-backed timing configuration

mod clock;
mod config;
mod events;
mod game_loop;
pub mod input;
mod render;
mod scene;
mod scheduler;
mod state;
mod timeline;

pub use clock::FixedStep;
pub use config::LoopConfig;
pub use events::{Callback, CollisionEvent, CollisionTest, Direction, Map, MovementEvent};
pub use game_loop::{GameLoop, LoopHandle};
pub use input::{InputDevice, KeyBindings, Keyboard, Mouse};
pub use render::{RenderEntry, RenderEvent, RenderList, RenderSink, SurfaceSink, ZIndex};
pub use scene::{CallbackHandle, Scene, SceneBuilder, SceneKey};
pub use scheduler::{CallbackId, CallbackQueue};
pub use state::SceneState;
pub use timeline::SceneClock;
