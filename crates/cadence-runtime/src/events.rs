//! Event capabilities ticked by the game loop, and the collision collaborators
//! they consume.
//!
//! Per tick, a scene runs its collision events first (in registration order),
//! then its movement events. Scheduled callbacks fire before both.

use cadence_core::{Result, TimeSpan};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

/// Something that moves with the scene clock. Called once per tick while
/// the scene is neither frozen nor paused.
pub trait MovementEvent: Send {
    /// `scene_time` is the owning scene's local clock.
    fn on_move(&mut self, scene_time: TimeSpan) -> Result<()>;
}

/// Something that reacts to collisions. Called once per tick, before any
/// movement event, with the scene map's collision test.
pub trait CollisionEvent: Send {
    fn detect_collision(&mut self, tester: &dyn CollisionTest) -> Result<()>;
}

/// A deferred action run by the callback scheduler.
pub trait Callback: Send {
    fn call(&mut self) -> Result<()>;
}

impl<F> Callback for F
where
    F: FnMut() -> Result<()> + Send,
{
    fn call(&mut self) -> Result<()> {
        self()
    }
}

// Shared objects (e.g. something that both moves and renders) are registered
// behind `Arc<Mutex<_>>`.
impl<T: MovementEvent + ?Sized> MovementEvent for Arc<Mutex<T>> {
    fn on_move(&mut self, scene_time: TimeSpan) -> Result<()> {
        self.lock().on_move(scene_time)
    }
}

impl<T: CollisionEvent + ?Sized> CollisionEvent for Arc<Mutex<T>> {
    fn detect_collision(&mut self, tester: &dyn CollisionTest) -> Result<()> {
        self.lock().detect_collision(tester)
    }
}

/// Direction of the next step when probing ahead for collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }
}

/// Collision geometry queries. Implemented outside the core.
///
/// `object` identifies the kind of thing being tested for; implementations
/// downcast it to whatever types their map understands.
pub trait CollisionTest: Send + Sync {
    /// Does position `(x, y)` collide with anything at all?
    fn check_any_collision(&self, x: i32, y: i32) -> bool;

    /// Does position `(x, y)` collide with `object`?
    fn check_collision(&self, x: i32, y: i32, object: &dyn Any) -> bool;

    /// Would the next step from `(x, y)` in `direction` collide with `object`?
    fn check_next_collision(&self, x: i32, y: i32, object: &dyn Any, direction: Direction)
        -> bool;
}

/// The playing field of a scene. Required by scenes that register collision events.
pub trait Map: Send + Sync {
    fn collision_test(&self) -> &dyn CollisionTest;
}
