//! Scene-local time.
//!
//! A scene's clock reads `now - start_stamp - excluded`, where `excluded`
//! accumulates every interval the scene spent suspended (switched away from,
//! or paused through the driver). Freezing does not suspend the clock.

use crate::scheduler::CallbackQueue;
use cadence_core::TimeSpan;

#[derive(Debug, Clone, Default)]
pub struct SceneClock {
    start_stamp: TimeSpan,
    excluded: TimeSpan,
    suspended_at: Option<TimeSpan>,
}

impl SceneClock {
    pub fn start(&mut self, now: TimeSpan) {
        self.start_stamp = now;
        self.excluded = TimeSpan::ZERO;
        self.suspended_at = None;
    }

    /// Stop the clock. Suspending an already suspended clock keeps the first stamp.
    pub fn suspend(&mut self, now: TimeSpan) {
        if self.suspended_at.is_none() {
            self.suspended_at = Some(now);
        }
    }

    /// Restart the clock, excluding the time spent suspended.
    pub fn resume(&mut self, now: TimeSpan) {
        if let Some(at) = self.suspended_at.take() {
            self.excluded += now - at;
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }

    /// Scene time. Holds still while suspended.
    pub fn scene_time(&self, now: TimeSpan) -> TimeSpan {
        self.suspended_at.unwrap_or(now) - self.start_stamp - self.excluded
    }

    pub fn excluded(&self) -> TimeSpan {
        self.excluded
    }
}

/// Everything about a scene that both the worker and loop handles touch.
#[derive(Default)]
pub struct Timeline {
    pub clock: SceneClock,
    pub callbacks: CallbackQueue,
    /// Movement and collision skipped; clock keeps running
    pub frozen: bool,
    /// Paused through the driver; clock suspended, nothing but rendering runs
    pub paused: bool,
}

impl Timeline {
    pub fn scene_time(&self, now: TimeSpan) -> TimeSpan {
        self.clock.scene_time(now)
    }
}
