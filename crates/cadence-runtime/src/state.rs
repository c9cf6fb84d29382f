//! Scene lifecycle states.
//!
//! ```text
//! Pending --start--> Playing <--pause/resume--> Paused
//!    \                  |                          |
//!     +----------------stop------------------------+--> Stopped (terminal)
//! ```

use std::fmt;

/// Lifecycle state of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SceneState {
    /// Registered but never activated. The builder only works here.
    #[default]
    Pending,
    /// Active.
    Playing,
    /// Switched away from (or paused through the driver); may come back.
    Paused,
    /// Shut down. Never left again.
    Stopped,
}

impl SceneState {
    /// Has the scene left `Pending` at some point?
    pub fn was_started(self) -> bool {
        !matches!(self, SceneState::Pending)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SceneState::Stopped)
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    pub fn can_transition(self, next: SceneState) -> bool {
        use SceneState::*;
        match (self, next) {
            (Stopped, _) => false,
            (_, Stopped) => true,
            (Pending, Playing) => true,
            (Playing, Paused) | (Paused, Playing) => true,
            // resuming an already active scene is idempotent
            (Playing, Playing) | (Paused, Paused) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SceneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SceneState::Pending => "pending",
            SceneState::Playing => "playing",
            SceneState::Paused => "paused",
            SceneState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pending() {
        assert_eq!(SceneState::default(), SceneState::Pending);
        assert!(!SceneState::Pending.was_started());
        assert!(SceneState::Paused.was_started());
    }

    #[test]
    fn test_stopped_is_terminal() {
        for next in [
            SceneState::Pending,
            SceneState::Playing,
            SceneState::Paused,
            SceneState::Stopped,
        ] {
            assert!(!SceneState::Stopped.can_transition(next));
        }
    }

    #[test]
    fn test_pending_only_starts_or_stops() {
        assert!(SceneState::Pending.can_transition(SceneState::Playing));
        assert!(SceneState::Pending.can_transition(SceneState::Stopped));
        assert!(!SceneState::Pending.can_transition(SceneState::Paused));
    }

    #[test]
    fn test_play_pause_cycle() {
        assert!(SceneState::Playing.can_transition(SceneState::Paused));
        assert!(SceneState::Paused.can_transition(SceneState::Playing));
        assert!(!SceneState::Playing.can_transition(SceneState::Pending));
    }

    #[test]
    fn test_display() {
        assert_eq!(SceneState::Playing.to_string(), "playing");
    }
}
