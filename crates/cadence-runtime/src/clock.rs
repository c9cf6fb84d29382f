//! Fixed-timestep pacing for the loop worker

use crate::config::LoopConfig;
use cadence_core::TimeSpan;

/// Tick deadlines, frame-skip cap and render throttle for one loop.
///
/// Ticks run on a fixed grid of deadlines spaced `tick` apart. Each outer
/// iteration (frame) may run at most `max_skip` ticks to catch up; whatever
/// is still owed is carried into the next frame.
#[derive(Debug, Clone)]
pub struct FixedStep {
    /// Fixed tick duration (1 / updates per second)
    pub tick: TimeSpan,
    /// Minimum spacing between frame starts (1 / max fps)
    pub frame: TimeSpan,
    /// Maximum ticks per frame
    pub max_skip: u32,
    next_tick: TimeSpan,
    frame_started: Option<TimeSpan>,
    ticks_this_frame: u32,
}

impl FixedStep {
    pub fn new(tick: TimeSpan, frame: TimeSpan, max_skip: u32) -> Self {
        Self {
            tick,
            frame,
            max_skip,
            next_tick: TimeSpan::ZERO,
            frame_started: None,
            ticks_this_frame: 0,
        }
    }

    pub fn from_config(config: &LoopConfig) -> Self {
        Self::new(config.tick_interval(), config.frame_interval(), config.max_frame_skip)
    }

    /// Start pacing at `now`. The first tick is due immediately.
    pub fn reset(&mut self, now: TimeSpan) {
        self.next_tick = now;
        self.frame_started = None;
        self.ticks_this_frame = 0;
    }

    /// How long to sleep before the next frame may begin.
    pub fn frame_wait(&self, now: TimeSpan) -> TimeSpan {
        match self.frame_started {
            Some(started) => {
                let wait = started + self.frame - now;
                if wait.is_negative() {
                    TimeSpan::ZERO
                } else {
                    wait
                }
            }
            None => TimeSpan::ZERO,
        }
    }

    pub fn begin_frame(&mut self, now: TimeSpan) {
        self.frame_started = Some(now);
        self.ticks_this_frame = 0;
    }

    /// Is a tick owed, and is there room left under the skip cap?
    pub fn should_tick(&self, now: TimeSpan) -> bool {
        !now.is_less_than(self.next_tick) && self.ticks_this_frame < self.max_skip
    }

    /// Advance the deadline by one tick.
    pub fn consume_tick(&mut self) {
        self.next_tick += self.tick;
        self.ticks_this_frame += 1;
    }

    pub fn ticks_this_frame(&self) -> u32 {
        self.ticks_this_frame
    }

    /// Still owing ticks after this frame's catch-up?
    pub fn is_behind(&self, now: TimeSpan) -> bool {
        !now.is_less_than(self.next_tick)
    }

    pub fn next_tick(&self) -> TimeSpan {
        self.next_tick
    }

    /// Progress from the last completed tick towards the next, in `[0, 1)`.
    pub fn interpolation(&self, now: TimeSpan) -> f64 {
        let tick = self.tick.as_secs_f64();
        if tick <= 0.0 {
            return 0.0;
        }
        let progress = (now + self.tick - self.next_tick).as_secs_f64() / tick;
        progress.clamp(0.0, 1.0 - f64::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: i64) -> TimeSpan {
        TimeSpan::from_millis(n)
    }

    fn pacer() -> FixedStep {
        FixedStep::new(ms(10), ms(20), 5)
    }

    #[test]
    fn test_first_tick_due_immediately() {
        let mut step = pacer();
        step.reset(ms(1_000));
        step.begin_frame(ms(1_000));
        assert!(step.should_tick(ms(1_000)));
        step.consume_tick();
        assert!(!step.should_tick(ms(1_005)));
        assert!(step.should_tick(ms(1_010)));
    }

    #[test]
    fn test_skip_cap_bounds_catch_up() {
        let mut step = pacer();
        step.reset(TimeSpan::ZERO);
        step.begin_frame(ms(10_000));

        while step.should_tick(ms(10_000)) {
            step.consume_tick();
        }
        assert_eq!(step.ticks_this_frame(), 5);
        assert!(step.is_behind(ms(10_000)));

        // the debt carries over, still capped per frame
        step.begin_frame(ms(10_001));
        while step.should_tick(ms(10_001)) {
            step.consume_tick();
        }
        assert_eq!(step.ticks_this_frame(), 5);
        assert_eq!(step.next_tick(), ms(100));
    }

    #[test]
    fn test_frame_wait_throttles() {
        let mut step = pacer();
        step.reset(TimeSpan::ZERO);
        assert_eq!(step.frame_wait(TimeSpan::ZERO), TimeSpan::ZERO);

        step.begin_frame(ms(100));
        assert_eq!(step.frame_wait(ms(105)), ms(15));
        assert_eq!(step.frame_wait(ms(130)), TimeSpan::ZERO);
    }

    #[test]
    fn test_interpolation() {
        let mut step = pacer();
        step.reset(TimeSpan::ZERO);
        step.begin_frame(TimeSpan::ZERO);
        step.consume_tick();

        assert!((step.interpolation(TimeSpan::ZERO) - 0.0).abs() < 1e-9);
        assert!((step.interpolation(ms(5)) - 0.5).abs() < 1e-9);
        // clamped below one when behind
        let behind = step.interpolation(ms(50));
        assert!(behind < 1.0);
        assert!(behind > 0.99);
    }
}
