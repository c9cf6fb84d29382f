//! Headless demo command
//!
//! Runs a two-scene loop (a blinking menu and a bouncing-ball arena) that
//! renders into a text buffer and prints it to stdout.

use anyhow::{Context, Result};
use cadence_audio::{Sound, SoundClip, SoundLibrary};
use cadence_core::logging::{init_logging, LoggingConfig};
use cadence_core::TimeSpan;
use cadence_runtime::input::{Key, KeyAction, Modifiers};
use cadence_runtime::{
    CallbackHandle, CollisionEvent, CollisionTest, Direction, GameLoop, Keyboard, LoopConfig,
    KeyBindings, LoopHandle, Map, MovementEvent, RenderEvent, RenderList, RenderSink, Scene,
    SceneBuilder,
};
use parking_lot::Mutex;
use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const ARENA_WIDTH: i32 = 40;
const ARENA_HEIGHT: i32 = 7;
const BALL_SPEED: f64 = 24.0;

pub struct DemoArgs {
    pub config: Option<PathBuf>,
    pub seconds: u64,
    pub log: Option<String>,
}

pub fn run(args: DemoArgs) -> Result<()> {
    init_logging(LoggingConfig {
        env_filter: args.log,
        ..LoggingConfig::default()
    });

    let config = match &args.config {
        Some(path) => LoopConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => LoopConfig::default(),
    };
    println!(
        "Running demo for {}s ({} updates/s, {} fps cap)",
        args.seconds, config.updates_per_second, config.max_fps
    );

    let every = (config.max_fps / 4).max(1) as u64;
    let mut game_loop = GameLoop::<String>::new(config, ConsoleSink::new(every))?;
    let handle = game_loop.handle();

    game_loop.add_input_device(Keyboard::new());
    let keyboard = game_loop.get_input_device::<Keyboard>()?;
    let feed = keyboard.lock().feed();

    let sounds = Arc::new(Mutex::new(SoundLibrary::new()));
    sounds
        .lock()
        .add_sound(Sound::new("bounce", LogClip::new("bounce", 80)));

    // the last scene added is the first one shown
    game_loop.add_scene("game", ArenaScene::new(handle.clone(), keyboard, sounds.clone()));
    game_loop.add_scene("menu", MenuScene::new(handle.clone()));

    game_loop.start_loop()?;

    // scripted player: toggle pause once while the arena is up
    let total = Duration::from_secs(args.seconds);
    let half = total / 2;
    thread::sleep(half);
    for released in [false, true] {
        if released {
            feed.key_up(Key::P, Modifiers::NONE);
        } else {
            feed.key_down(Key::P, Modifiers::NONE);
        }
        let handled = handle.dispatch_key(Key::P, Modifiers::NONE, released)?;
        log::debug!("P {} handled: {}", if released { "up" } else { "down" }, handled);
    }
    thread::sleep(Duration::from_millis(500).min(total - half));
    if handle.is_paused().unwrap_or(false) {
        handle.play()?;
        sounds.lock().unpause_all();
    }
    thread::sleep(total.saturating_sub(half + Duration::from_millis(500)));

    let last_scene = handle.active_scene();
    game_loop.stop_loop()?;

    println!();
    println!(
        "Stopped in scene '{}'",
        last_scene.as_deref().unwrap_or("<none>")
    );
    Ok(())
}

/// Prints every `every`-th frame.
struct ConsoleSink {
    buffer: String,
    frames: u64,
    every: u64,
}

impl ConsoleSink {
    fn new(every: u64) -> Self {
        Self {
            buffer: String::new(),
            frames: 0,
            every,
        }
    }
}

impl RenderSink<String> for ConsoleSink {
    fn load_scene(
        &mut self,
        scene: &str,
        list: &RenderList<String>,
        bindings: Arc<KeyBindings>,
    ) {
        log::info!(
            "showing '{}' ({} render events, {} key bindings)",
            scene,
            list.len(),
            bindings.len()
        );
    }

    fn render(&mut self, list: &RenderList<String>, interpolation: f64) -> cadence_core::Result<()> {
        self.buffer.clear();
        list.render_all(&mut self.buffer, interpolation)?;
        self.frames += 1;
        if self.frames % self.every == 0 {
            println!("{}", self.buffer);
        }
        Ok(())
    }
}

/// Sound backend that only logs.
struct LogClip {
    name: &'static str,
    length: Duration,
    active: bool,
}

impl LogClip {
    fn new(name: &'static str, millis: u64) -> Self {
        Self {
            name,
            length: Duration::from_millis(millis),
            active: false,
        }
    }
}

impl SoundClip for LogClip {
    fn start(&mut self) {
        self.active = true;
        log::debug!("sound '{}' playing", self.name);
    }

    fn stop(&mut self) {
        self.active = false;
    }

    fn rewind(&mut self) {}

    fn loop_clip(&mut self, _cycles: Option<u32>) {
        self.active = true;
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn length(&self) -> Duration {
        self.length
    }

    fn set_gain(&mut self, _db: f32) {}

    fn set_muted(&mut self, _muted: bool) {}
}

// ---------------------------------------------------------------------------
// Menu

struct Title;

impl RenderEvent<String> for Title {
    fn render(&self, surface: &mut String, _interpolation: f64) -> cadence_core::Result<()> {
        surface.push_str("=== CADENCE ===\n");
        Ok(())
    }
}

/// "press enter" prompt, visible every other quarter second.
#[derive(Default)]
struct Blink {
    visible: bool,
}

impl MovementEvent for Blink {
    fn on_move(&mut self, scene_time: TimeSpan) -> cadence_core::Result<()> {
        self.visible = (scene_time.as_millis() / 250) % 2 == 0;
        Ok(())
    }
}

impl RenderEvent<String> for Blink {
    fn render(&self, surface: &mut String, _interpolation: f64) -> cadence_core::Result<()> {
        if self.visible {
            surface.push_str("  press enter\n");
        }
        Ok(())
    }
}

struct MenuScene {
    handle: LoopHandle,
    advance: Option<CallbackHandle>,
}

impl MenuScene {
    fn new(handle: LoopHandle) -> Self {
        Self {
            handle,
            advance: None,
        }
    }
}

impl Scene<String> for MenuScene {
    fn on_start(&mut self, builder: &mut SceneBuilder<'_, String>) -> cadence_core::Result<()> {
        let blink = Arc::new(Mutex::new(Blink::default()));
        builder.add_movement_event(blink.clone());
        builder.add_render_event(blink, 1)?;
        builder.add_render_event(Title, 0)?;

        let handle = self.handle.clone();
        let to_game: KeyAction = Arc::new(move || handle.switch_scene("game"));
        builder.put_key_binding(Key::Enter, Modifiers::NONE, false, Some(to_game));

        let handle = self.handle.clone();
        self.advance = Some(builder.schedule_callback(
            move || -> cadence_core::Result<()> { handle.switch_scene("game") },
            TimeSpan::from_millis(1_500),
        ));
        Ok(())
    }

    fn on_resume(&mut self) -> cadence_core::Result<()> {
        if let Some(advance) = self.advance {
            if !self.handle.is_callback_queued(advance)? {
                self.handle.reschedule_callback(advance)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Arena

/// Marker the ball checks collisions against.
struct Wall;

struct Arena {
    width: i32,
    height: i32,
}

impl CollisionTest for Arena {
    fn check_any_collision(&self, x: i32, y: i32) -> bool {
        x <= 0 || y <= 0 || x >= self.width - 1 || y >= self.height - 1
    }

    fn check_collision(&self, x: i32, y: i32, object: &dyn Any) -> bool {
        object.is::<Wall>() && self.check_any_collision(x, y)
    }

    fn check_next_collision(&self, x: i32, y: i32, object: &dyn Any, direction: Direction) -> bool {
        let (x, y) = match direction {
            Direction::Up => (x, y - 1),
            Direction::Down => (x, y + 1),
            Direction::Left => (x - 1, y),
            Direction::Right => (x + 1, y),
        };
        self.check_collision(x, y, object)
    }
}

impl Map for Arena {
    fn collision_test(&self) -> &dyn CollisionTest {
        self
    }
}

struct Ball {
    x: f64,
    row: i32,
    heading: Direction,
    last_move: Option<TimeSpan>,
    sounds: Arc<Mutex<SoundLibrary>>,
}

impl Ball {
    fn new(sounds: Arc<Mutex<SoundLibrary>>) -> Self {
        Self {
            x: 1.0,
            row: ARENA_HEIGHT / 2,
            heading: Direction::Right,
            last_move: None,
            sounds,
        }
    }

    fn cell(&self) -> i32 {
        self.x.round() as i32
    }
}

impl CollisionEvent for Ball {
    fn detect_collision(&mut self, tester: &dyn CollisionTest) -> cadence_core::Result<()> {
        if tester.check_next_collision(self.cell(), self.row, &Wall, self.heading) {
            self.heading = self.heading.opposite();
            self.sounds.lock().play("bounce")?;
        }
        Ok(())
    }
}

impl MovementEvent for Ball {
    fn on_move(&mut self, scene_time: TimeSpan) -> cadence_core::Result<()> {
        // a frozen stretch is skipped, not caught up
        let elapsed = match self.last_move {
            Some(last) => (scene_time - last).as_secs_f64().min(0.1),
            None => 0.0,
        };
        self.last_move = Some(scene_time);

        let step = BALL_SPEED * elapsed;
        self.x += if self.heading == Direction::Right { step } else { -step };
        self.x = self.x.clamp(1.0, f64::from(ARENA_WIDTH - 2));
        Ok(())
    }
}

impl RenderEvent<String> for Ball {
    fn render(&self, surface: &mut String, _interpolation: f64) -> cadence_core::Result<()> {
        let cell = self.cell();
        for y in 0..ARENA_HEIGHT {
            for x in 0..ARENA_WIDTH {
                let edge_x = x == 0 || x == ARENA_WIDTH - 1;
                let edge_y = y == 0 || y == ARENA_HEIGHT - 1;
                surface.push(match (edge_x, edge_y) {
                    (true, true) => '+',
                    (false, true) => '-',
                    (true, false) => '|',
                    _ if x == cell && y == self.row => 'o',
                    _ => ' ',
                });
            }
            surface.push('\n');
        }
        Ok(())
    }
}

/// Status line: scene time, freeze/pause flags and held keys.
struct Hud {
    handle: LoopHandle,
    keyboard: Arc<Mutex<Keyboard>>,
}

impl RenderEvent<String> for Hud {
    fn render(&self, surface: &mut String, _interpolation: f64) -> cadence_core::Result<()> {
        let time = self.handle.scene_time()?;
        let mut status = format!("t={time}");
        if self.handle.is_frozen()? {
            status.push_str(" [frozen]");
        }
        if self.handle.is_paused()? {
            status.push_str(" [paused]");
        }
        let keys: Vec<String> = self
            .keyboard
            .lock()
            .pressed_keys()
            .into_iter()
            .map(|key| key.to_string())
            .collect();
        if !keys.is_empty() {
            status.push_str(&format!(" keys: {}", keys.join(",")));
        }
        surface.push_str(&status);
        surface.push('\n');
        Ok(())
    }
}

struct ArenaScene {
    handle: LoopHandle,
    keyboard: Arc<Mutex<Keyboard>>,
    sounds: Arc<Mutex<SoundLibrary>>,
    timers: Vec<CallbackHandle>,
}

impl ArenaScene {
    fn new(
        handle: LoopHandle,
        keyboard: Arc<Mutex<Keyboard>>,
        sounds: Arc<Mutex<SoundLibrary>>,
    ) -> Self {
        Self {
            handle,
            keyboard,
            sounds,
            timers: Vec::new(),
        }
    }
}

impl Scene<String> for ArenaScene {
    fn on_start(&mut self, builder: &mut SceneBuilder<'_, String>) -> cadence_core::Result<()> {
        builder.set_map(Arc::new(Arena {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
        }));

        let ball = Arc::new(Mutex::new(Ball::new(self.sounds.clone())));
        builder.add_collision_event(ball.clone());
        builder.add_movement_event(ball.clone());
        builder.add_render_event(ball, 1)?;
        builder.add_render_event(
            Hud {
                handle: self.handle.clone(),
                keyboard: self.keyboard.clone(),
            },
            0,
        )?;

        let (handle, sounds) = (self.handle.clone(), self.sounds.clone());
        let toggle: KeyAction = Arc::new(move || {
            if handle.is_paused()? {
                sounds.lock().unpause_all();
                handle.play()
            } else {
                sounds.lock().pause_all();
                handle.pause()
            }
        });
        builder.put_key_binding(Key::P, Modifiers::NONE, true, Some(toggle));

        let handle = self.handle.clone();
        self.timers.push(builder.schedule_callback(
            move || -> cadence_core::Result<()> { handle.freeze() },
            TimeSpan::from_seconds(1),
        ));
        let handle = self.handle.clone();
        self.timers.push(builder.schedule_callback(
            move || -> cadence_core::Result<()> { handle.unfreeze() },
            TimeSpan::from_millis(1_500),
        ));
        let handle = self.handle.clone();
        self.timers.push(builder.schedule_callback(
            move || -> cadence_core::Result<()> { handle.switch_scene("menu") },
            TimeSpan::from_seconds(3),
        ));
        Ok(())
    }

    fn on_resume(&mut self) -> cadence_core::Result<()> {
        for timer in &self.timers {
            if !self.handle.is_callback_queued(*timer)? {
                self.handle.reschedule_callback(*timer)?;
            }
        }
        Ok(())
    }

    fn on_stop(&mut self) -> cadence_core::Result<()> {
        for timer in self.timers.drain(..) {
            self.handle.release_callback(timer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> Arena {
        Arena {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
        }
    }

    fn ball() -> Ball {
        let sounds = Arc::new(Mutex::new(SoundLibrary::new()));
        sounds
            .lock()
            .add_sound(Sound::new("bounce", LogClip::new("bounce", 10)));
        Ball::new(sounds)
    }

    #[test]
    fn test_arena_walls() {
        let arena = arena();
        assert!(arena.check_any_collision(0, 3));
        assert!(arena.check_any_collision(ARENA_WIDTH - 1, 3));
        assert!(!arena.check_any_collision(5, 3));

        assert!(arena.check_collision(0, 3, &Wall));
        assert!(!arena.check_collision(0, 3, &"not a wall"));

        assert!(arena.check_next_collision(1, 3, &Wall, Direction::Left));
        assert!(!arena.check_next_collision(1, 3, &Wall, Direction::Right));
    }

    #[test]
    fn test_ball_bounces_off_wall() {
        let arena = arena();
        let mut ball = ball();
        ball.x = f64::from(ARENA_WIDTH - 2);

        ball.detect_collision(&arena).unwrap();
        assert_eq!(ball.heading, Direction::Left);
        assert!(ball.sounds.lock().contains("bounce"));

        ball.detect_collision(&arena).unwrap();
        assert_eq!(ball.heading, Direction::Left);
    }

    #[test]
    fn test_ball_moves_with_scene_time() {
        let mut ball = ball();
        ball.on_move(TimeSpan::ZERO).unwrap();
        assert_eq!(ball.x, 1.0);

        ball.on_move(TimeSpan::from_millis(50)).unwrap();
        assert!((ball.x - (1.0 + BALL_SPEED * 0.05)).abs() < 1e-9);

        // long gaps are capped
        let before = ball.x;
        ball.on_move(TimeSpan::from_seconds(10)).unwrap();
        assert!((ball.x - (before + BALL_SPEED * 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_blink_toggles_every_quarter_second() {
        let mut blink = Blink::default();
        blink.on_move(TimeSpan::from_millis(100)).unwrap();
        assert!(blink.visible);
        blink.on_move(TimeSpan::from_millis(300)).unwrap();
        assert!(!blink.visible);

        let mut surface = String::new();
        blink.render(&mut surface, 0.0).unwrap();
        assert!(surface.is_empty());
    }

    #[test]
    fn test_ball_render_draws_frame() {
        let ball = ball();
        let mut surface = String::new();
        ball.render(&mut surface, 0.0).unwrap();

        let lines: Vec<&str> = surface.lines().collect();
        assert_eq!(lines.len(), ARENA_HEIGHT as usize);
        assert!(lines[0].starts_with('+'));
        assert_eq!(lines[(ARENA_HEIGHT / 2) as usize].chars().nth(1), Some('o'));
    }
}
