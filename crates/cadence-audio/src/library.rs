//! Sound library keyed by event name
//!
//! Playback itself is delegated to a [`SoundClip`] backend; the library only
//! tracks loop state, volume and pause bookkeeping.

use cadence_core::{CadenceError, Result};
use std::collections::HashMap;
use std::time::Duration;

/// A loaded, playable clip. Implemented by the audio backend.
pub trait SoundClip: Send {
    fn start(&mut self);

    fn stop(&mut self);

    /// Seek back to the first frame.
    fn rewind(&mut self);

    /// Loop the clip `cycles` more times, or forever with `None`.
    fn loop_clip(&mut self, cycles: Option<u32>);

    /// Is the clip currently playing?
    fn is_active(&self) -> bool;

    fn length(&self) -> Duration;

    /// Master gain in decibels.
    fn set_gain(&mut self, db: f32);

    fn set_muted(&mut self, muted: bool);
}

/// How a sound is currently repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Once,
    Cycles(u32),
    Forever,
}

/// A clip registered under an event name (e.g. "pickup", "death").
pub struct Sound {
    event: String,
    clip: Box<dyn SoundClip>,
    loop_mode: LoopMode,
}

impl Sound {
    pub fn new(event: impl Into<String>, clip: impl SoundClip + 'static) -> Self {
        Self {
            event: event.into(),
            clip: Box::new(clip),
            loop_mode: LoopMode::Once,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }
}

/// Convert a volume fraction to decibels (-60 dB is treated as silence).
pub fn percent_to_db(percent: f32) -> f32 {
    if percent <= 0.0 {
        -60.0
    } else {
        (20.0 * percent.log10()).max(-60.0)
    }
}

/// Sounds keyed by event name.
#[derive(Default)]
pub struct SoundLibrary {
    sounds: HashMap<String, Sound>,
    /// Sounds stopped by `pause_all` and how they were looping
    paused: HashMap<String, LoopMode>,
}

impl SoundLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sound, replacing any sound for the same event.
    pub fn add_sound(&mut self, sound: Sound) {
        log::debug!("sound '{}' added", sound.event);
        self.sounds.insert(sound.event.clone(), sound);
    }

    pub fn contains(&self, event: &str) -> bool {
        self.sounds.contains_key(event)
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }

    pub fn loop_mode(&self, event: &str) -> Result<LoopMode> {
        Ok(self.sound(event)?.loop_mode)
    }

    fn sound(&self, event: &str) -> Result<&Sound> {
        self.sounds
            .get(event)
            .ok_or_else(|| CadenceError::SoundNotFound(event.to_string()))
    }

    fn sound_mut(&mut self, event: &str) -> Result<&mut Sound> {
        self.sounds
            .get_mut(event)
            .ok_or_else(|| CadenceError::SoundNotFound(event.to_string()))
    }

    /// Play from the beginning, restarting if already playing. Returns the
    /// clip length.
    pub fn play(&mut self, event: &str) -> Result<Duration> {
        let sound = self.sound_mut(event)?;
        sound.clip.stop();
        sound.clip.rewind();
        sound.clip.start();
        Ok(sound.clip.length())
    }

    /// Loop `cycles` times, or forever for 0. Ignored while the sound is
    /// already looping.
    pub fn loop_sound(&mut self, event: &str, cycles: u32) -> Result<()> {
        let sound = self.sound_mut(event)?;
        if sound.loop_mode != LoopMode::Once {
            return Ok(());
        }
        if cycles == 0 {
            sound.clip.loop_clip(None);
            sound.loop_mode = LoopMode::Forever;
        } else {
            sound.clip.loop_clip(Some(cycles));
            sound.loop_mode = LoopMode::Cycles(cycles);
        }
        Ok(())
    }

    /// Stop and rewind. Ends any looping.
    pub fn stop(&mut self, event: &str) -> Result<()> {
        let sound = self.sound_mut(event)?;
        sound.loop_mode = LoopMode::Once;
        sound.clip.stop();
        sound.clip.rewind();
        Ok(())
    }

    /// Set the volume as a fraction in `[0.0, 1.0]`.
    pub fn set_volume(&mut self, event: &str, percent: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&percent) {
            return Err(CadenceError::InvalidArgument(format!(
                "{percent} is not a valid volume fraction"
            )));
        }
        let sound = self.sound_mut(event)?;
        sound.clip.set_gain(percent_to_db(percent));
        Ok(())
    }

    pub fn mute(&mut self, event: &str, muted: bool) -> Result<()> {
        self.sound_mut(event)?.clip.set_muted(muted);
        Ok(())
    }

    /// Stop every playing sound, remembering how it was looping.
    pub fn pause_all(&mut self) {
        self.paused.clear();
        for sound in self.sounds.values_mut() {
            if sound.clip.is_active() {
                sound.clip.stop();
                self.paused.insert(sound.event.clone(), sound.loop_mode);
            }
        }
        log::debug!("paused {} sounds", self.paused.len());
    }

    /// Continue every sound stopped by the last `pause_all`.
    pub fn unpause_all(&mut self) {
        for (event, mode) in self.paused.drain() {
            let Some(sound) = self.sounds.get_mut(&event) else {
                continue;
            };
            match mode {
                LoopMode::Once => sound.clip.start(),
                LoopMode::Cycles(n) => sound.clip.loop_clip(Some(n)),
                LoopMode::Forever => sound.clip.loop_clip(None),
            }
        }
    }
}
