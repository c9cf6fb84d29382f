//! Cadence Audio - Sound effects keyed by game event
//!
//! - `SoundLibrary` - event name → sound, with play/loop/stop/volume/mute
//!   and pause-all bookkeeping
//! - `SoundClip` - backend trait for actual playback

mod library;

pub use library::{percent_to_db, LoopMode, Sound, SoundClip, SoundLibrary};
