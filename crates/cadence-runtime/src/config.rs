//! Loop configuration
//!
//! Loaded from TOML, with environment overrides applied on top:
//! - `CADENCE_UPDATES_PER_SECOND`
//! - `CADENCE_MAX_FRAME_SKIP`
//! - `CADENCE_MAX_FPS`

use cadence_core::{CadenceError, Result, TimeSpan};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Timing parameters of the game loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Fixed simulation rate
    pub updates_per_second: u32,
    /// Maximum catch-up ticks per frame
    pub max_frame_skip: u32,
    /// Render rate cap
    pub max_fps: u32,
    /// How long `stop_loop` waits for the worker
    pub shutdown_timeout_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            updates_per_second: 60,
            max_frame_skip: 5,
            max_fps: 60,
            shutdown_timeout_ms: 1000,
        }
    }
}

impl LoopConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LoopConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: LoopConfig = toml::from_str(&content).map_err(|e| {
            CadenceError::TomlParse(format!("Failed to parse config {}: {}", path.display(), e))
        })?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `CADENCE_*` overrides found through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        fn parse<T: std::str::FromStr>(key: &str, value: String) -> Result<T> {
            value.trim().parse().map_err(|_| {
                CadenceError::InvalidArgument(format!("{key}: not a valid number: {value}"))
            })
        }

        if let Some(v) = lookup("CADENCE_UPDATES_PER_SECOND") {
            self.updates_per_second = parse("CADENCE_UPDATES_PER_SECOND", v)?;
        }
        if let Some(v) = lookup("CADENCE_MAX_FRAME_SKIP") {
            self.max_frame_skip = parse("CADENCE_MAX_FRAME_SKIP", v)?;
        }
        if let Some(v) = lookup("CADENCE_MAX_FPS") {
            self.max_fps = parse("CADENCE_MAX_FPS", v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.updates_per_second == 0 {
            return Err(CadenceError::InvalidArgument(
                "updates_per_second must be greater than zero".into(),
            ));
        }
        if self.max_frame_skip == 0 {
            return Err(CadenceError::InvalidArgument(
                "max_frame_skip must be greater than zero".into(),
            ));
        }
        if self.max_fps == 0 {
            return Err(CadenceError::InvalidArgument(
                "max_fps must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> TimeSpan {
        TimeSpan::from_nanos(1_000_000_000 / i64::from(self.updates_per_second.max(1)))
    }

    pub fn frame_interval(&self) -> TimeSpan {
        TimeSpan::from_nanos(1_000_000_000 / i64::from(self.max_fps.max(1)))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}
