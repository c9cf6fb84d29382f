//! Error types for Cadence

use thiserror::Error;

/// The main error type for Cadence operations
#[derive(Debug, Error)]
pub enum CadenceError {
    #[error("Scene not found: {0}")]
    SceneNotFound(String),

    #[error("Input device not found: {0}")]
    InputDeviceNotFound(String),

    #[error("Sound not found: {0}")]
    SoundNotFound(String),

    #[error("Scheduled callback not found (released or never scheduled)")]
    CallbackNotFound,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),
}

impl CadenceError {
    /// True for the "unknown identifier" family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CadenceError::SceneNotFound(_)
                | CadenceError::InputDeviceNotFound(_)
                | CadenceError::SoundNotFound(_)
                | CadenceError::CallbackNotFound
        )
    }
}

/// Result type alias for Cadence operations
pub type Result<T> = std::result::Result<T, CadenceError>;

impl From<toml::de::Error> for CadenceError {
    fn from(err: toml::de::Error) -> Self {
        CadenceError::TomlParse(err.to_string())
    }
}

impl From<toml::ser::Error> for CadenceError {
    fn from(err: toml::ser::Error) -> Self {
        CadenceError::TomlSer(err.to_string())
    }
}
