//! Configuration error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Cannot read config file {path:?}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Malformed config: {0}")]
    Parse(String),

    #[error("Config defines no voices")]
    NoVoices,

    #[error("Voice #{0} has no name")]
    UnnamedVoice(usize),

    #[error("Duplicate voice name: {0}")]
    DuplicateVoice(String),

    #[error("Invalid sample rate {rate} for {context}")]
    InvalidSampleRate { context: String, rate: u32 },

    #[error("Voice {voice}: frequency {value} must be positive and finite")]
    InvalidFrequency { voice: String, value: f32 },

    #[error("Voice {voice}: volume {value} must be within [0, 1]")]
    InvalidVolume { voice: String, value: f32 },

    #[error("chunk_frames must be at least 1")]
    InvalidChunkFrames,
}

pub type ConfigResult<T> = Result<T, ConfigError>;
