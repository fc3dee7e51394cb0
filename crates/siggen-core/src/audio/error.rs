//! Errors raised while opening or streaming voice audio
//!
//! Lookup failures ([`AudioError::is_missing_device`]) abort startup. The
//! rest surface either while a stream is being opened or from inside a
//! voice thread, where they end that voice only.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// The host has no default device for this direction ("input"/"output")
    #[error("no default {0} device")]
    NoDefaultDevice(&'static str),

    /// No device name starts with the configured prefix
    #[error("no audio device matching '{0}'")]
    DeviceNotFound(String),

    /// Enumerating devices or their configurations failed
    #[error("audio host query failed: {0}")]
    Host(String),

    /// Device offers no f32 stream at the voice's sample rate
    #[error("{device} has no f32 stream at {rate} Hz")]
    NoF32Config { device: String, rate: u32 },

    /// Building or starting the stream failed
    #[error("cannot open stream on {device}: {message}")]
    Open { device: String, message: String },

    /// Reported by the backend while the stream was running
    #[error("stream failed: {0}")]
    Stream(String),

    /// Device stopped consuming (or producing) samples
    #[error("stream stalled for {0} ms")]
    Stalled(u64),
}

impl AudioError {
    /// True for lookup failures, which fold into a missing-device error
    pub fn is_missing_device(&self) -> bool {
        matches!(self, Self::NoDefaultDevice(_) | Self::DeviceNotFound(_))
    }
}

pub type AudioResult<T> = Result<T, AudioError>;
