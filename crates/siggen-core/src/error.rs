//! Crate-level error taxonomy
//!
//! Init-time errors (`Config`, `MissingDevice`, `AlreadyBound`) abort startup
//! before any voice streams. Runtime errors (`DeviceIo`, `Voice`, `Mixer`) are
//! scoped to the voice or mixer operation that raised them.
//!
//! Module errors fold into this taxonomy: a missing audio or mixer device
//! becomes `MissingDevice`, a failed stream read/write becomes `DeviceIo`.

use thiserror::Error;

use crate::audio::AudioError;
use crate::config::ConfigError;
use crate::dispatch::DispatchError;
use crate::engine::VoiceError;
use crate::mixer::MixerError;

#[derive(Error, Debug)]
pub enum SiggenError {
    /// Malformed or missing configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Named audio, control or mixer device not present
    #[error("Device not found: {0}")]
    MissingDevice(String),

    /// Duplicate control-id registration
    #[error("Control {0} is already bound")]
    AlreadyBound(crate::ControlId),

    /// Streaming read/write failure
    #[error("Device I/O error: {0}")]
    DeviceIo(String),

    #[error("Voice error: {0}")]
    Voice(VoiceError),

    #[error("Mixer error: {0}")]
    Mixer(MixerError),
}

impl From<DispatchError> for SiggenError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::AlreadyBound(id) => SiggenError::AlreadyBound(id),
        }
    }
}

impl From<AudioError> for SiggenError {
    fn from(err: AudioError) -> Self {
        if err.is_missing_device() {
            SiggenError::MissingDevice(err.to_string())
        } else {
            SiggenError::DeviceIo(err.to_string())
        }
    }
}

impl From<VoiceError> for SiggenError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::Device { voice, source } => {
                SiggenError::DeviceIo(format!("voice {}: {}", voice, source))
            }
            other => SiggenError::Voice(other),
        }
    }
}

impl From<MixerError> for SiggenError {
    fn from(err: MixerError) -> Self {
        match err {
            MixerError::MissingDevice { device, element } => {
                SiggenError::MissingDevice(format!("mixer element {} on {}", element, device))
            }
            other => SiggenError::Mixer(other),
        }
    }
}

pub type SiggenResult<T> = Result<T, SiggenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_devices_fold_together() {
        let audio: SiggenError = AudioError::DeviceNotFound("USB".to_string()).into();
        assert!(matches!(audio, SiggenError::MissingDevice(_)));

        let mixer: SiggenError = MixerError::MissingDevice {
            device: "hw:1".to_string(),
            element: "PCM".to_string(),
        }
        .into();
        assert!(matches!(mixer, SiggenError::MissingDevice(_)));
    }

    #[test]
    fn test_stream_failures_are_device_io() {
        let err: SiggenError = VoiceError::Device {
            voice: "sine".to_string(),
            source: AudioError::Stalled(2000),
        }
        .into();
        assert!(matches!(err, SiggenError::DeviceIo(_)));

        let err: SiggenError = VoiceError::InvalidVolume(3.0).into();
        assert!(matches!(err, SiggenError::Voice(_)));
    }

    #[test]
    fn test_duplicate_binding() {
        let err: SiggenError = DispatchError::AlreadyBound(12).into();
        assert!(matches!(err, SiggenError::AlreadyBound(12)));
    }
}
