//! Mixer error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MixerError {
    /// Mixer device or element not present
    #[error("Mixer element {element} not found on {device}")]
    MissingDevice { device: String, element: String },

    #[error("Unknown mixer channel: {0}")]
    UnknownChannel(String),

    #[error("Mixer binding {0} already exists")]
    AlreadyBound(String),

    #[error("No mixer binding named {0}")]
    UnknownBinding(String),

    /// Backend call failed after binding
    #[error("Mixer hardware error on {element}: {message}")]
    Hardware { element: String, message: String },
}

pub type MixerResult<T> = Result<T, MixerError>;
