//! Voice engine: one dedicated thread per voice
//!
//! - [`Voice`]: orchestration-side handle (lifecycle, validated updates)
//! - [`RunSignal`]: play/quit wake primitive shared with the voice thread
//! - [`VoiceCommand`]: parameter updates carried over an SPSC queue
//! - [`render_chunk`]: what a waveform voice writes for one setting

mod command;
mod render;
mod signal;
mod voice;

pub use command::{command_channel, VoiceCommand, COMMAND_QUEUE_CAPACITY};
pub use render::{render_chunk, Renderer};
pub use signal::RunSignal;
pub use voice::{Voice, VoiceError, VoiceKind, VoiceResult, VoiceSpec, VoiceState};
