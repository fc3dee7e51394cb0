//! Mixer bridge: control values → hardware gain elements
//!
//! ```text
//! ControlDispatcher ──value 0-127──► MixerBridge ──scaled gain──► GainElement
//!                                    (by tag)                     (ALSA / memory)
//! ```
//!
//! Channels are bound by tag (`device.element.channel.out|in`) during init.
//! The bridge runs on the orchestration thread only.

mod alsa_backend;
mod backend;
mod bridge;
mod error;

pub use alsa_backend::AlsaMixer;
pub use backend::{GainElement, MemoryMixer, MixerBackend, MixerChannelId};
pub use bridge::{mixer_tag, scale_control_value, MixerBridge, MixerChannel};
pub use error::{MixerError, MixerResult};
