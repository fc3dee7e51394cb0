//! Siggen Core - voice engine and control plumbing for the siggen synthesizer
//!
//! # Architecture
//!
//! ```text
//! control source ─poll─► Rig (orchestration thread) ─► ControlDispatcher
//!                                                        │        │
//!                                    rtrb SPSC queue ◄───┘        └──► MixerBridge ──► ALSA element
//!                                          │
//!                                          ▼
//!                              Voice thread (one per voice)
//!                         drain updates → regenerate → write chunk
//!                                          │ (blocking write = pacing)
//!                                          ▼
//!                                  AudioSink (cpal ring)
//! ```
//!
//! Everything that touches the dispatcher or the mixer runs on the single
//! orchestration thread, so none of it is locked. Voices own their output
//! stream and their period buffer exclusively.

pub mod audio;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod mixer;
pub mod music;
pub mod rig;
pub mod shutdown;
pub mod types;
pub mod waveform;

pub use error::{SiggenError, SiggenResult};
pub use types::*;
