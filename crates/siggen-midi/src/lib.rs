//! Siggen MIDI - control-surface input for the siggen synthesizer
//!
//! Control Change messages from a MIDI input port become
//! [`ControlEvent`](siggen_core::control::ControlEvent)s:
//!
//! ```text
//! midir callback (driver thread) ──parse CC──► flume channel ──try_iter()──► poll loop
//! ```
//!
//! The control id of an event is the CC number; the MIDI channel is ignored,
//! so a surface sending on several channels still maps onto one id space.

pub mod connection;
pub mod input;
pub mod retry;

pub use connection::{find_input_port, list_input_ports, MidiConnectionError, MidiResult};
pub use input::{MidiControlSource, MidiInputEvent};
pub use retry::{connect_with_retry, retry_with_backoff, Backoff};
