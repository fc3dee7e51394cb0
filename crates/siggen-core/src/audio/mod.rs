//! Audio device adapters
//!
//! Voices talk to audio hardware through two small traits:
//!
//! - [`AudioSink`]: `start` / blocking `write` / `stop` on a mono output stream
//! - [`AudioSource`]: `start` / blocking `read` / `stop` on a mono input stream
//!
//! The blocking write is the only place a voice thread ever waits, which makes
//! it the voice's real-time pacing. CPAL itself is callback driven, so the CPAL
//! adapter puts a lock-free ring between the voice thread (producer) and the
//! device callback (consumer) and blocks the producer while the ring is full.
//!
//! ```text
//! Voice thread ──write()──► rtrb ring (SPSC) ──pop()──► CPAL callback ──► device
//! ```
//!
//! CPAL streams are `!Send`, so they stay with the [`AudioProvider`] on the
//! orchestration thread; only the ring halves travel to the voice threads.

mod cpal_backend;
mod device;
mod error;
mod null;
mod sink;

pub use cpal_backend::CpalProvider;
pub use device::{find_input_device, find_output_device, list_devices, DeviceInfo, DeviceList};
pub use error::{AudioError, AudioResult};
pub use null::{NullProvider, NullSink, SilentSource};
pub use sink::{AudioProvider, AudioSink, AudioSource, StreamSpec};
