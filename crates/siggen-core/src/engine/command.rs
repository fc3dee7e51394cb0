//! Lock-free parameter updates for voice threads
//!
//! The orchestration thread pushes [`VoiceCommand`]s into an `rtrb` ring and
//! the voice thread drains it between chunks:
//!
//! - **Wait-free**: push and pop are O(1) and never block, so neither the
//!   control poll loop nor the audio loop can stall on the other
//! - **No allocations** after startup: the ring is sized once per voice
//! - **Single-producer single-consumer**: one voice handle, one voice thread

/// Default number of pending updates a voice can hold
pub const COMMAND_QUEUE_CAPACITY: usize = 64;

/// Parameter update sent to a voice thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceCommand {
    /// New frequency in Hz (validated > 0)
    SetFrequency(f32),
    /// New normalized gain (validated within [0, 1])
    SetVolume(f32),
}

/// Create the producer/consumer pair for one voice
pub fn command_channel(
    capacity: usize,
) -> (rtrb::Producer<VoiceCommand>, rtrb::Consumer<VoiceCommand>) {
    rtrb::RingBuffer::new(capacity.max(1))
}
