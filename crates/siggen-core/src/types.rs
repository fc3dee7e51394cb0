//! Shared types and constants

/// Numeric identifier of one control-surface element (knob, fader, button)
pub type ControlId = u32;

/// Raw control value as sent by the control surface (0-127)
pub type ControlValue = u8;

/// Largest value a control element can send
pub const CONTROL_MAX: ControlValue = 127;

/// Default sample rate for voices that don't override it
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default minimum chunk length written to the device per loop iteration (frames)
pub const DEFAULT_CHUNK_FRAMES: usize = 256;

/// Middle C, the frequency every voice starts at unless configured otherwise
pub const FREQ_C4: f32 = 261.626;

/// Inclusive bounds of the normalized voice gain
pub const VOLUME_MIN: f32 = 0.0;
pub const VOLUME_MAX: f32 = 1.0;
