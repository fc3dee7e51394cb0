//! Single-period waveform generation
//!
//! `generate` is a pure function: one full cycle of the requested shape,
//! `floor(sample_rate / frequency)` samples long, values in [-1, 1]. Volume
//! scaling happens downstream in the voice.
//!
//! Frequencies too high for the sample rate would give a period shorter than
//! [`MIN_PERIOD_LEN`] samples. Those are clamped to `MIN_PERIOD_LEN`, which
//! yields the Nyquist-rate version of the shape (e.g. `[1, -1]` for a square).
//!
//! The phase of sample `n` is `n / len`, so the buffer always closes exactly
//! one cycle and loops without a discontinuity.

use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Shortest period buffer `generate` will ever return
pub const MIN_PERIOD_LEN: usize = 2;

/// Closed set of periodic waveform shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaveformKind {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl WaveformKind {
    pub const ALL: [WaveformKind; 4] = [
        WaveformKind::Sine,
        WaveformKind::Square,
        WaveformKind::Triangle,
        WaveformKind::Sawtooth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Square => "square",
            Self::Triangle => "triangle",
            Self::Sawtooth => "sawtooth",
        }
    }

    /// Value of the shape at `phase` ∈ [0, 1)
    fn sample_at(&self, phase: f32) -> f32 {
        match self {
            Self::Sine => (TAU * phase).sin(),
            Self::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            // Rises -1 → 1 over the first half, falls back over the second
            Self::Triangle => {
                if phase < 0.5 {
                    -1.0 + 4.0 * phase
                } else {
                    3.0 - 4.0 * phase
                }
            }
            Self::Sawtooth => -1.0 + 2.0 * phase,
        }
    }
}

impl fmt::Display for WaveformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for unknown waveform names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown waveform kind: {0}")]
pub struct UnknownWaveform(pub String);

impl FromStr for WaveformKind {
    type Err = UnknownWaveform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| UnknownWaveform(s.to_string()))
    }
}

/// Number of samples in one period at `frequency` Hz, after clamping
///
/// `frequency` must be positive and finite; callers validate before this point.
pub fn period_len(frequency: f32, sample_rate: u32) -> usize {
    let len = (sample_rate as f64 / frequency as f64).floor();
    if len.is_finite() && len >= MIN_PERIOD_LEN as f64 {
        len as usize
    } else {
        MIN_PERIOD_LEN
    }
}

/// Generate one period of `kind` at `frequency` Hz for `sample_rate`
pub fn generate(kind: WaveformKind, frequency: f32, sample_rate: u32) -> Vec<f32> {
    let len = period_len(frequency, sample_rate);
    (0..len)
        .map(|n| kind.sample_at(n as f32 / len as f32))
        .collect()
}
