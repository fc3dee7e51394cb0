//! Chunk rendering for waveform voices
//!
//! A chunk is the volume-scaled period buffer tiled to at least
//! `chunk_frames` samples, whole periods only. Each regeneration builds a new
//! buffer and replaces the old one by move, so a chunk handed to the device is
//! always built from a single (frequency, volume) pair.

use super::command::VoiceCommand;
use super::voice::VoiceKind;
use crate::waveform::{generate, WaveformKind};

/// Build the chunk a waveform voice emits for one parameter setting
pub fn render_chunk(
    kind: WaveformKind,
    frequency: f32,
    volume: f32,
    sample_rate: u32,
    chunk_frames: usize,
) -> Vec<f32> {
    let period = generate(kind, frequency, sample_rate);
    let repeats = chunk_frames.div_ceil(period.len()).max(1);
    period
        .iter()
        .cycle()
        .take(period.len() * repeats)
        .map(|s| s * volume)
        .collect()
}

/// Thread-side parameter state of one voice
#[derive(Debug)]
pub struct Renderer {
    kind: VoiceKind,
    sample_rate: u32,
    chunk_frames: usize,
    frequency: f32,
    volume: f32,
    chunk: Vec<f32>,
}

impl Renderer {
    pub fn new(
        kind: VoiceKind,
        sample_rate: u32,
        chunk_frames: usize,
        frequency: f32,
        volume: f32,
    ) -> Self {
        let mut renderer = Self {
            kind,
            sample_rate,
            chunk_frames,
            frequency,
            volume,
            chunk: Vec::new(),
        };
        renderer.regenerate();
        renderer
    }

    /// Apply one update; true if a parameter actually changed
    pub fn apply(&mut self, command: VoiceCommand) -> bool {
        match command {
            VoiceCommand::SetFrequency(freq) if freq != self.frequency => {
                self.frequency = freq;
                true
            }
            VoiceCommand::SetVolume(volume) if volume != self.volume => {
                self.volume = volume;
                true
            }
            _ => false,
        }
    }

    /// Rebuild the chunk from the current parameters and swap it in
    pub fn regenerate(&mut self) {
        if let VoiceKind::Waveform(kind) = self.kind {
            let next = render_chunk(
                kind,
                self.frequency,
                self.volume,
                self.sample_rate,
                self.chunk_frames,
            );
            self.chunk = next;
        }
    }

    /// Chunk to write next (empty for passthrough voices)
    pub fn chunk(&self) -> &[f32] {
        &self.chunk
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_is_whole_periods() {
        // 100 samples per period, tiled to cover 256 frames
        let chunk = render_chunk(WaveformKind::Sawtooth, 441.0, 1.0, 44100, 256);
        assert_eq!(chunk.len(), 300);
        assert_eq!(&chunk[..100], &chunk[100..200]);
        assert_eq!(&chunk[..100], &chunk[200..]);
    }

    #[test]
    fn test_long_period_is_not_truncated() {
        let chunk = render_chunk(WaveformKind::Sine, 27.5, 1.0, 44100, 256);
        assert_eq!(chunk.len(), 1603);
    }

    #[test]
    fn test_volume_scales_samples() {
        let full = render_chunk(WaveformKind::Square, 100.0, 1.0, 800, 8);
        let half = render_chunk(WaveformKind::Square, 100.0, 0.5, 800, 8);
        assert!(full.iter().zip(&half).all(|(f, h)| (f * 0.5 - h).abs() < 1e-7));
        let silent = render_chunk(WaveformKind::Square, 100.0, 0.0, 800, 8);
        assert!(silent.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_apply_reports_changes_only() {
        let mut renderer = Renderer::new(
            VoiceKind::Waveform(WaveformKind::Sine),
            44100,
            64,
            440.0,
            0.5,
        );
        assert!(!renderer.apply(VoiceCommand::SetFrequency(440.0)));
        assert!(renderer.apply(VoiceCommand::SetFrequency(220.0)));
        assert!(!renderer.apply(VoiceCommand::SetVolume(0.5)));
        assert!(renderer.apply(VoiceCommand::SetVolume(0.25)));

        renderer.regenerate();
        assert_eq!(
            renderer.chunk(),
            render_chunk(WaveformKind::Sine, 220.0, 0.25, 44100, 64).as_slice()
        );
    }

    #[test]
    fn test_passthrough_has_no_chunk() {
        let renderer = Renderer::new(VoiceKind::Passthrough, 44100, 64, 440.0, 1.0);
        assert!(renderer.chunk().is_empty());
    }
}
