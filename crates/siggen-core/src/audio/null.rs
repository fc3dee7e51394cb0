//! Device stand-ins that never touch hardware
//!
//! `NullSink` discards samples. Unpaced it returns immediately (tests);
//! paced it sleeps for the real-time duration of each write, so a voice loop
//! on top of it runs at the same rate it would against a sound card.

use std::thread;
use std::time::Duration;

use super::error::AudioResult;
use super::sink::{AudioProvider, AudioSink, AudioSource, StreamSpec};

#[derive(Debug, Default)]
pub struct NullSink {
    sample_rate: Option<u32>,
    samples_written: u64,
}

impl NullSink {
    /// Sink that never blocks
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that blocks for as long as the samples would take to play
    pub fn paced(sample_rate: u32) -> Self {
        Self {
            sample_rate: Some(sample_rate.max(1)),
            samples_written: 0,
        }
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }
}

impl AudioSink for NullSink {
    fn start(&mut self) -> AudioResult<()> {
        Ok(())
    }

    fn write(&mut self, samples: &[f32]) -> AudioResult<()> {
        self.samples_written += samples.len() as u64;
        if let Some(rate) = self.sample_rate {
            thread::sleep(Duration::from_secs_f64(samples.len() as f64 / rate as f64));
        }
        Ok(())
    }

    fn stop(&mut self) -> AudioResult<()> {
        Ok(())
    }
}

/// Input that always delivers silence
#[derive(Debug, Default)]
pub struct SilentSource;

impl AudioSource for SilentSource {
    fn start(&mut self) -> AudioResult<()> {
        Ok(())
    }

    fn read(&mut self, buf: &mut [f32]) -> AudioResult<()> {
        buf.fill(0.0);
        Ok(())
    }

    fn stop(&mut self) -> AudioResult<()> {
        Ok(())
    }
}

/// Provider handing out paced null sinks, for running without audio hardware
#[derive(Debug, Default)]
pub struct NullProvider;

impl AudioProvider for NullProvider {
    fn open_output(
        &mut self,
        device: Option<&str>,
        spec: &StreamSpec,
    ) -> AudioResult<Box<dyn AudioSink>> {
        log::debug!(
            "null audio: output {:?} at {}Hz",
            device.unwrap_or("default"),
            spec.sample_rate
        );
        Ok(Box::new(NullSink::paced(spec.sample_rate)))
    }

    fn open_input(
        &mut self,
        _device: Option<&str>,
        _spec: &StreamSpec,
    ) -> AudioResult<Box<dyn AudioSource>> {
        Ok(Box::new(SilentSource))
    }
}
