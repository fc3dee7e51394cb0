//! Stream traits shared by every audio backend

use super::error::AudioResult;

/// Parameters for opening a mono stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Frames the voice writes (or reads) per loop iteration
    pub chunk_frames: usize,
}

impl StreamSpec {
    pub fn new(sample_rate: u32, chunk_frames: usize) -> Self {
        Self {
            sample_rate,
            chunk_frames: chunk_frames.max(1),
        }
    }
}

/// Mono output stream owned by exactly one voice
pub trait AudioSink: Send {
    /// Begin consuming samples
    fn start(&mut self) -> AudioResult<()>;

    /// Write every sample, blocking until the device has room for them
    fn write(&mut self, samples: &[f32]) -> AudioResult<()>;

    /// Stop consuming samples; the device plays silence meanwhile
    fn stop(&mut self) -> AudioResult<()>;
}

/// Mono input stream (used by passthrough voices)
pub trait AudioSource: Send {
    fn start(&mut self) -> AudioResult<()>;

    /// Fill `buf` completely, blocking until enough input has arrived
    fn read(&mut self, buf: &mut [f32]) -> AudioResult<()>;

    fn stop(&mut self) -> AudioResult<()>;
}

impl<T: AudioSink + ?Sized> AudioSink for Box<T> {
    fn start(&mut self) -> AudioResult<()> {
        (**self).start()
    }

    fn write(&mut self, samples: &[f32]) -> AudioResult<()> {
        (**self).write(samples)
    }

    fn stop(&mut self) -> AudioResult<()> {
        (**self).stop()
    }
}

impl<T: AudioSource + ?Sized> AudioSource for Box<T> {
    fn start(&mut self) -> AudioResult<()> {
        (**self).start()
    }

    fn read(&mut self, buf: &mut [f32]) -> AudioResult<()> {
        (**self).read(buf)
    }

    fn stop(&mut self) -> AudioResult<()> {
        (**self).stop()
    }
}

/// Opens streams during the init phase
///
/// Implementations keep whatever must stay on the orchestration thread
/// (e.g. CPAL stream handles) alive until they are dropped.
pub trait AudioProvider {
    /// Open an output stream; `device` is a case-insensitive name prefix,
    /// `None` selects the system default
    fn open_output(
        &mut self,
        device: Option<&str>,
        spec: &StreamSpec,
    ) -> AudioResult<Box<dyn AudioSink>>;

    fn open_input(
        &mut self,
        device: Option<&str>,
        spec: &StreamSpec,
    ) -> AudioResult<Box<dyn AudioSource>>;
}
