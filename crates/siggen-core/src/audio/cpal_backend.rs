//! CPAL audio backend implementation
//!
//! Each voice gets its own CPAL stream plus a lock-free sample ring:
//!
//! ```text
//! ┌──────────────────┐   write() blocks    ┌─────────────────────┐
//! │   Voice Thread   │───while full───────►│   Sample Ring       │
//! │ (owns CpalOutput)│                     │  (lock-free SPSC)   │
//! └──────────────────┘                     └──────────┬──────────┘
//!                                                     │ pop()
//!                                                     ▼
//!                                          ┌─────────────────────┐
//!                                          │ CPAL Audio Callback │
//!                                          │ (mono → all chans)  │
//!                                          └─────────────────────┘
//! ```
//!
//! The `Stream` objects are `!Send` and stay inside [`CpalProvider`], which
//! must outlive the voices. While a sink is stopped the callback plays
//! silence without draining the ring.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};

use super::device::{find_input_device, find_output_device};
use super::error::{AudioError, AudioResult};
use super::sink::{AudioProvider, AudioSink, AudioSource, StreamSpec};

/// How long a blocked write/read waits without progress before giving up
const STALL_TIMEOUT: Duration = Duration::from_secs(2);

/// Minimum ring length in seconds of audio
const RING_SECONDS: f64 = 0.05;

/// State shared between a stream's callbacks and its voice-side half
struct StreamShared {
    /// Callback consumes/produces samples only while set
    running: AtomicBool,
    /// Set by the CPAL error callback
    failed: AtomicBool,
    error: Mutex<Option<String>>,
}

impl StreamShared {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            running: AtomicBool::new(false),
            failed: AtomicBool::new(false),
            error: Mutex::new(None),
        })
    }

    fn fail(&self, message: String) {
        if let Ok(mut slot) = self.error.lock() {
            slot.get_or_insert(message);
        }
        self.failed.store(true, Ordering::Release);
    }

    fn check(&self) -> AudioResult<()> {
        if !self.failed.load(Ordering::Acquire) {
            return Ok(());
        }
        let message = self
            .error
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .unwrap_or_else(|| "stream failed".to_string());
        Err(AudioError::Stream(message))
    }
}

fn ring_capacity(spec: &StreamSpec) -> usize {
    let realtime = (spec.sample_rate as f64 * RING_SECONDS) as usize;
    (spec.chunk_frames * 4).max(realtime)
}

/// Sleep interval while waiting on the ring: a quarter chunk, within 0.5-5 ms
fn poll_interval(spec: &StreamSpec) -> Duration {
    let quarter_chunk = spec.chunk_frames as f64 / spec.sample_rate.max(1) as f64 / 4.0;
    Duration::from_secs_f64(quarter_chunk.clamp(0.0005, 0.005))
}

/// Pick an f32 stream config at the requested rate, fewest channels first
fn stream_config(
    device: &cpal::Device,
    device_name: &str,
    sample_rate: u32,
    input: bool,
) -> AudioResult<StreamConfig> {
    let configs: Vec<cpal::SupportedStreamConfigRange> = if input {
        device
            .supported_input_configs()
            .map_err(|e| AudioError::Host(e.to_string()))?
            .collect()
    } else {
        device
            .supported_output_configs()
            .map_err(|e| AudioError::Host(e.to_string()))?
            .collect()
    };

    let range = configs
        .into_iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| sample_rate >= c.min_sample_rate().0 && sample_rate <= c.max_sample_rate().0)
        .min_by_key(|c| c.channels())
        .ok_or_else(|| AudioError::NoF32Config {
            device: device_name.to_string(),
            rate: sample_rate,
        })?;

    Ok(range.with_sample_rate(cpal::SampleRate(sample_rate)).config())
}

/// Voice-side half of an output stream
pub struct CpalOutput {
    producer: rtrb::Producer<f32>,
    shared: Arc<StreamShared>,
    poll: Duration,
}

impl AudioSink for CpalOutput {
    fn start(&mut self) -> AudioResult<()> {
        self.shared.check()?;
        self.shared.running.store(true, Ordering::Release);
        Ok(())
    }

    fn write(&mut self, samples: &[f32]) -> AudioResult<()> {
        let mut remaining = samples;
        let mut last_progress = Instant::now();

        while !remaining.is_empty() {
            self.shared.check()?;

            let n = self.producer.slots().min(remaining.len());
            if n > 0 {
                if let Ok(chunk) = self.producer.write_chunk_uninit(n) {
                    let written = chunk.fill_from_iter(remaining[..n].iter().copied());
                    remaining = &remaining[written..];
                    last_progress = Instant::now();
                    continue;
                }
            }

            if last_progress.elapsed() > STALL_TIMEOUT {
                return Err(AudioError::Stalled(STALL_TIMEOUT.as_millis() as u64));
            }
            thread::sleep(self.poll);
        }

        Ok(())
    }

    fn stop(&mut self) -> AudioResult<()> {
        self.shared.running.store(false, Ordering::Release);
        self.shared.check()
    }
}

/// Voice-side half of an input stream
pub struct CpalInput {
    consumer: rtrb::Consumer<f32>,
    shared: Arc<StreamShared>,
    poll: Duration,
}

impl AudioSource for CpalInput {
    fn start(&mut self) -> AudioResult<()> {
        self.shared.check()?;
        // Anything still queued predates this start
        while self.consumer.pop().is_ok() {}
        self.shared.running.store(true, Ordering::Release);
        Ok(())
    }

    fn read(&mut self, buf: &mut [f32]) -> AudioResult<()> {
        let mut filled = 0;
        let mut last_progress = Instant::now();

        while filled < buf.len() {
            self.shared.check()?;

            match self.consumer.pop() {
                Ok(sample) => {
                    buf[filled] = sample;
                    filled += 1;
                    last_progress = Instant::now();
                }
                Err(_) => {
                    if last_progress.elapsed() > STALL_TIMEOUT {
                        return Err(AudioError::Stalled(STALL_TIMEOUT.as_millis() as u64));
                    }
                    thread::sleep(self.poll);
                }
            }
        }

        Ok(())
    }

    fn stop(&mut self) -> AudioResult<()> {
        self.shared.running.store(false, Ordering::Release);
        self.shared.check()
    }
}

/// Opens CPAL streams and keeps them alive
///
/// Drop this only after every voice using its streams has been stopped.
#[derive(Default)]
pub struct CpalProvider {
    streams: Vec<Stream>,
}

impl CpalProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live streams
    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }
}

impl AudioProvider for CpalProvider {
    fn open_output(
        &mut self,
        device: Option<&str>,
        spec: &StreamSpec,
    ) -> AudioResult<Box<dyn AudioSink>> {
        let device = find_output_device(device)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let config = stream_config(&device, &device_name, spec.sample_rate, false)?;
        let channels = config.channels as usize;

        let (producer, mut consumer) = rtrb::RingBuffer::<f32>::new(ring_capacity(spec));
        let shared = StreamShared::new();
        let callback_shared = shared.clone();
        let error_shared = shared.clone();

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    let running = callback_shared.running.load(Ordering::Acquire);
                    for frame in data.chunks_mut(channels) {
                        // Underrun or stopped: silence
                        let sample = if running { consumer.pop().unwrap_or(0.0) } else { 0.0 };
                        frame.fill(sample);
                    }
                },
                move |err| {
                    log::error!("Output stream error: {}", err);
                    error_shared.fail(err.to_string());
                },
                None,
            )
            .map_err(|e| AudioError::Open {
                device: device_name.clone(),
                message: e.to_string(),
            })?;

        stream
            .play()
            .map_err(|e| AudioError::Open {
                device: device_name.clone(),
                message: e.to_string(),
            })?;

        log::info!(
            "Opened output on {}: {} channels, {}Hz, ring {} samples",
            device_name,
            channels,
            spec.sample_rate,
            ring_capacity(spec)
        );

        self.streams.push(stream);

        Ok(Box::new(CpalOutput {
            producer,
            shared,
            poll: poll_interval(spec),
        }))
    }

    fn open_input(
        &mut self,
        device: Option<&str>,
        spec: &StreamSpec,
    ) -> AudioResult<Box<dyn AudioSource>> {
        let device = find_input_device(device)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let config = stream_config(&device, &device_name, spec.sample_rate, true)?;
        let channels = config.channels as usize;

        let (mut producer, consumer) = rtrb::RingBuffer::<f32>::new(ring_capacity(spec));
        let shared = StreamShared::new();
        let callback_shared = shared.clone();
        let error_shared = shared.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    if !callback_shared.running.load(Ordering::Acquire) {
                        return;
                    }
                    for frame in data.chunks(channels) {
                        let mono = frame.iter().sum::<f32>() / frame.len() as f32;
                        // Overrun: drop the newest input
                        let _ = producer.push(mono);
                    }
                },
                move |err| {
                    log::error!("Input stream error: {}", err);
                    error_shared.fail(err.to_string());
                },
                None,
            )
            .map_err(|e| AudioError::Open {
                device: device_name.clone(),
                message: e.to_string(),
            })?;

        stream
            .play()
            .map_err(|e| AudioError::Open {
                device: device_name.clone(),
                message: e.to_string(),
            })?;

        log::info!(
            "Opened input on {}: {} channels, {}Hz",
            device_name,
            channels,
            spec.sample_rate
        );

        self.streams.push(stream);

        Ok(Box::new(CpalInput {
            consumer,
            shared,
            poll: poll_interval(spec),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_capacity_covers_chunks_and_latency() {
        assert_eq!(ring_capacity(&StreamSpec::new(44100, 256)), 2205);
        assert_eq!(ring_capacity(&StreamSpec::new(8000, 1024)), 4096);
    }

    #[test]
    fn test_poll_interval_is_clamped() {
        assert_eq!(poll_interval(&StreamSpec::new(44100, 1)), Duration::from_secs_f64(0.0005));
        assert_eq!(poll_interval(&StreamSpec::new(1000, 1000)), Duration::from_secs_f64(0.005));
    }

    #[test]
    fn test_output_reports_stream_failure() {
        let (producer, _consumer) = rtrb::RingBuffer::<f32>::new(16);
        let shared = StreamShared::new();
        let mut output = CpalOutput {
            producer,
            shared: shared.clone(),
            poll: Duration::from_millis(1),
        };

        output.start().unwrap();
        output.write(&[0.25; 8]).unwrap();

        shared.fail("device unplugged".to_string());
        assert_eq!(
            output.write(&[0.25; 8]),
            Err(AudioError::Stream("device unplugged".to_string()))
        );
    }

    #[test]
    fn test_input_reads_what_callback_produced() {
        let (mut producer, consumer) = rtrb::RingBuffer::<f32>::new(16);
        let mut input = CpalInput {
            consumer,
            shared: StreamShared::new(),
            poll: Duration::from_millis(1),
        };

        input.start().unwrap();
        for s in [0.1, 0.2, 0.3] {
            producer.push(s).unwrap();
        }

        let mut buf = [0.0; 3];
        input.read(&mut buf).unwrap();
        assert_eq!(buf, [0.1, 0.2, 0.3]);
    }
}
