//! Voice handle and its dedicated audio thread
//!
//! ```text
//!   Stopped ──start()──► Paused ◄──pause()── Playing
//!      ▲                   │  └───play()──────► │
//!      └──────stop()───────┴────────────────────┘   (terminal)
//! ```
//!
//! The handle lives on the orchestration thread. It validates parameter
//! updates and pushes them into the voice's SPSC queue; it never touches the
//! thread's buffers. The thread owns the output stream, drains the queue
//! between chunks and regenerates its chunk when a parameter changed. The
//! blocking device write paces the loop.
//!
//! Updates that find the queue full (a paused voice does not drain it) are
//! coalesced into a per-parameter backlog on the handle and flushed on the
//! next update, `play()` or `check_health()`, so the latest value always
//! arrives.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::command::{command_channel, VoiceCommand, COMMAND_QUEUE_CAPACITY};
use super::render::Renderer;
use super::signal::RunSignal;
use crate::audio::{AudioError, AudioSink, AudioSource};
use crate::shutdown::ShutdownToken;
use crate::types::{
    DEFAULT_CHUNK_FRAMES, DEFAULT_SAMPLE_RATE, FREQ_C4, VOLUME_MAX, VOLUME_MIN,
};
use crate::waveform::{UnknownWaveform, WaveformKind};

/// Errors raised by a voice handle or its thread
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoiceError {
    #[error("Invalid frequency {0}: must be positive and finite")]
    InvalidFrequency(f32),

    #[error("Invalid volume {0}: must be within [{min}, {max}]", min = VOLUME_MIN, max = VOLUME_MAX)]
    InvalidVolume(f32),

    #[error("Invalid sample rate for voice {0}")]
    InvalidSampleRate(String),

    #[error("Voice {0} already started")]
    AlreadyStarted(String),

    #[error("Voice {0} not started")]
    NotStarted(String),

    #[error("Voice {0} is stopped")]
    Terminated(String),

    #[error("Passthrough voice {0} needs an input stream")]
    MissingInput(String),

    #[error("Failed to spawn thread for voice {0}: {1}")]
    Spawn(String, String),

    #[error("Voice {0} thread panicked")]
    Panicked(String),

    #[error("Voice {voice}: {source}")]
    Device {
        voice: String,
        #[source]
        source: AudioError,
    },
}

pub type VoiceResult<T> = Result<T, VoiceError>;

/// What a voice emits; serialized as its lower-case name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum VoiceKind {
    /// Loops one period of a generated waveform
    Waveform(WaveformKind),
    /// Copies an input stream to the output, scaled by volume
    Passthrough,
}

impl VoiceKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Waveform(kind) => kind.name(),
            Self::Passthrough => "passthrough",
        }
    }
}

impl fmt::Display for VoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VoiceKind {
    type Err = UnknownWaveform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("passthrough") {
            return Ok(Self::Passthrough);
        }
        s.parse().map(Self::Waveform)
    }
}

impl TryFrom<String> for VoiceKind {
    type Error = UnknownWaveform;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VoiceKind> for String {
    fn from(kind: VoiceKind) -> Self {
        kind.name().to_string()
    }
}

/// Everything needed to build one voice
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSpec {
    pub name: String,
    pub kind: VoiceKind,
    pub sample_rate: u32,
    /// Minimum samples per device write
    pub chunk_frames: usize,
    /// Initial frequency in Hz
    pub frequency: f32,
    /// Initial normalized gain
    pub volume: f32,
}

impl VoiceSpec {
    pub fn new(name: impl Into<String>, kind: VoiceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
            frequency: FREQ_C4,
            volume: VOLUME_MIN,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_chunk_frames(mut self, chunk_frames: usize) -> Self {
        self.chunk_frames = chunk_frames.max(1);
        self
    }

    pub fn with_frequency(mut self, frequency: f32) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    pub fn validate(&self) -> VoiceResult<()> {
        if self.sample_rate == 0 {
            return Err(VoiceError::InvalidSampleRate(self.name.clone()));
        }
        check_frequency(self.frequency)?;
        check_volume(self.volume)
    }
}

fn check_frequency(frequency: f32) -> VoiceResult<()> {
    if frequency.is_finite() && frequency > 0.0 {
        Ok(())
    } else {
        Err(VoiceError::InvalidFrequency(frequency))
    }
}

fn check_volume(volume: f32) -> VoiceResult<()> {
    if (VOLUME_MIN..=VOLUME_MAX).contains(&volume) {
        Ok(())
    } else {
        Err(VoiceError::InvalidVolume(volume))
    }
}

/// Lifecycle state as seen from the handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Stopped,
    Paused,
    Playing,
}

/// Latest values that did not fit into the command queue
#[derive(Debug, Default)]
struct Backlog {
    frequency: Option<f32>,
    volume: Option<f32>,
}

impl Backlog {
    fn set(&mut self, command: VoiceCommand) {
        match command {
            VoiceCommand::SetFrequency(f) => self.frequency = Some(f),
            VoiceCommand::SetVolume(v) => self.volume = Some(v),
        }
    }
}

/// Thread-side half of a voice, moved into the thread at `start()`
struct Worker {
    name: String,
    kind: VoiceKind,
    renderer: Renderer,
    sink: Box<dyn AudioSink>,
    source: Option<Box<dyn AudioSource>>,
    input: Vec<f32>,
    commands: rtrb::Consumer<VoiceCommand>,
    signal: Arc<RunSignal>,
}

impl Worker {
    fn device_error(&self, source: AudioError) -> VoiceError {
        VoiceError::Device {
            voice: self.name.clone(),
            source,
        }
    }

    fn run(mut self) -> VoiceResult<()> {
        log::info!("[Voice {}] thread started ({})", self.name, self.kind);

        let result = self.run_loop();

        // Later play()/pause() calls see the voice as gone
        self.signal.quit();

        match &result {
            Ok(()) => log::info!("[Voice {}] thread stopped", self.name),
            Err(e) => log::error!("[Voice {}] thread terminated: {}", self.name, e),
        }
        result
    }

    fn run_loop(&mut self) -> VoiceResult<()> {
        while self.signal.wait_for_play() {
            self.sink.start().map_err(|e| self.device_error(e))?;
            if let Some(source) = self.source.as_mut() {
                if let Err(e) = source.start() {
                    return Err(self.device_error(e));
                }
            }
            log::debug!("[Voice {}] playing", self.name);

            while self.signal.is_playing() {
                self.drain_commands();
                self.emit()?;
            }

            self.sink.stop().map_err(|e| self.device_error(e))?;
            if let Some(source) = self.source.as_mut() {
                if let Err(e) = source.stop() {
                    return Err(self.device_error(e));
                }
            }
            log::debug!("[Voice {}] paused", self.name);
        }
        Ok(())
    }

    fn drain_commands(&mut self) {
        let mut changed = false;
        while let Ok(command) = self.commands.pop() {
            changed |= self.renderer.apply(command);
        }
        if changed {
            self.renderer.regenerate();
            log::debug!(
                "[Voice {}] freq {:.3}Hz, volume {:.3}",
                self.name,
                self.renderer.frequency(),
                self.renderer.volume()
            );
        }
    }

    /// Write the next chunk; the only blocking call in the loop
    fn emit(&mut self) -> VoiceResult<()> {
        let result = match self.kind {
            VoiceKind::Waveform(_) => self.sink.write(self.renderer.chunk()),
            VoiceKind::Passthrough => match self.source.as_mut() {
                Some(source) => source.read(&mut self.input).and_then(|()| {
                    let volume = self.renderer.volume();
                    self.input.iter_mut().for_each(|s| *s *= volume);
                    self.sink.write(&self.input)
                }),
                None => return Err(VoiceError::MissingInput(self.name.clone())),
            },
        };
        result.map_err(|e| self.device_error(e))
    }
}

/// Orchestration-side handle of one voice
pub struct Voice {
    name: String,
    kind: VoiceKind,
    frequency: f32,
    volume: f32,
    state: VoiceState,
    terminated: bool,
    signal: Arc<RunSignal>,
    commands: rtrb::Producer<VoiceCommand>,
    backlog: Backlog,
    worker: Option<Worker>,
    handle: Option<thread::JoinHandle<VoiceResult<()>>>,
    failure: Option<VoiceError>,
    failure_reported: bool,
}

impl Voice {
    /// Build a stopped voice around its streams
    ///
    /// Passthrough voices need `source`; waveform voices ignore it.
    pub fn new(
        spec: VoiceSpec,
        sink: Box<dyn AudioSink>,
        source: Option<Box<dyn AudioSource>>,
    ) -> VoiceResult<Self> {
        spec.validate()?;

        let source = match spec.kind {
            VoiceKind::Passthrough if source.is_none() => {
                return Err(VoiceError::MissingInput(spec.name));
            }
            VoiceKind::Passthrough => source,
            VoiceKind::Waveform(_) => None,
        };

        let (producer, consumer) = command_channel(COMMAND_QUEUE_CAPACITY);
        let signal = Arc::new(RunSignal::new());
        let renderer = Renderer::new(
            spec.kind,
            spec.sample_rate,
            spec.chunk_frames,
            spec.frequency,
            spec.volume,
        );

        let worker = Worker {
            name: spec.name.clone(),
            kind: spec.kind,
            renderer,
            sink,
            source,
            input: vec![0.0; spec.chunk_frames.max(1)],
            commands: consumer,
            signal: signal.clone(),
        };

        Ok(Self {
            name: spec.name,
            kind: spec.kind,
            frequency: spec.frequency,
            volume: spec.volume,
            state: VoiceState::Stopped,
            terminated: false,
            signal,
            commands: producer,
            backlog: Backlog::default(),
            worker: Some(worker),
            handle: None,
            failure: None,
            failure_reported: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> VoiceKind {
        self.kind
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    /// Last requested frequency
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Last requested volume
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Spawn the voice thread in the paused state
    pub fn start(&mut self, shutdown: &ShutdownToken) -> VoiceResult<()> {
        if self.terminated {
            return Err(VoiceError::Terminated(self.name.clone()));
        }
        let worker = self
            .worker
            .take()
            .ok_or_else(|| VoiceError::AlreadyStarted(self.name.clone()))?;

        shutdown.register(&self.signal);

        let handle = thread::Builder::new()
            .name(format!("voice-{}", self.name))
            .spawn(move || worker.run())
            .map_err(|e| VoiceError::Spawn(self.name.clone(), e.to_string()))?;

        self.handle = Some(handle);
        self.state = VoiceState::Paused;
        log::info!("[Voice {}] started", self.name);
        Ok(())
    }

    fn ensure_running(&self) -> VoiceResult<()> {
        if self.terminated {
            Err(VoiceError::Terminated(self.name.clone()))
        } else if self.handle.is_none() {
            Err(VoiceError::NotStarted(self.name.clone()))
        } else {
            Ok(())
        }
    }

    pub fn play(&mut self) -> VoiceResult<()> {
        self.ensure_running()?;
        self.flush_backlog();
        if !self.signal.play() {
            return Err(VoiceError::Terminated(self.name.clone()));
        }
        self.state = VoiceState::Playing;
        Ok(())
    }

    pub fn pause(&mut self) -> VoiceResult<()> {
        self.ensure_running()?;
        if !self.signal.pause() {
            return Err(VoiceError::Terminated(self.name.clone()));
        }
        self.state = VoiceState::Paused;
        Ok(())
    }

    /// Quit and join the voice thread; terminal
    ///
    /// Returns the device error the thread ended with, if any, on every
    /// call, including after [`Voice::check_health`] has already reaped the
    /// thread.
    pub fn stop(&mut self) -> VoiceResult<()> {
        if !self.terminated {
            self.signal.quit();
            self.worker = None;
            self.join();
            self.terminated = true;
            self.state = VoiceState::Stopped;
            log::info!("[Voice {}] stopped", self.name);
        }

        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            log::debug!("[Voice {}] Waiting for thread to stop...", self.name);
            let result = match handle.join() {
                Ok(result) => result,
                Err(_) => Err(VoiceError::Panicked(self.name.clone())),
            };
            if let Err(e) = result {
                self.failure.get_or_insert(e);
            }
        }
    }

    /// Report, once, that the voice thread ended with an error
    ///
    /// Also retries parameter updates that did not fit into the queue.
    pub fn check_health(&mut self) -> Option<VoiceError> {
        self.flush_backlog();

        let finished = self.handle.as_ref().is_some_and(|h| h.is_finished());
        if finished {
            self.join();
            self.terminated = true;
            self.state = VoiceState::Stopped;
        }

        if self.failure_reported {
            return None;
        }
        let failure = self.failure.clone()?;
        self.failure_reported = true;
        Some(failure)
    }

    pub fn set_frequency(&mut self, frequency: f32) -> VoiceResult<()> {
        check_frequency(frequency)?;
        if self.terminated {
            return Err(VoiceError::Terminated(self.name.clone()));
        }
        self.frequency = frequency;
        self.send(VoiceCommand::SetFrequency(frequency));
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f32) -> VoiceResult<()> {
        check_volume(volume)?;
        if self.terminated {
            return Err(VoiceError::Terminated(self.name.clone()));
        }
        self.volume = volume;
        self.send(VoiceCommand::SetVolume(volume));
        Ok(())
    }

    fn send(&mut self, command: VoiceCommand) {
        self.flush_backlog();

        // A still-pending older value must not be flushed after this one
        let pending = match command {
            VoiceCommand::SetFrequency(_) => self.backlog.frequency.is_some(),
            VoiceCommand::SetVolume(_) => self.backlog.volume.is_some(),
        };
        let command = if pending {
            command
        } else {
            match self.commands.push(command) {
                Ok(()) => return,
                Err(rtrb::PushError::Full(command)) => command,
            }
        };

        log::trace!("[Voice {}] queue full, coalescing {:?}", self.name, command);
        self.backlog.set(command);
    }

    fn flush_backlog(&mut self) {
        if let Some(f) = self.backlog.frequency {
            if self.commands.push(VoiceCommand::SetFrequency(f)).is_ok() {
                self.backlog.frequency = None;
            }
        }
        if let Some(v) = self.backlog.volume {
            if self.commands.push(VoiceCommand::SetVolume(v)).is_ok() {
                self.backlog.volume = None;
            }
        }
    }
}

impl fmt::Debug for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Voice")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("frequency", &self.frequency)
            .field("volume", &self.volume)
            .finish()
    }
}

impl Drop for Voice {
    fn drop(&mut self) {
        self.signal.quit();
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioResult, NullSink};
    use crate::engine::render_chunk;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Records every chunk it is handed; optionally fails after `fail_after` writes
    #[derive(Clone, Default)]
    struct RecordingSink {
        chunks: Arc<Mutex<Vec<Vec<f32>>>>,
        fail_after: Option<usize>,
    }

    impl RecordingSink {
        fn failing_after(writes: usize) -> Self {
            Self {
                fail_after: Some(writes),
                ..Self::default()
            }
        }

        fn chunks(&self) -> Vec<Vec<f32>> {
            self.chunks.lock().unwrap().clone()
        }
    }

    impl AudioSink for RecordingSink {
        fn start(&mut self) -> AudioResult<()> {
            Ok(())
        }

        fn write(&mut self, samples: &[f32]) -> AudioResult<()> {
            let mut chunks = self.chunks.lock().unwrap();
            if self.fail_after.is_some_and(|n| chunks.len() >= n) {
                return Err(AudioError::Stream("device unplugged".to_string()));
            }
            chunks.push(samples.to_vec());
            drop(chunks);
            thread::sleep(Duration::from_micros(200));
            Ok(())
        }

        fn stop(&mut self) -> AudioResult<()> {
            Ok(())
        }
    }

    struct ConstSource(f32);

    impl AudioSource for ConstSource {
        fn start(&mut self) -> AudioResult<()> {
            Ok(())
        }

        fn read(&mut self, buf: &mut [f32]) -> AudioResult<()> {
            buf.fill(self.0);
            Ok(())
        }

        fn stop(&mut self) -> AudioResult<()> {
            Ok(())
        }
    }

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    fn sine_spec(name: &str) -> VoiceSpec {
        VoiceSpec::new(name, VoiceKind::Waveform(WaveformKind::Sine))
            .with_sample_rate(8000)
            .with_chunk_frames(64)
            .with_frequency(200.0)
            .with_volume(0.5)
    }

    #[test]
    fn test_start_play_stop_completes() {
        let token = ShutdownToken::new();
        let mut voice = Voice::new(sine_spec("a"), Box::new(NullSink::new()), None).unwrap();
        assert_eq!(voice.state(), VoiceState::Stopped);

        voice.start(&token).unwrap();
        assert_eq!(voice.state(), VoiceState::Paused);
        voice.play().unwrap();
        assert_eq!(voice.state(), VoiceState::Playing);
        thread::sleep(Duration::from_millis(10));

        let begin = Instant::now();
        voice.stop().unwrap();
        assert!(begin.elapsed() < Duration::from_secs(1));
        assert_eq!(voice.state(), VoiceState::Stopped);
    }

    #[test]
    fn test_stop_wakes_paused_voice() {
        let token = ShutdownToken::new();
        let mut voice = Voice::new(sine_spec("a"), Box::new(NullSink::new()), None).unwrap();
        voice.start(&token).unwrap();
        thread::sleep(Duration::from_millis(5));

        let begin = Instant::now();
        voice.stop().unwrap();
        assert!(begin.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_stop_is_terminal() {
        let token = ShutdownToken::new();
        let mut voice = Voice::new(sine_spec("a"), Box::new(NullSink::new()), None).unwrap();
        voice.stop().unwrap();
        voice.stop().unwrap();

        assert_eq!(voice.start(&token), Err(VoiceError::Terminated("a".to_string())));
        assert_eq!(voice.play(), Err(VoiceError::Terminated("a".to_string())));
        assert_eq!(
            voice.set_frequency(440.0),
            Err(VoiceError::Terminated("a".to_string()))
        );
    }

    #[test]
    fn test_lifecycle_errors() {
        let token = ShutdownToken::new();
        let mut voice = Voice::new(sine_spec("a"), Box::new(NullSink::new()), None).unwrap();
        assert_eq!(voice.play(), Err(VoiceError::NotStarted("a".to_string())));

        voice.start(&token).unwrap();
        assert_eq!(voice.start(&token), Err(VoiceError::AlreadyStarted("a".to_string())));
        voice.stop().unwrap();
    }

    #[test]
    fn test_shutdown_token_quits_voice() {
        let token = ShutdownToken::new();
        let mut voice = Voice::new(sine_spec("a"), Box::new(NullSink::new()), None).unwrap();
        voice.start(&token).unwrap();
        voice.play().unwrap();

        token.cancel();
        assert!(wait_until(Duration::from_secs(1), || {
            voice.check_health();
            voice.state() == VoiceState::Stopped
        }));
        voice.stop().unwrap();
    }

    #[test]
    fn test_chunks_never_mix_settings() {
        let token = ShutdownToken::new();
        let sink = RecordingSink::default();
        let mut voice = Voice::new(sine_spec("a"), Box::new(sink.clone()), None).unwrap();
        voice.start(&token).unwrap();
        voice.play().unwrap();

        let freqs = [200.0, 400.0, 800.0];
        let vols = [0.5, 0.25, 1.0];
        for i in 0..300 {
            voice.set_frequency(freqs[i % 3]).unwrap();
            voice.set_volume(vols[(i / 3) % 3]).unwrap();
            if i % 10 == 0 {
                thread::sleep(Duration::from_micros(300));
            }
        }
        thread::sleep(Duration::from_millis(10));
        voice.stop().unwrap();

        let allowed: Vec<Vec<f32>> = freqs
            .iter()
            .flat_map(|&f| {
                vols.iter()
                    .map(move |&v| render_chunk(WaveformKind::Sine, f, v, 8000, 64))
            })
            .collect();

        let chunks = sink.chunks();
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(allowed.contains(chunk), "chunk mixes parameter settings");
        }
    }

    #[test]
    fn test_updates_while_paused_are_not_lost() {
        let token = ShutdownToken::new();
        let sink = RecordingSink::default();
        let mut voice = Voice::new(sine_spec("a"), Box::new(sink.clone()), None).unwrap();
        voice.start(&token).unwrap();

        // Far more updates than the queue holds
        for i in 1..=(COMMAND_QUEUE_CAPACITY * 3) {
            voice.set_frequency(100.0 + i as f32).unwrap();
        }
        let last = voice.frequency();
        voice.play().unwrap();

        let expected = render_chunk(WaveformKind::Sine, last, 0.5, 8000, 64);
        assert!(wait_until(Duration::from_secs(2), || {
            voice.check_health();
            sink.chunks().last() == Some(&expected)
        }));
        voice.stop().unwrap();
    }

    #[test]
    fn test_device_error_stops_only_that_voice() {
        let token = ShutdownToken::new();
        let mut failing = Voice::new(
            sine_spec("failing"),
            Box::new(RecordingSink::failing_after(3)),
            None,
        )
        .unwrap();
        let mut healthy = Voice::new(sine_spec("healthy"), Box::new(NullSink::new()), None).unwrap();

        failing.start(&token).unwrap();
        healthy.start(&token).unwrap();
        failing.play().unwrap();
        healthy.play().unwrap();

        let mut reported = None;
        assert!(wait_until(Duration::from_secs(2), || {
            reported = reported.take().or_else(|| failing.check_health());
            reported.is_some()
        }));
        assert!(matches!(reported, Some(VoiceError::Device { .. })));
        // Reported once only
        assert!(failing.check_health().is_none());
        assert_eq!(failing.state(), VoiceState::Stopped);

        assert!(healthy.check_health().is_none());
        assert_eq!(healthy.state(), VoiceState::Playing);
        healthy.stop().unwrap();

        assert!(matches!(failing.stop(), Err(VoiceError::Device { .. })));
        // Still reported on repeated stops
        assert!(matches!(failing.stop(), Err(VoiceError::Device { .. })));
    }

    #[test]
    fn test_stop_after_reaping_returns_failure() {
        let token = ShutdownToken::new();
        let mut voice = Voice::new(
            sine_spec("bad"),
            Box::new(RecordingSink::failing_after(0)),
            None,
        )
        .unwrap();

        voice.start(&token).unwrap();
        voice.play().unwrap();

        // Poll the way the rig does until the thread has been joined
        assert!(wait_until(Duration::from_secs(2), || {
            voice.check_health();
            voice.state() == VoiceState::Stopped
        }));

        assert!(matches!(voice.stop(), Err(VoiceError::Device { .. })));
    }

    #[test]
    fn test_backlog_never_reorders_updates() {
        let mut voice = Voice::new(sine_spec("busy"), Box::new(NullSink::new()), None).unwrap();

        for i in 0..COMMAND_QUEUE_CAPACITY {
            voice.set_volume(i as f32 / COMMAND_QUEUE_CAPACITY as f32).unwrap();
        }
        // Queue is full: these two are coalesced into the backlog
        voice.set_frequency(220.0).unwrap();
        voice.set_frequency(330.0).unwrap();
        assert_eq!(voice.backlog.frequency, Some(330.0));

        // The voice thread frees exactly one slot between two updates
        let consumer = &mut voice.worker.as_mut().unwrap().commands;
        consumer.pop().unwrap();

        // The pending entry takes the free slot first, the newer value
        // waits behind it
        voice.set_frequency(440.0).unwrap();
        assert_eq!(voice.backlog.frequency, Some(440.0));

        let consumer = &mut voice.worker.as_mut().unwrap().commands;
        let mut frequencies = Vec::new();
        while let Ok(command) = consumer.pop() {
            if let VoiceCommand::SetFrequency(f) = command {
                frequencies.push(f);
            }
        }
        voice.check_health();
        let consumer = &mut voice.worker.as_mut().unwrap().commands;
        while let Ok(command) = consumer.pop() {
            if let VoiceCommand::SetFrequency(f) = command {
                frequencies.push(f);
            }
        }

        assert_eq!(frequencies, vec![330.0, 440.0]);
        assert_eq!(voice.frequency(), 440.0);
        assert!(voice.backlog.frequency.is_none());
    }

    #[test]
    fn test_parameter_validation() {
        let mut voice = Voice::new(sine_spec("a"), Box::new(NullSink::new()), None).unwrap();
        assert_eq!(voice.set_frequency(0.0), Err(VoiceError::InvalidFrequency(0.0)));
        assert!(voice.set_frequency(-5.0).is_err());
        assert!(voice.set_frequency(f32::NAN).is_err());
        assert_eq!(voice.set_volume(1.5), Err(VoiceError::InvalidVolume(1.5)));
        assert!(voice.set_volume(-0.1).is_err());

        voice.set_frequency(880.0).unwrap();
        voice.set_volume(1.0).unwrap();
        assert_eq!(voice.frequency(), 880.0);
        assert_eq!(voice.volume(), 1.0);

        let bad = sine_spec("b").with_frequency(0.0);
        assert!(Voice::new(bad, Box::new(NullSink::new()), None).is_err());
    }

    #[test]
    fn test_passthrough_requires_input() {
        let spec = VoiceSpec::new("thru", VoiceKind::Passthrough);
        let result = Voice::new(spec, Box::new(NullSink::new()), None);
        assert!(matches!(result, Err(VoiceError::MissingInput(_))));
    }

    #[test]
    fn test_passthrough_scales_input() {
        let token = ShutdownToken::new();
        let sink = RecordingSink::default();
        let spec = VoiceSpec::new("thru", VoiceKind::Passthrough)
            .with_chunk_frames(32)
            .with_volume(0.5);
        let mut voice = Voice::new(
            spec,
            Box::new(sink.clone()),
            Some(Box::new(ConstSource(0.5))),
        )
        .unwrap();

        voice.start(&token).unwrap();
        voice.play().unwrap();
        assert!(wait_until(Duration::from_secs(1), || !sink.chunks().is_empty()));
        voice.stop().unwrap();

        for chunk in sink.chunks() {
            assert_eq!(chunk.len(), 32);
            assert!(chunk.iter().all(|s| *s == 0.25));
        }
    }

    #[test]
    fn test_parse_voice_kind() {
        assert_eq!("passthrough".parse::<VoiceKind>(), Ok(VoiceKind::Passthrough));
        assert_eq!(
            "Square".parse::<VoiceKind>(),
            Ok(VoiceKind::Waveform(WaveformKind::Square))
        );
        assert!("organ".parse::<VoiceKind>().is_err());
        assert_eq!(String::from(VoiceKind::Passthrough), "passthrough");
    }

    #[test]
    fn test_voice_kind_yaml_uses_names() {
        let kind: VoiceKind = serde_yaml::from_str("triangle").unwrap();
        assert_eq!(kind, VoiceKind::Waveform(WaveformKind::Triangle));
        assert_eq!(serde_yaml::to_string(&VoiceKind::Passthrough).unwrap().trim(), "passthrough");

        let err = serde_yaml::from_str::<VoiceKind>("organ").unwrap_err();
        assert!(err.to_string().contains("organ"));
    }
}
