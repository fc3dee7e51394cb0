//! Init-phase wiring and the control poll loop
//!
//! [`Rig::build`] turns a validated [`SiggenConfig`] into voices, dispatcher
//! bindings and mixer bindings. Any failure aborts the build before a single
//! voice thread exists. [`Rig::run`] then polls the control source on the
//! orchestration thread until the shutdown token fires.
//!
//! Handlers capture shared handles (`Rc<RefCell<_>>`) to their voice or to
//! the mixer bridge; everything here stays on one thread.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::audio::{AudioProvider, StreamSpec};
use crate::config::SiggenConfig;
use crate::control::{ControlEvent, ControlSource};
use crate::dispatch::ControlDispatcher;
use crate::engine::{Voice, VoiceKind, VoiceState};
use crate::error::{SiggenError, SiggenResult};
use crate::mixer::{mixer_tag, MixerBackend, MixerBridge};
use crate::music::{control_to_frequency, control_to_volume};
use crate::shutdown::ShutdownToken;
use crate::types::{ControlId, ControlValue};

/// Default control poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

type SharedVoice = Rc<RefCell<Voice>>;

pub struct Rig {
    voices: Vec<SharedVoice>,
    dispatcher: ControlDispatcher,
    mixer: Rc<RefCell<MixerBridge>>,
    events: Vec<ControlEvent>,
}

impl Rig {
    /// Open every stream and bind every control; nothing starts streaming
    pub fn build(
        config: &SiggenConfig,
        audio: &mut dyn AudioProvider,
        mixer_backend: Box<dyn MixerBackend>,
    ) -> SiggenResult<Self> {
        config.validate()?;

        let mut rig = Self {
            voices: Vec::with_capacity(config.voices.len()),
            dispatcher: ControlDispatcher::new(),
            mixer: Rc::new(RefCell::new(MixerBridge::new(mixer_backend))),
            events: Vec::new(),
        };

        let default_output = config.devices.output.as_ref().map(|d| d.name.as_str());
        let default_input = config.devices.input.as_ref().map(|d| d.name.as_str());

        for voice_config in &config.voices {
            let spec = voice_config.to_spec(&config.audio);
            let stream = StreamSpec::new(spec.sample_rate, spec.chunk_frames);

            let output = voice_config.output.as_deref().or(default_output);
            let sink = audio.open_output(output, &stream)?;
            let source = match spec.kind {
                VoiceKind::Passthrough => {
                    let input = voice_config.input.as_deref().or(default_input);
                    Some(audio.open_input(input, &stream)?)
                }
                VoiceKind::Waveform(_) => None,
            };

            let voice = Rc::new(RefCell::new(Voice::new(spec, sink, source)?));
            let controls = &voice_config.controls;

            if let Some(id) = controls.freq {
                let target = voice.clone();
                rig.bind(id, move |value| {
                    target
                        .borrow_mut()
                        .set_frequency(control_to_frequency(value))
                        .map_err(SiggenError::from)
                })?;
            }
            if let Some(id) = controls.volume {
                let target = voice.clone();
                rig.bind(id, move |value| {
                    target
                        .borrow_mut()
                        .set_volume(control_to_volume(value))
                        .map_err(SiggenError::from)
                })?;
            }
            if let Some(id) = controls.mute {
                let target = voice.clone();
                rig.bind(id, move |value| {
                    let mut voice = target.borrow_mut();
                    let result = if value != 0 { voice.pause() } else { voice.play() };
                    result.map_err(SiggenError::from)
                })?;
            }

            log::info!(
                "Voice {} ({}) @ {}Hz on {}",
                voice_config.name,
                voice_config.kind,
                stream.sample_rate,
                output.unwrap_or("default output")
            );
            rig.voices.push(voice);
        }

        if let Some(id) = config.controls.play {
            let voices = rig.voices.clone();
            rig.bind(id, move |value| {
                if value != 0 {
                    for_each_voice(&voices, "play", Voice::play);
                }
                Ok(())
            })?;
        }
        if let Some(id) = config.controls.stop {
            let voices = rig.voices.clone();
            rig.bind(id, move |value| {
                if value != 0 {
                    for_each_voice(&voices, "pause", Voice::pause);
                }
                Ok(())
            })?;
        }

        for (device, element, channel, capture, id) in config.mixer_bindings() {
            let tag = mixer_tag(device, element, channel, capture);
            rig.mixer
                .borrow_mut()
                .bind(tag.clone(), device, element, channel, capture)?;

            let mixer = rig.mixer.clone();
            rig.bind(id, move |value| {
                mixer
                    .borrow_mut()
                    .apply_control_value(&tag, value)
                    .map(|_| ())
                    .map_err(SiggenError::from)
            })?;
        }

        log::info!(
            "Rig ready: {} voices, {} controls, {} mixer channels",
            rig.voices.len(),
            rig.dispatcher.len(),
            rig.mixer.borrow().len()
        );
        Ok(rig)
    }

    fn bind<F>(&mut self, id: ControlId, handler: F) -> SiggenResult<()>
    where
        F: FnMut(ControlValue) -> SiggenResult<()> + 'static,
    {
        self.dispatcher.register(id, handler)?;
        Ok(())
    }

    /// Spawn every voice thread (paused)
    pub fn start(&mut self, shutdown: &ShutdownToken) -> SiggenResult<()> {
        for voice in &self.voices {
            voice.borrow_mut().start(shutdown)?;
        }
        Ok(())
    }

    /// Route one control event
    pub fn dispatch(&mut self, id: ControlId, value: ControlValue) -> bool {
        self.dispatcher.dispatch(id, value)
    }

    /// Poll `source` every `interval` until `shutdown` is cancelled
    pub fn run(
        &mut self,
        source: &mut dyn ControlSource,
        shutdown: &ShutdownToken,
        interval: Duration,
    ) {
        log::info!("Polling controls every {:?}", interval);

        while !shutdown.is_cancelled() {
            self.poll_once(source);
            if shutdown.wait_timeout(interval) {
                break;
            }
        }

        log::info!("Control loop finished");
    }

    /// Drain one batch from `source`, dispatch it and check voice health
    pub fn poll_once(&mut self, source: &mut dyn ControlSource) {
        let mut events = std::mem::take(&mut self.events);
        events.clear();
        source.poll_pending(&mut events);

        for event in &events {
            log::debug!("event: control {} = {}", event.id, event.value);
            self.dispatcher.dispatch(event.id, event.value);
        }
        self.events = events;

        self.check_health();
    }

    /// Log voices whose thread ended with an error since the last check
    pub fn check_health(&mut self) -> usize {
        let mut failed = 0;
        for voice in &self.voices {
            let mut voice = voice.borrow_mut();
            if let Some(e) = voice.check_health() {
                log::error!("Voice {} stopped: {}", voice.name(), e);
                failed += 1;
            }
        }
        failed
    }

    /// Stop and join every voice
    ///
    /// Every voice is stopped even if some fail; the first failure is returned.
    pub fn shutdown(&mut self) -> SiggenResult<()> {
        log::info!("stopping all voices");
        let mut first_error = None;

        for voice in &self.voices {
            let mut voice = voice.borrow_mut();
            if let Err(e) = voice.stop() {
                log::warn!("Voice {} ended with error: {}", voice.name(), e);
                first_error.get_or_insert(SiggenError::from(e));
            }
        }

        log::info!("all done.");
        first_error.map_or(Ok(()), Err)
    }

    pub fn voice_names(&self) -> Vec<String> {
        self.voices
            .iter()
            .map(|v| v.borrow().name().to_string())
            .collect()
    }

    /// Inspect a voice by name
    pub fn with_voice<R>(&self, name: &str, f: impl FnOnce(&Voice) -> R) -> Option<R> {
        self.voices
            .iter()
            .find(|v| v.borrow().name() == name)
            .map(|v| f(&*v.borrow()))
    }

    pub fn voice_state(&self, name: &str) -> Option<VoiceState> {
        self.with_voice(name, Voice::state)
    }

    /// Last gain written through a mixer binding
    pub fn mixer_gain(&self, tag: &str) -> Option<i64> {
        self.mixer.borrow().channel(tag).and_then(|c| c.gain())
    }

    pub fn dispatcher(&self) -> &ControlDispatcher {
        &self.dispatcher
    }
}

impl std::fmt::Debug for Rig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rig")
            .field("voices", &self.voice_names())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

/// Apply `op` to every voice; one voice failing never skips the rest
fn for_each_voice(
    voices: &[SharedVoice],
    what: &str,
    op: fn(&mut Voice) -> crate::engine::VoiceResult<()>,
) {
    for voice in voices {
        let mut voice = voice.borrow_mut();
        if let Err(e) = op(&mut *voice) {
            log::warn!("Cannot {} voice {}: {}", what, voice.name(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullProvider;
    use crate::config::parse_config;
    use crate::mixer::MemoryMixer;

    const CONFIG: &str = r#"
controls: { play: 41, stop: 42 }
voices:
  - name: sine
    kind: sine
    controls: { freq: 16, volume: 0, mute: 32 }
  - name: saw
    kind: sawtooth
    controls: { freq: 17, volume: 1, mute: 33 }
"#;

    #[test]
    fn test_build_binds_every_control() {
        let config = parse_config(CONFIG).unwrap();
        let rig = Rig::build(&config, &mut NullProvider, Box::new(MemoryMixer::new())).unwrap();

        assert_eq!(rig.voice_names(), vec!["sine", "saw"]);
        for id in [41, 42, 16, 0, 32, 17, 1, 33] {
            assert!(rig.dispatcher().is_bound(id), "control {} unbound", id);
        }
        assert_eq!(rig.voice_state("sine"), Some(VoiceState::Stopped));
    }

    #[test]
    fn test_duplicate_control_fails_build() {
        let yaml = CONFIG.replace("freq: 17", "freq: 16");
        let config = parse_config(&yaml).unwrap();
        let err = Rig::build(&config, &mut NullProvider, Box::new(MemoryMixer::new())).unwrap_err();
        assert!(matches!(err, SiggenError::AlreadyBound(16)));
    }

    #[test]
    fn test_dispatch_updates_voice_parameters() {
        let config = parse_config(CONFIG).unwrap();
        let mut rig = Rig::build(&config, &mut NullProvider, Box::new(MemoryMixer::new())).unwrap();

        assert!(rig.dispatch(16, 127));
        assert!(rig.dispatch(0, 127));
        assert!(!rig.dispatch(99, 3));

        let (freq, volume) = rig.with_voice("sine", |v| (v.frequency(), v.volume())).unwrap();
        assert_eq!(freq, control_to_frequency(127));
        assert_eq!(volume, 1.0);
        rig.shutdown().unwrap();
    }
}
