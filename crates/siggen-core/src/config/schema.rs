//! Configuration schema
//!
//! ```yaml
//! devices:
//!   midi: { name: "nanoKONTROL", wait: false }
//!   output: { name: "default" }
//! audio: { sample_rate: 44100, chunk_frames: 256 }
//! controls: { play: 41, stop: 42 }
//! voices:
//!   - name: sine
//!     kind: sine
//!     sample_rate: 16000
//!     controls: { freq: 16, volume: 0, mute: 32 }
//! mixers:
//!   "hw:1":
//!     PCM:
//!       output: { front_left: 3, front_right: 4 }
//!       capture: { mono: 5 }
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use crate::engine::{VoiceKind, VoiceSpec};
use crate::mixer::MixerChannelId;
use crate::types::{
    ControlId, DEFAULT_CHUNK_FRAMES, DEFAULT_SAMPLE_RATE, FREQ_C4, VOLUME_MAX, VOLUME_MIN,
};

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiggenConfig {
    pub devices: DevicesConfig,
    pub audio: AudioConfig,
    /// Global play/stop controls
    pub controls: GlobalControls,
    pub voices: Vec<VoiceConfig>,
    /// Mixer device → element name → channel bindings
    pub mixers: BTreeMap<String, BTreeMap<String, MixerElementConfig>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midi: Option<MidiDeviceConfig>,
    /// Default output device for every voice
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<DeviceRef>,
    /// Default input device for passthrough voices
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<DeviceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiDeviceConfig {
    /// Port name substring (case-insensitive)
    pub name: String,
    /// Keep retrying until the port shows up instead of failing
    #[serde(default)]
    pub wait: bool,
}

/// Audio device selected by case-insensitive name prefix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub chunk_frames: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_frames: DEFAULT_CHUNK_FRAMES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalControls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub play: Option<ControlId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<ControlId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub name: String,
    /// Unknown kinds are rejected while parsing
    pub kind: VoiceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    /// Initial frequency in Hz
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f32>,
    /// Initial gain in [0, 1]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    /// Output device override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Input device override (passthrough only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default)]
    pub controls: VoiceControls,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceControls {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freq: Option<ControlId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<ControlId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute: Option<ControlId>,
}

/// Channel → control bindings of one mixer element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerElementConfig {
    pub output: BTreeMap<MixerChannelId, ControlId>,
    pub capture: BTreeMap<MixerChannelId, ControlId>,
}

impl VoiceConfig {
    /// Engine-level spec with global audio defaults applied
    pub fn to_spec(&self, audio: &AudioConfig) -> VoiceSpec {
        VoiceSpec::new(self.name.clone(), self.kind)
            .with_sample_rate(self.sample_rate.unwrap_or(audio.sample_rate))
            .with_chunk_frames(audio.chunk_frames)
            .with_frequency(self.frequency.unwrap_or(FREQ_C4))
            .with_volume(self.volume.unwrap_or(VOLUME_MIN))
    }
}

impl SiggenConfig {
    /// Reject anything that would fail later during bring-up
    pub fn validate(&self) -> ConfigResult<()> {
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::InvalidSampleRate {
                context: "audio".to_string(),
                rate: 0,
            });
        }
        if self.audio.chunk_frames == 0 {
            return Err(ConfigError::InvalidChunkFrames);
        }
        if self.voices.is_empty() {
            return Err(ConfigError::NoVoices);
        }

        let mut names = HashSet::new();
        for (index, voice) in self.voices.iter().enumerate() {
            if voice.name.trim().is_empty() {
                return Err(ConfigError::UnnamedVoice(index));
            }
            if !names.insert(voice.name.as_str()) {
                return Err(ConfigError::DuplicateVoice(voice.name.clone()));
            }
            if voice.sample_rate == Some(0) {
                return Err(ConfigError::InvalidSampleRate {
                    context: format!("voice {}", voice.name),
                    rate: 0,
                });
            }
            if let Some(value) = voice.frequency {
                if !(value.is_finite() && value > 0.0) {
                    return Err(ConfigError::InvalidFrequency {
                        voice: voice.name.clone(),
                        value,
                    });
                }
            }
            if let Some(value) = voice.volume {
                if !(VOLUME_MIN..=VOLUME_MAX).contains(&value) {
                    return Err(ConfigError::InvalidVolume {
                        voice: voice.name.clone(),
                        value,
                    });
                }
            }
        }

        Ok(())
    }

    /// Every mixer binding as `(device, element, channel, capture, control)`
    pub fn mixer_bindings(
        &self,
    ) -> impl Iterator<Item = (&str, &str, MixerChannelId, bool, ControlId)> + '_ {
        self.mixers.iter().flat_map(|(device, elements)| {
            elements.iter().flat_map(move |(element, config)| {
                let outputs = config
                    .output
                    .iter()
                    .map(move |(ch, id)| (device.as_str(), element.as_str(), *ch, false, *id));
                let captures = config
                    .capture
                    .iter()
                    .map(move |(ch, id)| (device.as_str(), element.as_str(), *ch, true, *id));
                outputs.chain(captures)
            })
        })
    }
}
