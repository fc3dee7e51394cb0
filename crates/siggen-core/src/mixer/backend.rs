//! Hardware mixer abstraction
//!
//! A [`MixerBackend`] attaches to a mixer device and hands out
//! [`GainElement`]s. Elements expose a native integer volume range per
//! direction (playback or capture) and accept per-channel writes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{MixerError, MixerResult};

/// Logical channel selector of a gain element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixerChannelId {
    FrontLeft,
    FrontRight,
    RearLeft,
    RearRight,
    FrontCenter,
    Woofer,
    SideLeft,
    SideRight,
    RearCenter,
    /// Single-channel elements; addresses the first channel
    Mono,
}

impl MixerChannelId {
    pub const ALL: [MixerChannelId; 10] = [
        Self::FrontLeft,
        Self::FrontRight,
        Self::RearLeft,
        Self::RearRight,
        Self::FrontCenter,
        Self::Woofer,
        Self::SideLeft,
        Self::SideRight,
        Self::RearCenter,
        Self::Mono,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::FrontLeft => "front_left",
            Self::FrontRight => "front_right",
            Self::RearLeft => "rear_left",
            Self::RearRight => "rear_right",
            Self::FrontCenter => "front_center",
            Self::Woofer => "woofer",
            Self::SideLeft => "side_left",
            Self::SideRight => "side_right",
            Self::RearCenter => "rear_center",
            Self::Mono => "mono",
        }
    }
}

impl fmt::Display for MixerChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MixerChannelId {
    type Err = MixerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.name() == lower)
            .ok_or_else(|| MixerError::UnknownChannel(s.to_string()))
    }
}

/// One hardware gain control path
pub trait GainElement {
    /// Native `(low, high)` volume range for playback or capture
    fn volume_range(&self, capture: bool) -> MixerResult<(i64, i64)>;

    fn set_volume(&mut self, value: i64, channel: MixerChannelId, capture: bool) -> MixerResult<()>;
}

/// Attaches to mixer devices and looks up their elements
pub trait MixerBackend {
    /// Fails with [`MixerError::MissingDevice`] if the device or element is absent
    fn element(&mut self, device: &str, element: &str) -> MixerResult<Box<dyn GainElement>>;
}

#[derive(Debug, Clone)]
struct MemoryElementState {
    playback_range: (i64, i64),
    capture_range: (i64, i64),
    volumes: HashMap<(MixerChannelId, bool), i64>,
}

type SharedElements = Rc<RefCell<HashMap<(String, String), MemoryElementState>>>;

/// In-memory mixer for tests and hardware-less runs
///
/// Clones share state, so a test can keep one clone to inspect what the
/// bridge wrote through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryMixer {
    elements: SharedElements,
}

impl MemoryMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element with the given playback and capture ranges
    pub fn with_element(
        self,
        device: &str,
        element: &str,
        playback_range: (i64, i64),
        capture_range: (i64, i64),
    ) -> Self {
        self.elements.borrow_mut().insert(
            (device.to_string(), element.to_string()),
            MemoryElementState {
                playback_range,
                capture_range,
                volumes: HashMap::new(),
            },
        );
        self
    }

    /// Last value written to a channel
    pub fn volume(
        &self,
        device: &str,
        element: &str,
        channel: MixerChannelId,
        capture: bool,
    ) -> Option<i64> {
        self.elements
            .borrow()
            .get(&(device.to_string(), element.to_string()))
            .and_then(|state| state.volumes.get(&(channel, capture)).copied())
    }
}

struct MemoryElement {
    key: (String, String),
    elements: SharedElements,
}

impl MemoryElement {
    fn missing(&self) -> MixerError {
        MixerError::MissingDevice {
            device: self.key.0.clone(),
            element: self.key.1.clone(),
        }
    }
}

impl GainElement for MemoryElement {
    fn volume_range(&self, capture: bool) -> MixerResult<(i64, i64)> {
        let elements = self.elements.borrow();
        let state = elements.get(&self.key).ok_or_else(|| self.missing())?;
        Ok(if capture {
            state.capture_range
        } else {
            state.playback_range
        })
    }

    fn set_volume(&mut self, value: i64, channel: MixerChannelId, capture: bool) -> MixerResult<()> {
        let mut elements = self.elements.borrow_mut();
        let state = elements.get_mut(&self.key).ok_or_else(|| self.missing())?;
        state.volumes.insert((channel, capture), value);
        Ok(())
    }
}

impl MixerBackend for MemoryMixer {
    fn element(&mut self, device: &str, element: &str) -> MixerResult<Box<dyn GainElement>> {
        let key = (device.to_string(), element.to_string());
        if !self.elements.borrow().contains_key(&key) {
            return Err(MixerError::MissingDevice {
                device: device.to_string(),
                element: element.to_string(),
            });
        }
        Ok(Box::new(MemoryElement {
            key,
            elements: self.elements.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_names_round_trip() {
        for channel in MixerChannelId::ALL {
            assert_eq!(channel.name().parse::<MixerChannelId>(), Ok(channel));
        }
        assert!("center".parse::<MixerChannelId>().is_err());
    }

    #[test]
    fn test_memory_mixer_missing_element() {
        let mut mixer = MemoryMixer::new().with_element("hw:0", "PCM", (0, 255), (0, 31));
        assert!(mixer.element("hw:0", "PCM").is_ok());
        assert!(matches!(
            mixer.element("hw:0", "Master"),
            Err(MixerError::MissingDevice { .. })
        ));
        assert!(mixer.element("hw:9", "PCM").is_err());
    }
}
