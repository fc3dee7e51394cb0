//! Control value → hardware gain bridging

use std::collections::HashMap;

use super::backend::{GainElement, MixerBackend, MixerChannelId};
use super::error::{MixerError, MixerResult};
use crate::types::{ControlValue, CONTROL_MAX};

/// Binding name for one element channel, e.g. `hw:1.PCM.front_left.out`
pub fn mixer_tag(device: &str, element: &str, channel: MixerChannelId, capture: bool) -> String {
    let direction = if capture { "in" } else { "out" };
    format!("{}.{}.{}.{}", device, element, channel, direction)
}

/// Linear map of a 0-127 control value onto `[low, high]`, nearest integer
///
/// Exact at both ends and monotonic in between.
pub fn scale_control_value(value: ControlValue, low: i64, high: i64) -> i64 {
    let fraction = value.min(CONTROL_MAX) as f64 / CONTROL_MAX as f64;
    low + ((high - low) as f64 * fraction).round() as i64
}

/// One bound element channel
pub struct MixerChannel {
    device: String,
    element_name: String,
    channel: MixerChannelId,
    capture: bool,
    range: (i64, i64),
    gain: Option<i64>,
    element: Box<dyn GainElement>,
}

impl MixerChannel {
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn element_name(&self) -> &str {
        &self.element_name
    }

    pub fn channel(&self) -> MixerChannelId {
        self.channel
    }

    pub fn is_capture(&self) -> bool {
        self.capture
    }

    /// Native `(low, high)` range read at bind time
    pub fn range(&self) -> (i64, i64) {
        self.range
    }

    /// Last gain written, if any
    pub fn gain(&self) -> Option<i64> {
        self.gain
    }
}

impl std::fmt::Debug for MixerChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixerChannel")
            .field("device", &self.device)
            .field("element", &self.element_name)
            .field("channel", &self.channel)
            .field("capture", &self.capture)
            .field("range", &self.range)
            .field("gain", &self.gain)
            .finish()
    }
}

/// Named mixer channels driven by control values
///
/// Channels are bound once during init; hardware topology is assumed fixed
/// for the session, so a missing element fails the bind immediately.
pub struct MixerBridge {
    backend: Box<dyn MixerBackend>,
    channels: HashMap<String, MixerChannel>,
}

impl MixerBridge {
    pub fn new(backend: Box<dyn MixerBackend>) -> Self {
        Self {
            backend,
            channels: HashMap::new(),
        }
    }

    pub fn bind(
        &mut self,
        name: impl Into<String>,
        device: &str,
        element: &str,
        channel: MixerChannelId,
        capture: bool,
    ) -> MixerResult<()> {
        let name = name.into();
        if self.channels.contains_key(&name) {
            return Err(MixerError::AlreadyBound(name));
        }

        let gain_element = self.backend.element(device, element)?;
        let range = gain_element.volume_range(capture)?;

        log::info!(
            "Mixer {} bound: range [{}, {}]",
            name,
            range.0,
            range.1
        );

        self.channels.insert(
            name,
            MixerChannel {
                device: device.to_string(),
                element_name: element.to_string(),
                channel,
                capture,
                range,
                gain: None,
                element: gain_element,
            },
        );
        Ok(())
    }

    /// Scale `value` into the channel's range and write it to hardware
    pub fn apply_control_value(&mut self, name: &str, value: ControlValue) -> MixerResult<i64> {
        let channel = self
            .channels
            .get_mut(name)
            .ok_or_else(|| MixerError::UnknownBinding(name.to_string()))?;

        let (low, high) = channel.range;
        let gain = scale_control_value(value, low, high);
        channel
            .element
            .set_volume(gain, channel.channel, channel.capture)?;
        channel.gain = Some(gain);

        log::debug!("Mixer {}: control {} -> gain {}", name, value, gain);
        Ok(gain)
    }

    pub fn channel(&self, name: &str) -> Option<&MixerChannel> {
        self.channels.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl std::fmt::Debug for MixerBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixerBridge")
            .field("channels", &self.channels)
            .finish()
    }
}
