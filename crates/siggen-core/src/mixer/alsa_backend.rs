//! ALSA simple-mixer backend
//!
//! Each bound element keeps its own `alsa::mixer::Mixer` handle and looks the
//! simple element up again on every call, since `Selem` borrows the mixer.
//! Without Linux or the `alsa-mixer` feature every lookup fails with
//! `MissingDevice`.

use super::backend::{GainElement, MixerBackend};
#[cfg(all(target_os = "linux", feature = "alsa-mixer"))]
use super::backend::MixerChannelId;
use super::error::{MixerError, MixerResult};

/// Hardware mixer backed by ALSA
#[derive(Debug, Default)]
pub struct AlsaMixer;

impl AlsaMixer {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(all(target_os = "linux", feature = "alsa-mixer"))]
mod imp {
    use alsa::mixer::{Mixer, Selem, SelemChannelId, SelemId};

    use super::*;

    impl From<MixerChannelId> for SelemChannelId {
        fn from(channel: MixerChannelId) -> Self {
            match channel {
                MixerChannelId::FrontLeft | MixerChannelId::Mono => SelemChannelId::FrontLeft,
                MixerChannelId::FrontRight => SelemChannelId::FrontRight,
                MixerChannelId::RearLeft => SelemChannelId::RearLeft,
                MixerChannelId::RearRight => SelemChannelId::RearRight,
                MixerChannelId::FrontCenter => SelemChannelId::FrontCenter,
                MixerChannelId::Woofer => SelemChannelId::Woofer,
                MixerChannelId::SideLeft => SelemChannelId::SideLeft,
                MixerChannelId::SideRight => SelemChannelId::SideRight,
                MixerChannelId::RearCenter => SelemChannelId::RearCenter,
            }
        }
    }

    pub(super) struct AlsaElement {
        device: String,
        name: String,
        mixer: Mixer,
        id: SelemId,
    }

    impl AlsaElement {
        pub(super) fn open(device: &str, element: &str) -> MixerResult<Self> {
            let missing = || MixerError::MissingDevice {
                device: device.to_string(),
                element: element.to_string(),
            };

            let mixer = Mixer::new(device, false).map_err(|e| {
                log::warn!("Cannot attach to mixer {}: {}", device, e);
                missing()
            })?;
            let id = SelemId::new(element, 0);
            if mixer.find_selem(&id).is_none() {
                return Err(missing());
            }

            Ok(Self {
                device: device.to_string(),
                name: element.to_string(),
                mixer,
                id,
            })
        }

        fn selem(&self) -> MixerResult<Selem<'_>> {
            self.mixer
                .find_selem(&self.id)
                .ok_or_else(|| MixerError::MissingDevice {
                    device: self.device.clone(),
                    element: self.name.clone(),
                })
        }
    }

    impl GainElement for AlsaElement {
        fn volume_range(&self, capture: bool) -> MixerResult<(i64, i64)> {
            let selem = self.selem()?;
            Ok(if capture {
                selem.get_capture_volume_range()
            } else {
                selem.get_playback_volume_range()
            })
        }

        fn set_volume(
            &mut self,
            value: i64,
            channel: MixerChannelId,
            capture: bool,
        ) -> MixerResult<()> {
            let selem = self.selem()?;
            let result = if capture {
                selem.set_capture_volume(channel.into(), value)
            } else {
                selem.set_playback_volume(channel.into(), value)
            };
            result.map_err(|e| MixerError::Hardware {
                element: format!("{}.{}", self.device, self.name),
                message: e.to_string(),
            })
        }
    }
}

impl MixerBackend for AlsaMixer {
    #[cfg(all(target_os = "linux", feature = "alsa-mixer"))]
    fn element(&mut self, device: &str, element: &str) -> MixerResult<Box<dyn GainElement>> {
        Ok(Box::new(imp::AlsaElement::open(device, element)?))
    }

    #[cfg(not(all(target_os = "linux", feature = "alsa-mixer")))]
    fn element(&mut self, device: &str, element: &str) -> MixerResult<Box<dyn GainElement>> {
        log::warn!("ALSA mixer support is not available in this build");
        Err(MixerError::MissingDevice {
            device: device.to_string(),
            element: element.to_string(),
        })
    }
}
