//! Configuration schema and loading
//!
//! One YAML file (default `signals.yml`) describes devices, global controls,
//! voices and mixer bindings. It is loaded and validated before any device
//! is opened.

mod error;
mod io;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use io::{load_config, parse_config};
pub use schema::{
    AudioConfig, DeviceRef, DevicesConfig, GlobalControls, MidiDeviceConfig, MixerElementConfig,
    SiggenConfig, VoiceConfig, VoiceControls,
};

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "signals.yml";
