//! Command line interface

use std::path::PathBuf;

use clap::Parser;
use siggen_core::config::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(name = "siggen")]
#[command(about = "Control-surface driven multi-voice waveform synthesizer", long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(short = 'f', long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log lifecycle events (info level)
    #[arg(short, long)]
    pub verbose: bool,

    /// Log every control event and parameter change (debug level)
    #[arg(long)]
    pub debug: bool,

    /// List audio and MIDI devices, then exit
    #[arg(short, long)]
    pub list: bool,

    /// Run without a MIDI control surface
    #[arg(long, hide = true)]
    pub no_midi: bool,

    /// Discard audio instead of opening sound devices
    #[arg(long)]
    pub no_audio: bool,

    /// Control poll interval in milliseconds
    #[arg(long, default_value = "100")]
    pub poll_ms: u64,
}

impl Cli {
    /// Default log filter; `RUST_LOG` still takes precedence
    pub fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }
}
