//! siggen - control-surface driven multi-voice waveform synthesizer
//!
//! 1. Loads and validates the configuration
//! 2. Connects the MIDI control surface (optionally waiting for it)
//! 3. Builds the rig: one voice thread per configured voice, control and
//!    mixer bindings
//! 4. Polls controls until SIGINT, then stops every voice
//!
//! ## Command line flags
//!
//! - `--config/-f <path>`: configuration file (default `signals.yml`)
//! - `--list/-l`: print audio and MIDI devices
//! - `--no-audio`: run the voices against null sinks

mod cli;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use siggen_core::audio::{self, AudioProvider, CpalProvider, NullProvider};
use siggen_core::config::load_config;
use siggen_core::control::{ControlSource, NoControls};
use siggen_core::mixer::AlsaMixer;
use siggen_core::rig::Rig;
use siggen_core::shutdown::ShutdownToken;
use siggen_core::SiggenError;
use siggen_midi::{connect_with_retry, list_input_ports};

use cli::Cli;

fn main() -> Result<()> {
    let args = Cli::parse();

    // RUST_LOG overrides the level picked by -v/--debug
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(args.log_level()))
        .format_timestamp_millis()
        .init();

    if args.list {
        print_devices();
        return Ok(());
    }

    let config = load_config(&args.config)
        .map_err(SiggenError::from)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    let shutdown = ShutdownToken::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.cancel()).context("Failed to install SIGINT handler")?;
    }

    let mut controls: Box<dyn ControlSource> = match (&config.devices.midi, args.no_midi) {
        (Some(midi), false) => {
            match connect_with_retry(&midi.name, midi.wait, &shutdown).map_err(SiggenError::from)? {
                Some(source) => Box::new(source),
                None => {
                    log::warn!("interrupted while waiting for MIDI device");
                    return Ok(());
                }
            }
        }
        _ => {
            log::warn!("running without a control surface");
            Box::new(NoControls)
        }
    };

    let mut provider: Box<dyn AudioProvider> = if args.no_audio {
        Box::new(NullProvider)
    } else {
        Box::new(CpalProvider::new())
    };

    let mut rig = Rig::build(&config, provider.as_mut(), Box::new(AlsaMixer::new()))
        .context("Failed to bring up voices")?;
    rig.start(&shutdown).context("Failed to start voices")?;

    log::warn!("siggen ready");
    rig.run(
        controls.as_mut(),
        &shutdown,
        Duration::from_millis(args.poll_ms.max(1)),
    );

    if let Err(e) = rig.shutdown() {
        log::warn!("shutdown: {}", e);
    }
    // Voices are joined; their streams can go now
    drop(rig);
    drop(provider);

    log::warn!("all done.");
    Ok(())
}

fn print_devices() {
    match audio::list_devices() {
        Ok(devices) => {
            println!("Audio inputs:");
            for device in &devices.inputs {
                println!("{}", device);
            }
            println!();
            println!("Audio outputs:");
            for device in &devices.outputs {
                println!("{}", device);
            }
        }
        Err(e) => eprintln!("Cannot enumerate audio devices: {}", e),
    }

    println!();
    println!("MIDI inputs:");
    match list_input_ports() {
        Ok(ports) => {
            for (index, name) in ports.iter().enumerate() {
                println!("[{:4}] {}", index, name);
            }
        }
        Err(e) => eprintln!("Cannot enumerate MIDI inputs: {}", e),
    }
}
