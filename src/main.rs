// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use slidehorn::controller::Controller;
use slidehorn::input::{self, InputState};
use slidehorn::instrument::{Catalog, InstrumentProfile};
use slidehorn::presentation::TracingPresentation;
use slidehorn::sampler::{SampleEngine, SampleLoader};
use slidehorn::session::Session;
use slidehorn::{audio, config, midi, verify};

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=slide instrument cabinet

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/slidehorn
ExecStart=/usr/local/bin/slidehorn start "$SLIDEHORN_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=slidehorn.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A spinner-driven slide instrument."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start will run the cabinet with the given config.
    Start {
        /// The path to the cabinet config.
        config_path: PathBuf,
    },
    /// Prints the instrument catalog.
    Instruments {},
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI input devices.
    MidiDevices {},
    /// Decodes every sample the given config would play.
    Verify {
        /// The path to the cabinet config.
        config_path: PathBuf,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config_path } => {
            let config = config::load(&config_path)?;
            let catalog = Catalog::builtin()?;

            let audio_config = config.audio();
            let device = audio::get_device(&audio_config)?;
            let sampler = Arc::new(SampleEngine::new(
                device,
                audio_config.release()?,
                audio_config.retrigger(),
            ));

            let input_state = Arc::new(InputState::new(config.spinner_resolution()));
            let driver = input::get_driver(&config.input(), input_state.clone())?;

            let session = Session::new(
                &config,
                catalog,
                sampler,
                input_state,
                Box::new(TracingPresentation::new()),
            );
            Controller::new(session, driver, config.frame_rate())
                .join()
                .await?;
        }
        Commands::Instruments {} => {
            let catalog = Catalog::builtin()?;
            let profiles: Vec<&InstrumentProfile> = catalog.iter().collect();
            print!("{}", serde_yml::to_string(&profiles)?);
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Verify { config_path } => {
            let config = config::load(&config_path)?;
            let catalog = Catalog::builtin()?;
            let loader = SampleLoader::new(config.audio().sample_rate());
            let assets = config.assets();

            let mut report = verify::check_catalog(&catalog, &loader, &assets);
            report.merge(verify::check_ambience(&config.ambience(), &loader, &assets));

            println!("Checked {} samples.", report.checked);
            if !report.is_clean() {
                for issue in report.issues.iter() {
                    println!("- {}", issue);
                }
                return Err(format!("{} samples failed to decode", report.issues.len()).into());
            }
            println!("All samples decoded.");
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}
