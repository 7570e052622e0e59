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
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::ambience::AmbientTrack;
use super::audio::Audio;
use super::error::ConfigError;
use super::input::Input;
use crate::input::Player;

const DEFAULT_PLAYERS: usize = 1;
const DEFAULT_GLIDE_GAIN: f64 = 40.0;
const DEFAULT_FRAME_RATE: u32 = 60;
const DEFAULT_VOLUME: f32 = 0.8;
const DEFAULT_ASSETS: &str = "assets";
const DEFAULT_SPINNER_RESOLUTION: u32 = 256;
const DEFAULT_INSTRUMENTS: [&str; 2] = ["trombone", "saxophone"];

/// The configuration for a cabinet session.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Session {
    /// One or two player lanes (default: 1)
    players: Option<usize>,
    /// Whether players may change instruments with the carousel (default: false)
    instrument_selectable: Option<bool>,
    /// Slide travel for one full spinner revolution (default: 40)
    glide_gain: Option<f64>,
    /// Ticks per second (default: 60)
    frame_rate: Option<u32>,
    /// Spinner steps per revolution (default: 256)
    spinner_resolution: Option<u32>,
    /// Instrument voice gain in [0, 1] (default: 0.8)
    volume: Option<f32>,
    /// The sample asset root (default: assets)
    assets: Option<String>,
    /// The instrument each lane starts with.
    instruments: Option<Vec<String>>,
    /// The audio configuration.
    audio: Option<Audio>,
    /// The input configuration.
    input: Option<Input>,
    /// Background tracks.
    ambience: Option<Vec<AmbientTrack>>,

    /// Relative paths are resolved against this directory.
    #[serde(skip)]
    base_path: PathBuf,
}

impl Session {
    /// Creates a configuration with every default and the given audio device.
    #[cfg(test)]
    pub fn new(players: usize, instrument_selectable: bool, audio: Audio) -> Session {
        Session {
            players: Some(players),
            instrument_selectable: Some(instrument_selectable),
            audio: Some(audio),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub fn with_ambience(mut self, ambience: Vec<AmbientTrack>) -> Session {
        self.ambience = Some(ambience);
        self
    }

    #[cfg(test)]
    pub fn with_instruments(mut self, instruments: &[&str]) -> Session {
        self.instruments = Some(instruments.iter().map(|s| s.to_string()).collect());
        self
    }

    pub(super) fn set_base_path(&mut self, base_path: &Path) {
        self.base_path = base_path.to_path_buf();
    }

    /// The number of player lanes.
    pub fn players(&self) -> usize {
        self.players.unwrap_or(DEFAULT_PLAYERS)
    }

    /// Whether instrument selection is enabled.
    pub fn instrument_selectable(&self) -> bool {
        self.instrument_selectable.unwrap_or(false)
    }

    /// The glide gain.
    pub fn glide_gain(&self) -> f64 {
        self.glide_gain.unwrap_or(DEFAULT_GLIDE_GAIN)
    }

    /// The tick rate.
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate.unwrap_or(DEFAULT_FRAME_RATE)
    }

    /// Spinner steps per revolution.
    pub fn spinner_resolution(&self) -> u32 {
        self.spinner_resolution.unwrap_or(DEFAULT_SPINNER_RESOLUTION)
    }

    /// The instrument voice gain.
    pub fn volume(&self) -> f32 {
        self.volume.unwrap_or(DEFAULT_VOLUME)
    }

    /// The asset root, resolved against the config file's directory.
    pub fn assets(&self) -> PathBuf {
        let assets = Path::new(self.assets.as_deref().unwrap_or(DEFAULT_ASSETS));
        if assets.is_absolute() {
            assets.to_path_buf()
        } else {
            self.base_path.join(assets)
        }
    }

    /// The instrument the given player starts with.
    pub fn initial_instrument(&self, player: Player) -> String {
        self.instruments
            .as_ref()
            .and_then(|instruments| instruments.get(player.index()))
            .cloned()
            .unwrap_or_else(|| DEFAULT_INSTRUMENTS[player.index()].to_string())
    }

    /// The audio configuration.
    pub fn audio(&self) -> Audio {
        self.audio.clone().unwrap_or_default()
    }

    /// The input configuration.
    pub fn input(&self) -> Input {
        self.input.clone().unwrap_or_default()
    }

    /// The ambient tracks.
    pub fn ambience(&self) -> Vec<AmbientTrack> {
        self.ambience.clone().unwrap_or_default()
    }

    /// Checks every value that cannot be expressed in the types alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=2).contains(&self.players()) {
            return Err(ConfigError::invalid("players", "must be 1 or 2"));
        }
        if !self.glide_gain().is_finite() {
            return Err(ConfigError::invalid("glide_gain", "must be finite"));
        }
        if self.frame_rate() == 0 {
            return Err(ConfigError::invalid("frame_rate", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.volume()) {
            return Err(ConfigError::invalid("volume", "must be within 0 and 1"));
        }

        self.audio().validate()?;
        if let Input::Midi(midi) = self.input() {
            midi.validate()?;
        }
        for track in self.ambience() {
            track.validate()?;
        }
        Ok(())
    }
}
