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
use midly::num::{u4, u7};
use serde::Deserialize;

use super::error::ConfigError;
use crate::input::{Button, Player};

/// Allows users to pick where cabinet input comes from.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Input {
    /// Line commands on standard input.
    #[default]
    Keyboard,
    /// A MIDI device, usually the cabinet's encoder board.
    Midi(MidiInput),
}

/// How a spinner encodes relative motion in a control change value.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpinnerEncoding {
    /// 64 is at rest, 65 is +1, 63 is -1.
    #[default]
    Offset64,
    /// 1 is +1, 127 is -1.
    TwosComplement,
}

impl SpinnerEncoding {
    /// Decodes a relative control change value into signed steps.
    pub fn decode(self, value: u8) -> i64 {
        let value = i64::from(value & 0x7f);
        match self {
            SpinnerEncoding::Offset64 => value - 64,
            SpinnerEncoding::TwosComplement if value >= 64 => value - 128,
            SpinnerEncoding::TwosComplement => value,
        }
    }
}

fn channel(channel: u8) -> Result<u4, ConfigError> {
    channel
        .checked_sub(1)
        .and_then(u4::try_from)
        .ok_or_else(|| ConfigError::invalid("input.channel", format!("{} is not 1-16", channel)))
}

fn data_byte(field: &str, value: u8) -> Result<u7, ConfigError> {
    u7::try_from(value).ok_or_else(|| ConfigError::invalid(field, format!("{} is not 0-127", value)))
}

/// Maps a MIDI note to a player's button.
#[derive(Deserialize, Clone, Debug)]
pub struct ButtonBinding {
    player: Player,
    button: Button,
    channel: u8,
    note: u8,
}

impl ButtonBinding {
    pub fn player(&self) -> Player {
        self.player
    }

    pub fn button(&self) -> Button {
        self.button
    }

    /// The zero based MIDI channel.
    pub fn channel(&self) -> Result<u4, ConfigError> {
        channel(self.channel)
    }

    pub fn note(&self) -> Result<u7, ConfigError> {
        data_byte("input.buttons.note", self.note)
    }
}

/// Maps a relative MIDI controller to a player's spinner.
#[derive(Deserialize, Clone, Debug)]
pub struct SpinnerBinding {
    player: Player,
    channel: u8,
    controller: u8,
    encoding: Option<SpinnerEncoding>,
}

impl SpinnerBinding {
    pub fn player(&self) -> Player {
        self.player
    }

    /// The zero based MIDI channel.
    pub fn channel(&self) -> Result<u4, ConfigError> {
        channel(self.channel)
    }

    pub fn controller(&self) -> Result<u7, ConfigError> {
        data_byte("input.spinners.controller", self.controller)
    }

    pub fn encoding(&self) -> SpinnerEncoding {
        self.encoding.unwrap_or_default()
    }
}

/// Maps a MIDI note to a one or two player start button.
#[derive(Deserialize, Clone, Debug)]
pub struct StartBinding {
    players: usize,
    channel: u8,
    note: u8,
}

impl StartBinding {
    pub fn players(&self) -> usize {
        self.players
    }

    /// The zero based MIDI channel.
    pub fn channel(&self) -> Result<u4, ConfigError> {
        channel(self.channel)
    }

    pub fn note(&self) -> Result<u7, ConfigError> {
        data_byte("input.start.note", self.note)
    }
}

/// The configuration that maps MIDI input to cabinet controls.
#[derive(Deserialize, Clone, Debug)]
pub struct MidiInput {
    /// The MIDI device.
    device: String,
    /// Button bindings.
    #[serde(default)]
    buttons: Vec<ButtonBinding>,
    /// Spinner bindings.
    #[serde(default)]
    spinners: Vec<SpinnerBinding>,
    /// Start button bindings.
    #[serde(default)]
    start: Vec<StartBinding>,
}

impl MidiInput {
    #[cfg(test)]
    pub fn new(
        device: &str,
        buttons: Vec<ButtonBinding>,
        spinners: Vec<SpinnerBinding>,
        start: Vec<StartBinding>,
    ) -> MidiInput {
        MidiInput {
            device: device.to_string(),
            buttons,
            spinners,
            start,
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn buttons(&self) -> &[ButtonBinding] {
        &self.buttons
    }

    pub fn spinners(&self) -> &[SpinnerBinding] {
        &self.spinners
    }

    pub fn start(&self) -> &[StartBinding] {
        &self.start
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        for binding in self.buttons.iter() {
            binding.channel()?;
            binding.note()?;
        }
        for binding in self.spinners.iter() {
            binding.channel()?;
            binding.controller()?;
        }
        for binding in self.start.iter() {
            binding.channel()?;
            binding.note()?;
            if !(1..=2).contains(&binding.players) {
                return Err(ConfigError::invalid(
                    "input.start.players",
                    format!("{} is not 1 or 2", binding.players),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
impl ButtonBinding {
    pub fn new(player: Player, button: Button, channel: u8, note: u8) -> ButtonBinding {
        ButtonBinding {
            player,
            button,
            channel,
            note,
        }
    }
}

#[cfg(test)]
impl SpinnerBinding {
    pub fn new(
        player: Player,
        channel: u8,
        controller: u8,
        encoding: Option<SpinnerEncoding>,
    ) -> SpinnerBinding {
        SpinnerBinding {
            player,
            channel,
            controller,
            encoding,
        }
    }
}

#[cfg(test)]
impl StartBinding {
    pub fn new(players: usize, channel: u8, note: u8) -> StartBinding {
        StartBinding {
            players,
            channel,
            note,
        }
    }
}
