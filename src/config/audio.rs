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
use std::time::Duration;

use serde::Deserialize;

use super::error::{parse_duration, ConfigError};
use crate::sampler::RetriggerBehavior;

/// The sample rate used when none is configured.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_DEVICE: &str = "default";
const DEFAULT_CHANNELS: u16 = 2;
const DEFAULT_RELEASE: &str = "100ms";

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Audio {
    /// The audio device. "default" picks the host's default output.
    device: Option<String>,

    /// Target sample rate in Hz (default: 44100)
    sample_rate: Option<u32>,

    /// Output channels (default: 2)
    channels: Option<u16>,

    /// How long a released note takes to fade out (default: 100ms)
    release: Option<String>,

    /// What happens when a sounding note is attacked again (default: sustain)
    retrigger: Option<RetriggerBehavior>,
}

impl Audio {
    /// New will create a new Audio configuration.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: Some(device.to_string()),
            ..Default::default()
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(DEFAULT_DEVICE)
    }

    /// Returns the target sample rate (default: 44100)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the number of output channels (default: 2)
    pub fn channels(&self) -> u16 {
        self.channels.unwrap_or(DEFAULT_CHANNELS)
    }

    /// Returns the release time from the configuration.
    pub fn release(&self) -> Result<Duration, ConfigError> {
        parse_duration(
            "audio.release",
            self.release.as_deref().unwrap_or(DEFAULT_RELEASE),
        )
    }

    /// Returns the retrigger behavior (default: sustain)
    pub fn retrigger(&self) -> RetriggerBehavior {
        self.retrigger.unwrap_or_default()
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate() == 0 {
            return Err(ConfigError::invalid("audio.sample_rate", "must be positive"));
        }
        if self.channels() == 0 {
            return Err(ConfigError::invalid("audio.channels", "must be positive"));
        }
        self.release()?;
        Ok(())
    }
}
