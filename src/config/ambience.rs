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
use crate::pitch;

const DEFAULT_NOTE: &str = "C4";
const DEFAULT_VOLUME: f32 = 0.5;

/// A sample retriggered in the background at random intervals.
#[derive(Deserialize, Clone, Debug)]
pub struct AmbientTrack {
    /// A label for logging.
    name: String,
    /// The sample file, relative to the asset root.
    sample: String,
    /// The note the sample is pitched at; it is always played back at this note.
    note: Option<String>,
    /// Linear gain in [0, 1] (default: 0.5)
    volume: Option<f32>,
    /// The shortest time between retriggers.
    min_interval: String,
    /// The longest time between retriggers.
    max_interval: String,
}

impl AmbientTrack {
    #[cfg(test)]
    pub fn new(name: &str, sample: &str, min_interval: &str, max_interval: &str) -> AmbientTrack {
        AmbientTrack {
            name: name.to_string(),
            sample: sample.to_string(),
            note: None,
            volume: None,
            min_interval: min_interval.to_string(),
            max_interval: max_interval.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample(&self) -> &str {
        &self.sample
    }

    /// The note name the sample is registered under (default: C4)
    pub fn note(&self) -> &str {
        self.note.as_deref().unwrap_or(DEFAULT_NOTE)
    }

    pub fn volume(&self) -> f32 {
        self.volume.unwrap_or(DEFAULT_VOLUME)
    }

    /// The retrigger interval bounds.
    pub fn interval(&self) -> Result<(Duration, Duration), ConfigError> {
        let min = parse_duration("ambience.min_interval", &self.min_interval)?;
        let max = parse_duration("ambience.max_interval", &self.max_interval)?;
        Ok((min, max))
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = self.interval()?;
        if min.is_zero() || min > max {
            return Err(ConfigError::invalid(
                "ambience",
                format!(
                    "track {} needs 0 < min_interval <= max_interval",
                    self.name
                ),
            ));
        }
        if pitch::parse_note_name(self.note()).is_none() {
            return Err(ConfigError::invalid(
                "ambience.note",
                format!("{} is not a note name", self.note()),
            ));
        }
        if !(0.0..=1.0).contains(&self.volume()) {
            return Err(ConfigError::invalid("ambience.volume", "must be within 0 and 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambient_track_defaults() {
        let track = AmbientTrack::new("crowd", "crowd/clap.ogg", "5s", "20s");
        assert_eq!(track.note(), "C4");
        assert_eq!(track.volume(), 0.5);
        assert_eq!(
            track.interval().unwrap(),
            (Duration::from_secs(5), Duration::from_secs(20))
        );
        assert!(track.validate().is_ok());
    }

    #[test]
    fn test_ambient_track_validation() {
        assert!(AmbientTrack::new("a", "a.ogg", "20s", "5s")
            .validate()
            .is_err());
        assert!(AmbientTrack::new("a", "a.ogg", "0s", "5s")
            .validate()
            .is_err());
        assert!(matches!(
            AmbientTrack::new("a", "a.ogg", "later", "5s").validate(),
            Err(ConfigError::Duration { .. })
        ));
    }
}
