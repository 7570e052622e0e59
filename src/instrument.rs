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

//! The compiled-in instrument catalog.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::pitch;

const NOTE_E2: f64 = 82.41;
const NOTE_BB4: f64 = 466.16;
const NOTE_DB3: f64 = 138.59;
const NOTE_AB5: f64 = 830.61;

const TROMBONE_SAMPLES: &[(&str, &str)] = &[
    ("A#1", "trombone/As1.ogg"),
    ("A#2", "trombone/As2.ogg"),
    ("A#3", "trombone/As3.ogg"),
    ("C3", "trombone/C3.ogg"),
    ("C4", "trombone/C4.ogg"),
    ("C#2", "trombone/Cs2.ogg"),
    ("C#4", "trombone/Cs4.ogg"),
    ("D3", "trombone/D3.ogg"),
    ("D4", "trombone/D4.ogg"),
    ("D#2", "trombone/Ds2.ogg"),
    ("D#3", "trombone/Ds3.ogg"),
    ("D#4", "trombone/Ds4.ogg"),
    ("F2", "trombone/F2.ogg"),
    ("F3", "trombone/F3.ogg"),
    ("F4", "trombone/F4.ogg"),
    ("G#2", "trombone/Gs2.ogg"),
    ("G#3", "trombone/Gs3.ogg"),
];

const SAXOPHONE_SAMPLES: &[(&str, &str)] = &[
    ("C#3", "saxophone/Cs3.ogg"),
    ("E3", "saxophone/E3.ogg"),
    ("G3", "saxophone/G3.ogg"),
    ("A#3", "saxophone/As3.ogg"),
    ("C#4", "saxophone/Cs4.ogg"),
    ("E4", "saxophone/E4.ogg"),
    ("G4", "saxophone/G4.ogg"),
    ("A#4", "saxophone/As4.ogg"),
    ("C#5", "saxophone/Cs5.ogg"),
    ("E5", "saxophone/E5.ogg"),
    ("G#5", "saxophone/Gs5.ogg"),
];

/// Errors raised while building the catalog or looking instruments up in it.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InstrumentError {
    #[error("unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("instrument {name} has an invalid range: {min} Hz to {max} Hz")]
    InvalidRange { name: String, min: f64, max: f64 },

    #[error("instrument {0} has no samples")]
    EmptySampleMap(String),

    #[error("instrument {name} has an invalid note name: {note}")]
    InvalidNote { name: String, note: String },

    #[error("instrument {0} is defined more than once")]
    Duplicate(String),

    #[error("the instrument catalog is empty")]
    EmptyCatalog,
}

/// A static description of a playable instrument.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct InstrumentProfile {
    name: String,
    min_frequency_hz: f64,
    max_frequency_hz: f64,
    /// Note name to sample path, relative to the asset root.
    sample_map: BTreeMap<String, String>,
}

impl InstrumentProfile {
    /// Creates and validates a new profile.
    pub fn new(
        name: &str,
        min_frequency_hz: f64,
        max_frequency_hz: f64,
        sample_map: BTreeMap<String, String>,
    ) -> Result<InstrumentProfile, InstrumentError> {
        let valid_range = min_frequency_hz.is_finite()
            && max_frequency_hz.is_finite()
            && min_frequency_hz > 0.0
            && min_frequency_hz < max_frequency_hz;
        if !valid_range {
            return Err(InstrumentError::InvalidRange {
                name: name.to_string(),
                min: min_frequency_hz,
                max: max_frequency_hz,
            });
        }

        if sample_map.is_empty() {
            return Err(InstrumentError::EmptySampleMap(name.to_string()));
        }

        if let Some(note) = sample_map
            .keys()
            .find(|note| pitch::parse_note_name(note).is_none())
        {
            return Err(InstrumentError::InvalidNote {
                name: name.to_string(),
                note: note.clone(),
            });
        }

        Ok(InstrumentProfile {
            name: name.to_string(),
            min_frequency_hz,
            max_frequency_hz,
            sample_map,
        })
    }

    fn from_static(
        name: &str,
        min_frequency_hz: f64,
        max_frequency_hz: f64,
        samples: &[(&str, &str)],
    ) -> Result<InstrumentProfile, InstrumentError> {
        InstrumentProfile::new(
            name,
            min_frequency_hz,
            max_frequency_hz,
            samples
                .iter()
                .map(|(note, file)| (note.to_string(), file.to_string()))
                .collect(),
        )
    }

    /// The instrument's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The frequency at slide position 0.
    pub fn min_frequency_hz(&self) -> f64 {
        self.min_frequency_hz
    }

    /// The frequency at slide position 100.
    pub fn max_frequency_hz(&self) -> f64 {
        self.max_frequency_hz
    }

    /// The note name to sample path mapping.
    pub fn sample_map(&self) -> &BTreeMap<String, String> {
        &self.sample_map
    }
}

impl fmt::Display for InstrumentProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.2} Hz - {:.2} Hz, samples: {})",
            self.name,
            self.min_frequency_hz,
            self.max_frequency_hz,
            self.sample_map.len()
        )
    }
}

/// An ordered, validated set of instruments. The first entry is the default.
#[derive(Clone, Debug)]
pub struct Catalog {
    profiles: Vec<InstrumentProfile>,
}

impl Catalog {
    /// Creates a catalog from the given profiles.
    pub fn new(profiles: Vec<InstrumentProfile>) -> Result<Catalog, InstrumentError> {
        if profiles.is_empty() {
            return Err(InstrumentError::EmptyCatalog);
        }

        for (i, profile) in profiles.iter().enumerate() {
            if profiles[..i].iter().any(|p| p.name == profile.name) {
                return Err(InstrumentError::Duplicate(profile.name.clone()));
            }
        }

        Ok(Catalog { profiles })
    }

    /// The instruments shipped with the cabinet.
    pub fn builtin() -> Result<Catalog, InstrumentError> {
        Catalog::new(vec![
            InstrumentProfile::from_static("trombone", NOTE_E2, NOTE_BB4, TROMBONE_SAMPLES)?,
            InstrumentProfile::from_static("saxophone", NOTE_DB3, NOTE_AB5, SAXOPHONE_SAMPLES)?,
        ])
    }

    /// Looks an instrument up by name.
    pub fn get(&self, name: &str) -> Result<&InstrumentProfile, InstrumentError> {
        self.profiles
            .iter()
            .find(|profile| profile.name == name)
            .ok_or_else(|| InstrumentError::UnknownInstrument(name.to_string()))
    }

    /// The default instrument.
    pub fn default_profile(&self) -> &InstrumentProfile {
        &self.profiles[0]
    }

    /// Returns the position of the named instrument within the catalog.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.profiles.iter().position(|profile| profile.name == name)
    }

    /// Returns the instrument at the given carousel index, wrapping around.
    pub fn at(&self, index: usize) -> &InstrumentProfile {
        &self.profiles[index % self.profiles.len()]
    }

    /// The number of instruments.
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Always false; a catalog cannot be built empty.
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Iterates over all instruments in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &InstrumentProfile> {
        self.profiles.iter()
    }
}
