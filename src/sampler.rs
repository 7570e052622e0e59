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

//! Sample-based voices that can sound arbitrary pitches.
//!
//! This module provides:
//! - The `Sampler` and `Voice` capabilities the lanes drive
//! - Background sample loading and caching
//! - A pitched sample engine mixed through an audio device
//! - A recording mock for tests

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::instrument::InstrumentProfile;

mod engine;
mod loader;
#[cfg(test)]
pub mod mock;
mod voice;

pub use engine::SampleEngine;
pub use loader::{LoadedSample, SampleLoader};

/// Errors produced by the sampler. None of them are fatal to a session.
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SamplerError {
    #[error("failed to load sample {path}: {reason}")]
    SampleLoadFailure { path: PathBuf, reason: String },

    #[error("failed to activate audio output: {0}")]
    Activation(String),

    #[error("failed to send source to audio output: {0}")]
    Output(String),
}

/// Behavior when a key is attacked while a source for it is still sounding.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RetriggerBehavior {
    /// Keep the sounding source; the attack is absorbed.
    #[default]
    Sustain,
    /// Stop the sounding source and start a new one.
    Cut,
    /// Start another source alongside the sounding one.
    Polyphonic,
}

/// A single audio-producing handle bound to one instrument's sample set.
pub trait Voice: Send {
    /// Starts sounding the given frequency.
    fn attack(&mut self, frequency: f64);

    /// Stops sounding the given frequency.
    fn release(&mut self, frequency: f64);

    /// Stops everything and detaches the voice. Later calls are no-ops.
    fn disconnect(&mut self);
}

/// Everything needed to construct a voice.
#[derive(Clone, Debug)]
pub struct VoiceRequest {
    /// A label for logging, usually the instrument name.
    pub name: String,
    /// Note name to sample path.
    pub samples: BTreeMap<String, PathBuf>,
    /// Linear gain in [0, 1].
    pub volume: f32,
}

impl VoiceRequest {
    /// Builds a request for an instrument, resolving sample paths against the asset root.
    pub fn for_instrument(
        profile: &InstrumentProfile,
        assets: &std::path::Path,
        volume: f32,
    ) -> Self {
        VoiceRequest {
            name: profile.name().to_string(),
            samples: profile
                .sample_map()
                .iter()
                .map(|(note, file)| (note.clone(), assets.join(file)))
                .collect(),
            volume,
        }
    }
}

type LoadCallback = Box<dyn FnOnce(LoadReport) + Send>;
type ErrorCallback = Box<dyn Fn(&SamplerError) + Send + Sync>;

/// Completion and error callbacks for a voice's background load.
#[derive(Default)]
pub struct LoadHooks {
    on_load: Option<LoadCallback>,
    on_error: Option<ErrorCallback>,
}

impl LoadHooks {
    /// Creates hooks that do nothing.
    pub fn new() -> LoadHooks {
        LoadHooks::default()
    }

    /// Called once when loading finishes, whether or not every sample loaded.
    pub fn on_load<F>(mut self, f: F) -> Self
    where
        F: FnOnce(LoadReport) + Send + 'static,
    {
        self.on_load = Some(Box::new(f));
        self
    }

    /// Called once per sample that failed to load.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&SamplerError) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    pub(crate) fn loaded(&mut self, report: LoadReport) {
        if let Some(on_load) = self.on_load.take() {
            on_load(report);
        }
    }

    pub(crate) fn error(&self, error: &SamplerError) {
        if let Some(on_error) = &self.on_error {
            on_error(error);
        }
    }
}

impl fmt::Debug for LoadHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadHooks")
            .field("on_load", &self.on_load.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Summary of a finished background load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadReport {
    /// The voice's name.
    pub name: String,
    /// Samples that loaded successfully.
    pub loaded: usize,
    /// Samples that failed to load.
    pub failed: usize,
    /// True if the voice was disconnected before loading finished.
    pub detached: bool,
}

/// Produces voices and controls the shared audio output.
pub trait Sampler: Send + Sync {
    /// Unlocks audio output. Called once when the session starts.
    fn activate(&self) -> Result<(), SamplerError>;

    /// Creates a voice. Loading proceeds in the background; the voice is usable
    /// immediately and stays silent for notes that have not loaded yet.
    fn create_voice(&self, request: VoiceRequest, hooks: LoadHooks) -> Box<dyn Voice>;
}
