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
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{LoadHooks, LoadReport, SamplerError, Voice, VoiceRequest};

/// A call made on a mock voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Call {
    Attack(f64),
    Release(f64),
    Disconnect,
}

/// Everything that happened to one voice.
#[derive(Clone, Debug)]
pub struct VoiceRecord {
    pub name: String,
    pub samples: usize,
    pub calls: Vec<Call>,
}

impl VoiceRecord {
    /// True once the voice has been disconnected.
    pub fn disconnected(&self) -> bool {
        self.calls.contains(&Call::Disconnect)
    }

    /// Calls made after the voice was disconnected.
    pub fn calls_after_disconnect(&self) -> usize {
        match self.calls.iter().position(|call| *call == Call::Disconnect) {
            Some(index) => self.calls.len() - index - 1,
            None => 0,
        }
    }
}

#[derive(Default)]
struct State {
    activations: usize,
    fail_activation: bool,
    failing_notes: HashSet<String>,
    voices: Vec<VoiceRecord>,
}

/// A sampler that records voice creations and every voice call.
#[derive(Clone, Default)]
pub struct Sampler {
    state: Arc<Mutex<State>>,
}

impl Sampler {
    pub fn new() -> Sampler {
        Sampler::default()
    }

    /// Makes activation fail.
    pub fn fail_activation(self) -> Self {
        self.state.lock().fail_activation = true;
        self
    }

    /// Reports a load failure for the given note on every voice.
    pub fn fail_note(self, note: &str) -> Self {
        self.state.lock().failing_notes.insert(note.to_string());
        self
    }

    /// The number of activate calls.
    pub fn activations(&self) -> usize {
        self.state.lock().activations
    }

    /// A snapshot of every voice ever created, in creation order.
    pub fn voices(&self) -> Vec<VoiceRecord> {
        self.state.lock().voices.clone()
    }

    /// The record for a single voice.
    pub fn voice(&self, index: usize) -> VoiceRecord {
        self.state.lock().voices[index].clone()
    }

    /// The number of voices created.
    pub fn voice_count(&self) -> usize {
        self.state.lock().voices.len()
    }

    /// The number of voices not yet disconnected.
    pub fn live_voices(&self) -> usize {
        self.state
            .lock()
            .voices
            .iter()
            .filter(|voice| !voice.disconnected())
            .count()
    }

    /// Clears recorded calls on every voice.
    pub fn clear_calls(&self) {
        for voice in self.state.lock().voices.iter_mut() {
            voice.calls.clear();
        }
    }
}

impl super::Sampler for Sampler {
    fn activate(&self) -> Result<(), SamplerError> {
        let mut state = self.state.lock();
        state.activations += 1;
        if state.fail_activation {
            return Err(SamplerError::Activation("mock activation failure".to_string()));
        }
        Ok(())
    }

    fn create_voice(&self, request: VoiceRequest, mut hooks: LoadHooks) -> Box<dyn Voice> {
        let (index, failing) = {
            let mut state = self.state.lock();
            state.voices.push(VoiceRecord {
                name: request.name.clone(),
                samples: request.samples.len(),
                calls: Vec::new(),
            });
            let failing: Vec<PathBuf> = request
                .samples
                .iter()
                .filter(|(note, _)| state.failing_notes.contains(*note))
                .map(|(_, path)| path.clone())
                .collect();
            (state.voices.len() - 1, failing)
        };

        // Loading completes immediately.
        for path in failing.iter() {
            hooks.error(&SamplerError::SampleLoadFailure {
                path: path.clone(),
                reason: "mock load failure".to_string(),
            });
        }
        hooks.loaded(LoadReport {
            name: request.name,
            loaded: request.samples.len() - failing.len(),
            failed: failing.len(),
            detached: false,
        });

        Box::new(MockVoice {
            index,
            state: self.state.clone(),
        })
    }
}

struct MockVoice {
    index: usize,
    state: Arc<Mutex<State>>,
}

impl MockVoice {
    fn record(&self, call: Call) {
        self.state.lock().voices[self.index].calls.push(call);
    }
}

impl Voice for MockVoice {
    fn attack(&mut self, frequency: f64) {
        self.record(Call::Attack(frequency));
    }

    fn release(&mut self, frequency: f64) {
        self.record(Call::Release(frequency));
    }

    fn disconnect(&mut self) {
        self.record(Call::Disconnect);
    }
}
