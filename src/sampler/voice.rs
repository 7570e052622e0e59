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

//! Pitched playback of a loaded sample and the per-voice sample bank.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, trace, warn};

use crate::audio::{self, ActiveSource, SampleSource, SourceHandle};
use crate::pitch;

use super::loader::LoadedSample;
use super::{RetriggerBehavior, SamplerError, Voice};

/// How far from the requested key a substitute sample may be.
const MAX_SAMPLE_DISTANCE: u8 = 96;

/// Plays a mono sample at a fixed rate, fading out once its handle is released.
pub(super) struct PitchedSource {
    data: Arc<Vec<f32>>,
    position: f64,
    rate: f64,
    volume: f32,
    handle: SourceHandle,
    release_samples: usize,
    release_remaining: Option<usize>,
}

impl PitchedSource {
    pub(super) fn new(
        data: Arc<Vec<f32>>,
        rate: f64,
        volume: f32,
        handle: SourceHandle,
        release_samples: usize,
    ) -> PitchedSource {
        PitchedSource {
            data,
            position: 0.0,
            rate,
            volume,
            handle,
            release_samples,
            release_remaining: None,
        }
    }
}

impl SampleSource for PitchedSource {
    fn next_sample(&mut self) -> Option<f32> {
        let index = self.position as usize;
        let s0 = *self.data.get(index)?;
        let s1 = self.data.get(index + 1).copied().unwrap_or(s0);
        let frac = self.position.fract() as f32;
        self.position += self.rate;

        let mut gain = self.volume;
        if self.handle.is_releasing() {
            let remaining = self.release_remaining.get_or_insert(self.release_samples);
            if *remaining == 0 {
                return None;
            }
            gain *= *remaining as f32 / self.release_samples as f32;
            *remaining -= 1;
        }

        Some((s0 + (s1 - s0) * frac) * gain)
    }
}

/// Finds the loaded sample note closest to the key, preferring the higher
/// neighbour when two are equally close.
pub(super) fn closest_note<T>(bank: &BTreeMap<u8, T>, key: u8) -> Option<u8> {
    (0..=MAX_SAMPLE_DISTANCE).find_map(|interval| {
        let above = key.checked_add(interval).filter(|n| bank.contains_key(n));
        let below = key.checked_sub(interval).filter(|n| bank.contains_key(n));
        above.or(below)
    })
}

/// The sample bank a voice plays from. Filled by the background load.
#[derive(Default)]
pub(super) struct VoiceBank {
    samples: RwLock<BTreeMap<u8, LoadedSample>>,
    detached: AtomicBool,
}

impl VoiceBank {
    pub(super) fn insert(&self, note: u8, sample: LoadedSample) {
        self.samples.write().insert(note, sample);
    }

    pub(super) fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Relaxed)
    }

    fn detach(&self) -> bool {
        self.detached.swap(true, Ordering::Relaxed)
    }

    pub(super) fn len(&self) -> usize {
        self.samples.read().len()
    }
}

/// A voice backed by pitched samples mixed through an audio device.
pub(super) struct SampleVoice {
    name: String,
    bank: Arc<VoiceBank>,
    device: Arc<dyn audio::Device>,
    volume: f32,
    release_samples: usize,
    retrigger: RetriggerBehavior,
    /// Sounding sources by rounded MIDI key.
    active: HashMap<u8, Vec<SourceHandle>>,
}

impl SampleVoice {
    pub(super) fn new(
        name: String,
        bank: Arc<VoiceBank>,
        device: Arc<dyn audio::Device>,
        volume: f32,
        release_samples: usize,
        retrigger: RetriggerBehavior,
    ) -> SampleVoice {
        SampleVoice {
            name,
            bank,
            device,
            volume,
            release_samples,
            retrigger,
            active: HashMap::new(),
        }
    }

    fn key_for(frequency: f64) -> Option<(u8, f64)> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return None;
        }
        let midi = pitch::frequency_to_midi(frequency);
        Some((midi.round().clamp(0.0, 127.0) as u8, midi))
    }

    fn start_source(&mut self, key: u8, midi: f64) {
        let (sample_note, data) = {
            let samples = self.bank.samples.read();
            let Some(sample_note) = closest_note(&samples, key) else {
                trace!(voice = self.name, key, "No sample loaded for key");
                return;
            };
            (sample_note, samples[&sample_note].data())
        };

        let rate = pitch::interval_to_ratio(midi - sample_note as f64);
        let handle = SourceHandle::new();
        let source = PitchedSource::new(
            data,
            rate,
            self.volume,
            handle.clone(),
            self.release_samples,
        );

        let active_source = ActiveSource {
            id: audio::next_source_id(),
            source: Box::new(source),
            handle: handle.clone(),
        };
        if let Err(e) = self.device.add_source(active_source) {
            let err = SamplerError::Output(e.to_string());
            error!(voice = self.name, err = %err, "Failed to start source");
            return;
        }

        trace!(voice = self.name, key, sample_note, rate, "Source started");
        self.active.entry(key).or_default().push(handle);
    }
}

impl Voice for SampleVoice {
    fn attack(&mut self, frequency: f64) {
        if self.bank.is_detached() {
            return;
        }
        let Some((key, midi)) = Self::key_for(frequency) else {
            warn!(voice = self.name, frequency, "Ignoring attack at invalid frequency");
            return;
        };

        let sounding = self.active.entry(key).or_default();
        sounding.retain(|handle| !handle.is_finished());
        match self.retrigger {
            RetriggerBehavior::Sustain if !sounding.is_empty() => return,
            RetriggerBehavior::Cut => sounding.drain(..).for_each(|handle| handle.cancel()),
            _ => {}
        }

        self.start_source(key, midi);
    }

    fn release(&mut self, frequency: f64) {
        if self.bank.is_detached() {
            return;
        }
        let Some((key, _)) = Self::key_for(frequency) else {
            return;
        };

        if let Some(handles) = self.active.remove(&key) {
            for handle in handles {
                handle.release();
            }
        }
    }

    fn disconnect(&mut self) {
        if self.bank.detach() {
            return;
        }
        let stopped: usize = self
            .active
            .drain()
            .map(|(_, handles)| {
                handles.iter().for_each(|handle| handle.cancel());
                handles.len()
            })
            .sum();
        debug!(voice = self.name, stopped, "Voice disconnected");
    }
}

impl Drop for SampleVoice {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank(notes: &[u8]) -> BTreeMap<u8, ()> {
        notes.iter().map(|note| (*note, ())).collect()
    }

    #[test]
    fn test_closest_note() {
        let bank = bank(&[40, 46, 52]);
        assert_eq!(closest_note(&bank, 40), Some(40));
        assert_eq!(closest_note(&bank, 42), Some(40));
        // Equidistant between 40 and 46: the higher sample wins.
        assert_eq!(closest_note(&bank, 43), Some(46));
        assert_eq!(closest_note(&bank, 0), Some(40));
        assert_eq!(closest_note(&bank, 127), Some(52));
        assert_eq!(closest_note(&BTreeMap::<u8, ()>::new(), 60), None);
    }

    #[test]
    fn test_closest_note_limit() {
        let bank = bank(&[0]);
        assert_eq!(closest_note(&bank, 96), Some(0));
        assert_eq!(closest_note(&bank, 97), None);
    }

    #[test]
    fn test_pitched_source_rate() {
        let data = Arc::new(vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        let mut source = PitchedSource::new(data, 0.5, 1.0, SourceHandle::new(), 0);

        let samples: Vec<f32> = std::iter::from_fn(|| source.next_sample()).collect();
        assert_eq!(samples, vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.0]);
    }

    #[test]
    fn test_pitched_source_release_fades_out() {
        let data = Arc::new(vec![1.0; 100]);
        let handle = SourceHandle::new();
        let mut source = PitchedSource::new(data, 1.0, 0.5, handle.clone(), 4);

        assert_eq!(source.next_sample(), Some(0.5));
        handle.release();
        assert_eq!(source.next_sample(), Some(0.5));
        assert_eq!(source.next_sample(), Some(0.375));
        assert_eq!(source.next_sample(), Some(0.25));
        assert_eq!(source.next_sample(), Some(0.125));
        assert_eq!(source.next_sample(), None);
    }

    #[test]
    fn test_zero_release_stops_immediately() {
        let handle = SourceHandle::new();
        let mut source = PitchedSource::new(Arc::new(vec![1.0; 10]), 1.0, 1.0, handle.clone(), 0);
        handle.release();
        assert_eq!(source.next_sample(), None);
    }
}
