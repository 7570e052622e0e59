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

//! Background tracks retriggered at random intervals.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::{self, ConfigError};
use crate::lane::VoiceBinding;
use crate::pitch;
use crate::sampler::Voice;

/// A track with its own voice and retrigger schedule.
struct Track {
    name: String,
    frequency: f64,
    min_interval: Duration,
    max_interval: Duration,
    binding: VoiceBinding,
    next: Instant,
}

/// Schedules every ambient track.
pub struct Ambience<R = StdRng> {
    tracks: Vec<Track>,
    rng: R,
}

impl Ambience<StdRng> {
    /// Creates an empty schedule seeded from the OS.
    pub fn from_entropy() -> Ambience<StdRng> {
        Ambience::new(StdRng::from_entropy())
    }
}

impl<R: Rng> Ambience<R> {
    /// Creates an empty schedule drawing intervals from the given RNG.
    pub fn new(rng: R) -> Ambience<R> {
        Ambience {
            tracks: Vec::new(),
            rng,
        }
    }

    /// Starts a track: its note sounds now and is retriggered later.
    pub fn add_track(
        &mut self,
        config: &config::AmbientTrack,
        voice: Box<dyn Voice>,
        now: Instant,
    ) -> Result<(), ConfigError> {
        let (min_interval, max_interval) = config.interval()?;
        let midi = pitch::parse_note_name(config.note()).ok_or_else(|| ConfigError::Invalid {
            field: "ambience.note".to_string(),
            reason: format!("{} is not a note name", config.note()),
        })?;

        let mut binding = VoiceBinding::new();
        binding.bind(voice);
        let mut track = Track {
            name: config.name().to_string(),
            frequency: pitch::midi_to_frequency(midi as f64),
            min_interval,
            max_interval,
            binding,
            next: now,
        };
        self.retrigger(&mut track, now);
        info!(track = track.name, "Ambient track started.");
        self.tracks.push(track);
        Ok(())
    }

    /// Retriggers every track that is due. Returns how many were retriggered.
    pub fn poll(&mut self, now: Instant) -> usize {
        let mut tracks = std::mem::take(&mut self.tracks);
        let mut retriggered = 0;
        for track in tracks.iter_mut().filter(|track| track.next <= now) {
            self.retrigger(track, now);
            retriggered += 1;
        }
        self.tracks = tracks;
        retriggered
    }

    fn retrigger(&mut self, track: &mut Track, now: Instant) {
        // Releasing a note that is not sounding is harmless.
        let _ = track.binding.release(track.frequency);
        let _ = track.binding.attack(track.frequency);

        let wait = if track.min_interval == track.max_interval {
            track.min_interval
        } else {
            self.rng.gen_range(track.min_interval..=track.max_interval)
        };
        track.next = now + wait;
        debug!(track = track.name, wait = ?wait, "Ambient track retriggered.");
    }

    /// The number of tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
