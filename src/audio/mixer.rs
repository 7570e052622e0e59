// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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
// Core audio mixing logic that can be used by both CPAL and test implementations
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A mono source of samples at the mixer's sample rate.
pub trait SampleSource: Send {
    /// Returns the next sample, or None once the source is exhausted.
    fn next_sample(&mut self) -> Option<f32>;
}

#[derive(Default)]
struct SourceFlags {
    cancelled: AtomicBool,
    releasing: AtomicBool,
    finished: AtomicBool,
}

/// Shared control flags for a source. The voice keeps one clone, the mixer another.
#[derive(Clone, Default)]
pub struct SourceHandle {
    flags: Arc<SourceFlags>,
}

impl SourceHandle {
    /// Creates a new handle.
    pub fn new() -> SourceHandle {
        SourceHandle::default()
    }

    /// Stops the source at the next mixed frame.
    pub fn cancel(&self) {
        self.flags.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns true if the source has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.flags.cancelled.load(Ordering::Relaxed)
    }

    /// Asks the source to fade out.
    pub fn release(&self) {
        self.flags.releasing.store(true, Ordering::Relaxed);
    }

    /// Returns true if the source has been asked to fade out.
    pub fn is_releasing(&self) -> bool {
        self.flags.releasing.load(Ordering::Relaxed)
    }

    /// Returns true once the mixer has dropped the source.
    pub fn is_finished(&self) -> bool {
        self.flags.finished.load(Ordering::Relaxed)
    }

    fn finish(&self) {
        self.flags.finished.store(true, Ordering::Relaxed);
    }
}

/// Represents an active audio source in the mixer
pub struct ActiveSource {
    /// Unique ID for this source
    pub id: u64,
    /// The sample source
    pub source: Box<dyn SampleSource>,
    /// Control flags shared with whoever started the source
    pub handle: SourceHandle,
}

/// Core audio mixing logic that's independent of any audio backend
#[derive(Clone)]
pub struct AudioMixer {
    /// Active audio sources currently playing
    active_sources: Arc<Mutex<Vec<ActiveSource>>>,
    /// Number of output channels
    num_channels: u16,
    /// Sample rate
    sample_rate: u32,
}

impl AudioMixer {
    /// Creates a new audio mixer
    pub fn new(num_channels: u16, sample_rate: u32) -> Self {
        Self {
            active_sources: Arc::new(Mutex::new(Vec::new())),
            num_channels: num_channels.max(1),
            sample_rate,
        }
    }

    /// Adds a new audio source to the mixer
    pub fn add_source(&self, source: ActiveSource) {
        self.active_sources.lock().push(source);
    }

    /// Mixes `num_frames` interleaved frames into `output`, overwriting it.
    /// Every source is mono and is written to every output channel.
    pub fn process_into_output(&self, output: &mut [f32], num_frames: usize) {
        let channels = self.num_channels as usize;
        let len = (num_frames * channels).min(output.len());
        output[..len].fill(0.0);

        let mut sources = self.active_sources.lock();
        sources.retain_mut(|active_source| {
            if active_source.handle.is_cancelled() {
                active_source.handle.finish();
                return false;
            }

            for frame in output[..len].chunks_exact_mut(channels) {
                match active_source.source.next_sample() {
                    Some(sample) => frame.iter_mut().for_each(|out| *out += sample),
                    None => {
                        active_source.handle.finish();
                        return false;
                    }
                }
            }
            true
        });
    }

    /// Gets the number of sources currently being mixed
    pub fn active_count(&self) -> usize {
        self.active_sources.lock().len()
    }

    /// Cancels and drops every source
    pub fn clear(&self) {
        let mut sources = self.active_sources.lock();
        for source in sources.iter() {
            source.handle.cancel();
            source.handle.finish();
        }
        sources.clear();
    }

    /// Gets the number of output channels
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Gets the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
