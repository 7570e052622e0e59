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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use tracing::info;

use super::mixer::{ActiveSource, AudioMixer};

/// A mock device. Mixes into memory instead of an audio interface.
#[derive(Clone)]
pub struct Device {
    name: String,
    mixer: AudioMixer,
    start_count: Arc<AtomicUsize>,
    sources_added: Arc<AtomicUsize>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str, sample_rate: u32) -> Device {
        Device {
            name: name.to_string(),
            mixer: AudioMixer::new(1, sample_rate),
            start_count: Arc::new(AtomicUsize::new(0)),
            sources_added: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Mixes the given number of mono frames.
    pub fn render(&self, num_frames: usize) -> Vec<f32> {
        let mut output = vec![0.0; num_frames];
        self.mixer.process_into_output(&mut output, num_frames);
        output
    }

    /// Returns true once the device has been started.
    pub fn is_started(&self) -> bool {
        self.start_count.load(Ordering::Relaxed) > 0
    }

    /// The number of times start was called.
    pub fn start_count(&self) -> usize {
        self.start_count.load(Ordering::Relaxed)
    }

    /// The total number of sources ever added.
    pub fn sources_added(&self) -> usize {
        self.sources_added.load(Ordering::Relaxed)
    }

    /// The number of sources currently mixing.
    pub fn active_sources(&self) -> usize {
        self.mixer.active_count()
    }
}

impl super::Device for Device {
    fn start(&self) -> Result<(), Box<dyn Error>> {
        if self.start_count.fetch_add(1, Ordering::Relaxed) == 0 {
            info!(device = self.name, "Audio output started.");
        }
        Ok(())
    }

    fn add_source(&self, source: ActiveSource) -> Result<(), Box<dyn Error>> {
        self.sources_added.fetch_add(1, Ordering::Relaxed);
        self.mixer.add_source(source);
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<Device>, Box<dyn Error>> {
        Ok(Arc::new(self.clone()))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}
