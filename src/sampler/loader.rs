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

//! Sample decoding and caching.
//!
//! Samples are decoded entirely into memory, down-mixed to mono and converted
//! to the output sample rate so that playback only has to resample for pitch.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rayon::prelude::*;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info};

use super::SamplerError;

/// A decoded mono sample. The data is shared between every source playing it.
#[derive(Clone)]
pub struct LoadedSample {
    data: Arc<Vec<f32>>,
    sample_rate: u32,
}

impl LoadedSample {
    /// Wraps already decoded mono samples.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> LoadedSample {
        LoadedSample {
            data: Arc::new(samples),
            sample_rate,
        }
    }

    /// The mono sample data.
    pub fn data(&self) -> Arc<Vec<f32>> {
        self.data.clone()
    }

    /// The sample rate of the data.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The number of frames.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the sample holds no audio.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The playback duration at the native rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.data.len() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

/// Loads samples and caches them by path. Safe to share between load threads.
pub struct SampleLoader {
    cache: Mutex<HashMap<PathBuf, LoadedSample>>,
    /// Target sample rate (matches audio output).
    target_sample_rate: u32,
}

impl SampleLoader {
    /// Creates a new sample loader.
    pub fn new(target_sample_rate: u32) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            target_sample_rate,
        }
    }

    /// Loads a sample from a file into memory.
    /// Returns a cached version if already loaded.
    pub fn load(&self, path: &Path) -> Result<LoadedSample, SamplerError> {
        if let Some(sample) = self.cache.lock().get(path) {
            debug!(path = ?path, "Using cached sample");
            return Ok(sample.clone());
        }

        let failure = |reason: String| SamplerError::SampleLoadFailure {
            path: path.to_path_buf(),
            reason,
        };

        let (samples, source_sample_rate) = decode_mono(path).map_err(failure)?;
        let samples = if source_sample_rate != self.target_sample_rate {
            debug!(
                source_rate = source_sample_rate,
                target_rate = self.target_sample_rate,
                "Transcoding sample"
            );
            transcode(&samples, source_sample_rate, self.target_sample_rate)
        } else {
            samples
        };

        let loaded = LoadedSample::from_samples(samples, self.target_sample_rate);
        info!(
            path = ?path,
            sample_rate = loaded.sample_rate(),
            duration_ms = loaded.duration().as_millis(),
            memory_kb = loaded.memory_size() / 1024,
            "Sample loaded"
        );

        // Two loads of the same path may race; either result is equivalent.
        self.cache
            .lock()
            .insert(path.to_path_buf(), loaded.clone());

        Ok(loaded)
    }

    /// Loads every sample of a note map in parallel. Each note gets its own result
    /// so that one bad file does not take the rest of the instrument down with it.
    pub fn load_all(
        &self,
        samples: &BTreeMap<String, PathBuf>,
    ) -> Vec<(String, Result<LoadedSample, SamplerError>)> {
        samples
            .par_iter()
            .map(|(note, path)| (note.clone(), self.load(path)))
            .collect()
    }

    /// Returns the number of cached samples.
    pub fn cached_count(&self) -> usize {
        self.cache.lock().len()
    }

    /// Returns the total memory used by cached samples.
    pub fn total_memory_usage(&self) -> usize {
        self.cache.lock().values().map(|s| s.memory_size()).sum()
    }

    /// The rate every loaded sample is converted to.
    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("cached_samples", &self.cached_count())
            .field("target_sample_rate", &self.target_sample_rate)
            .field("total_memory_kb", &(self.total_memory_usage() / 1024))
            .finish()
    }
}

/// Decodes an entire file and averages its channels down to mono.
fn decode_mono(path: &Path) -> Result<(Vec<f32>, u32), String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| e.to_string())?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| "no audio track found".to_string())?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| "sample rate not specified".to_string())?;

    let decoder_opts: DecoderOptions = Default::default();
    let mut decoder = get_codecs()
        .make(&track.codec_params, &decoder_opts)
        .map_err(|e| e.to_string())?;

    let mut mono = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.to_string()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Skip corrupt packets rather than failing the whole sample.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(path = ?path, err = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e.to_string()),
        };

        let channels = decoded.spec().channels.count().max(1);
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        buffer.copy_interleaved_ref(decoded);
        mono.extend(
            buffer
                .samples()
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    if mono.is_empty() {
        return Err("file contains no audio".to_string());
    }

    Ok((mono, sample_rate))
}

/// Converts mono samples between sample rates using linear interpolation.
fn transcode(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    let ratio = target_rate as f64 / source_rate as f64;
    let target_frames = (samples.len() as f64 * ratio).ceil() as usize;

    (0..target_frames)
        .map(|target_frame| {
            let source_pos = target_frame as f64 / ratio;
            let index = source_pos.floor() as usize;
            let frac = source_pos.fract() as f32;

            let s0 = samples.get(index).copied().unwrap_or(0.0);
            let s1 = samples.get(index + 1).copied().unwrap_or(s0);
            s0 + (s1 - s0) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{write_constant_wav, write_wav};

    #[test]
    fn test_transcode_samples() {
        let source_rate = 44100;
        let target_rate = 48000;
        let source_samples: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / source_rate as f32).sin())
            .collect();

        let result = transcode(&source_samples, source_rate, target_rate);

        let expected_len = (4410.0_f64 * 48000.0 / 44100.0).ceil() as usize;
        assert_eq!(result.len(), expected_len);
        assert!((result[0] - source_samples[0]).abs() < 1e-6);
    }

    #[test]
    fn test_load_downmixes_to_mono() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("stereo.wav");
        write_wav(&path, &[vec![0.5; 100], vec![0.25; 100]], 44100).unwrap();

        let loader = SampleLoader::new(44100);
        let sample = loader.load(&path).unwrap();

        assert_eq!(sample.len(), 100);
        assert_eq!(sample.sample_rate(), 44100);
        for value in sample.data().iter() {
            assert!((value - 0.375).abs() < 1e-6);
        }
    }

    #[test]
    fn test_load_transcodes_and_caches() {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("c4.wav");
        write_constant_wav(&path, 0.5, 22050, 22050).unwrap();

        let loader = SampleLoader::new(44100);
        let first = loader.load(&path).unwrap();
        assert_eq!(first.sample_rate(), 44100);
        assert_eq!(first.len(), 44100);
        assert_eq!(loader.cached_count(), 1);

        // The second load comes from the cache even if the file disappears.
        std::fs::remove_file(&path).unwrap();
        let second = loader.load(&path).unwrap();
        assert!(Arc::ptr_eq(&first.data(), &second.data()));
    }

    #[test]
    fn test_load_all_reports_each_note() {
        let tempdir = tempfile::tempdir().unwrap();
        let good = tempdir.path().join("good.wav");
        write_constant_wav(&good, 0.1, 64, 44100).unwrap();
        let garbage = tempdir.path().join("garbage.wav");
        std::fs::write(&garbage, b"definitely not audio").unwrap();

        let samples = BTreeMap::from([
            ("C3".to_string(), good.clone()),
            ("D3".to_string(), garbage.clone()),
            ("E3".to_string(), tempdir.path().join("missing.wav")),
        ]);

        let loader = SampleLoader::new(44100);
        let results: HashMap<_, _> = loader.load_all(&samples).into_iter().collect();

        assert!(results["C3"].is_ok());
        assert!(matches!(
            &results["D3"],
            Err(SamplerError::SampleLoadFailure { path, .. }) if *path == garbage
        ));
        assert!(results["E3"].is_err());
        assert_eq!(loader.cached_count(), 1);
    }
}
