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

//! The sample engine: turns voice requests into sample-backed voices.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, span, warn, Level};

use crate::audio;
use crate::pitch;

use super::loader::SampleLoader;
use super::voice::{SampleVoice, VoiceBank};
use super::{LoadHooks, LoadReport, RetriggerBehavior, Sampler, SamplerError, Voice, VoiceRequest};

/// Produces voices that play pitched samples through an audio device.
pub struct SampleEngine {
    device: Arc<dyn audio::Device>,
    loader: Arc<SampleLoader>,
    release: Duration,
    retrigger: RetriggerBehavior,
}

impl SampleEngine {
    /// Creates a new engine mixing into the given device.
    pub fn new(
        device: Arc<dyn audio::Device>,
        release: Duration,
        retrigger: RetriggerBehavior,
    ) -> SampleEngine {
        let loader = Arc::new(SampleLoader::new(device.sample_rate()));
        SampleEngine {
            device,
            loader,
            release,
            retrigger,
        }
    }

    /// The loader shared by every voice this engine creates.
    pub fn loader(&self) -> &Arc<SampleLoader> {
        &self.loader
    }

    fn release_samples(&self) -> usize {
        (self.release.as_secs_f64() * self.device.sample_rate() as f64).round() as usize
    }
}

/// Loads a request's samples into the bank, unless the voice has gone away first.
fn load_bank(
    loader: &SampleLoader,
    bank: &VoiceBank,
    request: &VoiceRequest,
    mut hooks: LoadHooks,
) {
    let span = span!(Level::INFO, "voice load", voice = request.name);
    let _enter = span.enter();

    let results = loader.load_all(&request.samples);

    if bank.is_detached() {
        debug!("Voice detached before loading finished, discarding samples");
        hooks.loaded(LoadReport {
            name: request.name.clone(),
            loaded: 0,
            failed: 0,
            detached: true,
        });
        return;
    }

    let mut failed = 0;
    for (note, result) in results {
        let parsed = pitch::parse_note_name(&note);
        match (parsed, result) {
            (Some(midi), Ok(sample)) => bank.insert(midi, sample),
            (None, _) => {
                failed += 1;
                hooks.error(&SamplerError::SampleLoadFailure {
                    path: request.samples[&note].clone(),
                    reason: format!("invalid note name {}", note),
                });
            }
            (_, Err(e)) => {
                failed += 1;
                hooks.error(&e);
            }
        }
    }

    let loaded = bank.len();
    info!(loaded, failed, "Voice samples loaded");
    hooks.loaded(LoadReport {
        name: request.name.clone(),
        loaded,
        failed,
        detached: false,
    });
}

impl Sampler for SampleEngine {
    fn activate(&self) -> Result<(), SamplerError> {
        self.device
            .start()
            .map_err(|e| SamplerError::Activation(e.to_string()))
    }

    fn create_voice(&self, request: VoiceRequest, hooks: LoadHooks) -> Box<dyn Voice> {
        let bank = Arc::new(VoiceBank::default());
        let voice = SampleVoice::new(
            request.name.clone(),
            bank.clone(),
            self.device.clone(),
            request.volume.clamp(0.0, 1.0),
            self.release_samples(),
            self.retrigger,
        );

        let loader = self.loader.clone();
        let spawned = thread::Builder::new()
            .name(format!("load {}", request.name))
            .spawn(move || load_bank(&loader, &bank, &request, hooks));
        if let Err(e) = spawned {
            warn!(err = %e, "Unable to start sample loading thread, voice stays silent");
        }

        Box::new(voice)
    }
}

impl std::fmt::Debug for SampleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleEngine")
            .field("device", &self.device.to_string())
            .field("loader", &self.loader)
            .field("release", &self.release)
            .field("retrigger", &self.retrigger)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;
    use crate::testutil::{eventually, write_constant_wav};

    const RATE: u32 = 8000;

    struct Fixture {
        _tempdir: tempfile::TempDir,
        device: Arc<audio::mock::Device>,
        engine: SampleEngine,
        samples: BTreeMap<String, PathBuf>,
    }

    fn fixture(retrigger: RetriggerBehavior) -> Fixture {
        let tempdir = tempfile::tempdir().unwrap();
        let mut samples = BTreeMap::new();
        for (note, value) in [("C3", 0.25), ("C4", 0.5)] {
            let path = tempdir.path().join(format!("{}.wav", note));
            write_constant_wav(&path, value, RATE as usize, RATE).unwrap();
            samples.insert(note.to_string(), path);
        }

        let device = Arc::new(audio::mock::Device::get("mock-engine", RATE));
        let engine = SampleEngine::new(device.clone(), Duration::from_millis(10), retrigger);
        Fixture {
            _tempdir: tempdir,
            device,
            engine,
            samples,
        }
    }

    fn loaded_voice(fixture: &Fixture) -> Box<dyn Voice> {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let hooks = {
            let reports = reports.clone();
            LoadHooks::new().on_load(move |report| reports.lock().unwrap().push(report))
        };
        let voice = fixture.engine.create_voice(
            VoiceRequest {
                name: "test".to_string(),
                samples: fixture.samples.clone(),
                volume: 1.0,
            },
            hooks,
        );
        eventually(|| !reports.lock().unwrap().is_empty(), "Voice never loaded");
        assert_eq!(reports.lock().unwrap()[0].loaded, 2);
        voice
    }

    #[test]
    fn test_attack_plays_closest_sample() {
        let fixture = fixture(RetriggerBehavior::Sustain);
        let mut voice = loaded_voice(&fixture);

        // D3 is closest to the C3 sample.
        voice.attack(pitch::midi_to_frequency(50.0));
        assert_eq!(fixture.device.active_sources(), 1);
        let rendered = fixture.device.render(16);
        assert!(rendered.iter().all(|s| (s - 0.25).abs() < 1e-6));

        // Exactly C4 uses the C4 sample.
        voice.attack(pitch::midi_to_frequency(60.0));
        assert_eq!(fixture.device.active_sources(), 2);
        let rendered = fixture.device.render(16);
        assert!(rendered.iter().all(|s| (s - 0.75).abs() < 1e-6));
    }

    #[test]
    fn test_release_fades_to_silence() {
        let fixture = fixture(RetriggerBehavior::Sustain);
        let mut voice = loaded_voice(&fixture);

        let frequency = pitch::midi_to_frequency(48.0);
        voice.attack(frequency);
        fixture.device.render(8);

        // A slightly different frequency rounding to the same key releases it.
        voice.release(frequency * 1.01);
        let fade = fixture.device.render(200);
        assert!(fade[0] > 0.0);
        assert!(fade[199].abs() < 1e-6);
        assert_eq!(fixture.device.active_sources(), 0);
    }

    #[test]
    fn test_retrigger_sustain_absorbs() {
        let fixture = fixture(RetriggerBehavior::Sustain);
        let mut voice = loaded_voice(&fixture);

        let frequency = pitch::midi_to_frequency(48.0);
        voice.attack(frequency);
        voice.attack(frequency);
        assert_eq!(fixture.device.sources_added(), 1);

        // After a release the key can be attacked again.
        voice.release(frequency);
        voice.attack(frequency);
        assert_eq!(fixture.device.sources_added(), 2);
    }

    #[test]
    fn test_retrigger_cut_and_polyphonic() {
        let frequency = pitch::midi_to_frequency(48.0);

        let cut = fixture(RetriggerBehavior::Cut);
        let mut voice = loaded_voice(&cut);
        voice.attack(frequency);
        voice.attack(frequency);
        cut.device.render(1);
        assert_eq!(cut.device.sources_added(), 2);
        assert_eq!(cut.device.active_sources(), 1);

        let polyphonic = fixture(RetriggerBehavior::Polyphonic);
        let mut voice = loaded_voice(&polyphonic);
        voice.attack(frequency);
        voice.attack(frequency);
        polyphonic.device.render(1);
        assert_eq!(polyphonic.device.active_sources(), 2);
    }

    #[test]
    fn test_disconnect_silences_and_ignores_later_calls() {
        let fixture = fixture(RetriggerBehavior::Polyphonic);
        let mut voice = loaded_voice(&fixture);

        voice.attack(pitch::midi_to_frequency(48.0));
        voice.attack(pitch::midi_to_frequency(60.0));
        voice.disconnect();
        fixture.device.render(1);
        assert_eq!(fixture.device.active_sources(), 0);

        voice.attack(pitch::midi_to_frequency(48.0));
        voice.disconnect();
        assert_eq!(fixture.device.sources_added(), 2);
    }

    #[test]
    fn test_detached_voice_discards_late_load() {
        let fixture = fixture(RetriggerBehavior::Sustain);
        let reports = Arc::new(Mutex::new(Vec::new()));
        let hooks = {
            let reports = reports.clone();
            LoadHooks::new().on_load(move |report| reports.lock().unwrap().push(report))
        };

        let mut voice = fixture.engine.create_voice(
            VoiceRequest {
                name: "late".to_string(),
                samples: fixture.samples.clone(),
                volume: 1.0,
            },
            hooks,
        );
        voice.disconnect();

        eventually(|| !reports.lock().unwrap().is_empty(), "Load never finished");
        let report = reports.lock().unwrap()[0].clone();
        if report.detached {
            assert_eq!(report.loaded, 0);
        }
        voice.attack(pitch::midi_to_frequency(48.0));
        assert_eq!(fixture.device.sources_added(), 0);
    }

    #[test]
    fn test_load_errors_are_reported() {
        let fixture = fixture(RetriggerBehavior::Sustain);
        let errors = Arc::new(Mutex::new(Vec::new()));
        let reports = Arc::new(Mutex::new(Vec::new()));
        let hooks = {
            let errors = errors.clone();
            let reports = reports.clone();
            LoadHooks::new()
                .on_error(move |e| errors.lock().unwrap().push(e.clone()))
                .on_load(move |report| reports.lock().unwrap().push(report))
        };

        let mut samples = fixture.samples.clone();
        samples.insert("E3".to_string(), PathBuf::from("/nonexistent/E3.wav"));
        let mut voice = fixture.engine.create_voice(
            VoiceRequest {
                name: "partial".to_string(),
                samples,
                volume: 1.0,
            },
            hooks,
        );

        eventually(|| !reports.lock().unwrap().is_empty(), "Load never finished");
        let report = reports.lock().unwrap()[0].clone();
        assert_eq!((report.loaded, report.failed), (2, 1));
        assert_eq!(errors.lock().unwrap().len(), 1);

        // The missing note falls back to the nearest loaded sample.
        voice.attack(pitch::midi_to_frequency(52.0));
        assert_eq!(fixture.device.sources_added(), 1);
    }

    #[test]
    fn test_activate_starts_device() {
        let fixture = fixture(RetriggerBehavior::Sustain);
        fixture.engine.activate().unwrap();
        fixture.engine.activate().unwrap();
        assert!(fixture.device.is_started());
    }
}
