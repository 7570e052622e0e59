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

//! The cabinet session: owns every lane and drives them from input.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use tracing::{info, span, trace, warn, Level};

use crate::ambience::Ambience;
use crate::config;
use crate::input::{ButtonEdge, InputState, Player};
use crate::instrument::{Catalog, InstrumentProfile};
use crate::lane::PlayerControlState;
use crate::presentation::Presentation;
use crate::router::{Action, Router};
use crate::sampler::{LoadHooks, Sampler, VoiceRequest};

/// One cabinet session. Ticks and edges must come from a single owner.
pub struct Session {
    catalog: Catalog,
    sampler: Arc<dyn Sampler>,
    input: Arc<InputState>,
    presentation: Box<dyn Presentation>,
    router: Router,
    lanes: Vec<PlayerControlState>,
    /// Carousel index per lane.
    selection: Vec<usize>,
    initial_instruments: Vec<String>,
    ambient_tracks: Vec<config::AmbientTrack>,
    ambience: Ambience<StdRng>,
    glide_gain: f64,
    volume: f32,
    assets: PathBuf,
    started: bool,
}

impl Session {
    /// Creates a session waiting for start. Every lane begins on the catalog
    /// default with no voice.
    pub fn new(
        config: &config::Session,
        catalog: Catalog,
        sampler: Arc<dyn Sampler>,
        input: Arc<InputState>,
        presentation: Box<dyn Presentation>,
    ) -> Session {
        let players: Vec<Player> = Player::first(config.players()).collect();
        let lanes = players
            .iter()
            .map(|player| PlayerControlState::new(*player, catalog.default_profile().clone()))
            .collect();
        let initial_instruments = players
            .iter()
            .map(|player| config.initial_instrument(*player))
            .collect();

        Session {
            selection: vec![0; players.len()],
            catalog,
            sampler,
            input,
            presentation,
            router: Router::new(players.len(), config.instrument_selectable()),
            lanes,
            initial_instruments,
            ambient_tracks: config.ambience(),
            ambience: Ambience::from_entropy(),
            glide_gain: config.glide_gain(),
            volume: config.volume(),
            assets: config.assets(),
            started: false,
        }
    }

    /// Replaces the RNG ambient intervals are drawn from.
    pub fn with_rng(mut self, rng: StdRng) -> Session {
        self.ambience = Ambience::new(rng);
        self
    }

    /// Runs one frame.
    pub fn tick(&mut self, now: Instant) {
        if !self.started {
            if self.input.session_ready(self.lanes.len()) {
                self.start(now);
            }
            return;
        }

        for lane in self.lanes.iter_mut() {
            let reading = self.input.take_spinner(lane.player());
            lane.advance(reading, self.glide_gain);
            self.presentation
                .set_slide_fill(lane.player(), lane.slide_fill());
        }

        self.ambience.poll(now);
    }

    fn start(&mut self, now: Instant) {
        let span = span!(Level::INFO, "session start", players = self.lanes.len());
        let _enter = span.enter();

        self.started = true;
        if let Err(e) = self.sampler.activate() {
            warn!(err = %e, "Audio output did not activate, continuing without it");
        }
        self.presentation.dismiss_overlay();

        let players: Vec<Player> = self.lanes.iter().map(|lane| lane.player()).collect();
        for player in players {
            // Motion from before the start never reaches the slide.
            self.input.take_spinner(player);
            let name = self.initial_instruments[player.index()].clone();
            self.assign_instrument(player, &name);
        }

        for track in self.ambient_tracks.iter() {
            let request = VoiceRequest {
                name: track.name().to_string(),
                samples: BTreeMap::from([(track.note().to_string(), self.assets.join(track.sample()))]),
                volume: track.volume(),
            };
            let voice = self.sampler.create_voice(request, load_hooks(track.name()));
            if let Err(e) = self.ambience.add_track(track, voice, now) {
                warn!(track = track.name(), err = %e, "Skipping ambient track");
            }
        }

        info!("Session started.");
    }

    /// Handles a button edge immediately.
    pub fn handle_edge(&mut self, edge: ButtonEdge) {
        let Some(action) = self.router.route(edge) else {
            trace!(edge = ?edge, "Edge ignored.");
            return;
        };

        match action {
            Action::Press(player) => {
                if self.lane_mut(player).press() {
                    self.presentation.set_playing(player, true);
                }
            }
            Action::Release(player) => {
                self.lane_mut(player).release_trigger();
                self.presentation.set_playing(player, false);
            }
            Action::Cycle(..) | Action::Confirm(_) if !self.started => {
                trace!(action = ?action, "Selection before start ignored.");
            }
            Action::Cycle(player, step) => {
                let len = self.catalog.len() as isize;
                let index = (self.selection[player.index()] as isize + step).rem_euclid(len) as usize;
                self.selection[player.index()] = index;
                let name = self.catalog.at(index).name().to_string();
                self.presentation.show_selection(player, &name);
            }
            Action::Confirm(player) => {
                let name = self.catalog.at(self.selection[player.index()]).name().to_string();
                self.assign_instrument(player, &name);
            }
        }
    }

    /// Assigns an instrument by name, falling back to the catalog default when
    /// the name is unknown. Returns the instrument that was assigned.
    pub fn assign_instrument(&mut self, player: Player, name: &str) -> &InstrumentProfile {
        let profile = match self.catalog.get(name) {
            Ok(profile) => profile.clone(),
            Err(e) => {
                let fallback = self.catalog.default_profile().clone();
                warn!(player = %player, err = %e, fallback = fallback.name(), "Using default instrument");
                fallback
            }
        };

        let sampler = self.sampler.clone();
        let assets = self.assets.clone();
        let volume = self.volume;
        let index = self.catalog.index_of(profile.name()).unwrap_or(0);
        self.selection[player.index()] = index;
        self.presentation.set_instrument(player, profile.name());

        let lane = self.lane_mut(player);
        lane.assign_instrument(profile, |profile| {
            sampler.create_voice(
                VoiceRequest::for_instrument(profile, &assets, volume),
                load_hooks(profile.name()),
            )
        });
        lane.instrument()
    }

    fn lane_mut(&mut self, player: Player) -> &mut PlayerControlState {
        // The router never lets players beyond the session through.
        &mut self.lanes[player.index()]
    }

    /// The lane for a player, if the player is part of this session.
    pub fn lane(&self, player: Player) -> Option<&PlayerControlState> {
        self.lanes.get(player.index())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn players(&self) -> usize {
        self.lanes.len()
    }

    /// The number of ambient tracks playing.
    pub fn ambient_tracks(&self) -> usize {
        self.ambience.len()
    }
}

fn load_hooks(name: &str) -> LoadHooks {
    let name = name.to_string();
    let error_name = name.clone();
    LoadHooks::new()
        .on_error(move |e| warn!(voice = error_name, err = %e, "Sample failed to load"))
        .on_load(move |report| {
            if report.detached {
                info!(voice = name, "Replaced before loading finished.");
            } else {
                info!(voice = name, loaded = report.loaded, failed = report.failed, "Samples loaded.");
            }
        })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::SeedableRng;

    use super::*;
    use crate::config::{AmbientTrack, Audio};
    use crate::input::Button;
    use crate::presentation::test::{Recorder, Update};
    use crate::sampler::mock::{self, Call};

    struct Fixture {
        session: Session,
        sampler: mock::Sampler,
        input: Arc<InputState>,
        recorder: Recorder,
    }

    fn fixture(config: config::Session, sampler: mock::Sampler) -> Fixture {
        let input = Arc::new(InputState::new(256));
        let recorder = Recorder::new();
        let session = Session::new(
            &config,
            Catalog::builtin().unwrap(),
            Arc::new(sampler.clone()),
            input.clone(),
            Box::new(recorder.clone()),
        )
        .with_rng(StdRng::seed_from_u64(11));
        Fixture {
            session,
            sampler,
            input,
            recorder,
        }
    }

    fn started(players: usize, selectable: bool) -> Fixture {
        let mut fixture = fixture(
            config::Session::new(players, selectable, Audio::new("mock-device")),
            mock::Sampler::new(),
        );
        fixture.input.signal_start(players);
        fixture.session.tick(Instant::now());
        fixture.sampler.clear_calls();
        fixture
    }

    #[test]
    fn test_start_gating() {
        let mut fixture = fixture(
            config::Session::new(2, false, Audio::new("mock-device")),
            mock::Sampler::new(),
        );
        let now = Instant::now();

        fixture.session.tick(now);
        fixture.input.signal_start(1);
        fixture.session.tick(now);
        assert!(!fixture.session.is_started());
        assert_eq!(fixture.sampler.activations(), 0);
        assert_eq!(fixture.sampler.voice_count(), 0);

        fixture.input.add_spin(Player::One, 1000);
        fixture.input.signal_start(2);
        fixture.session.tick(now);
        assert!(fixture.session.is_started());
        assert_eq!(fixture.sampler.activations(), 1);
        let names: Vec<String> = fixture.sampler.voices().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["trombone", "saxophone"]);
        assert_eq!(fixture.recorder.updates()[0], Update::DismissOverlay);

        // The start tick does not move the slide, and earlier motion is dropped.
        assert_eq!(fixture.session.lane(Player::One).unwrap().position(), 50.0);
        fixture.session.tick(now);
        fixture.session.tick(now);
        assert_eq!(fixture.sampler.activations(), 1);
        assert_eq!(fixture.sampler.voice_count(), 2);
        assert_eq!(fixture.session.lane(Player::One).unwrap().position(), 50.0);
    }

    #[test]
    fn test_activation_failure_is_not_fatal() {
        let mut fixture = fixture(
            config::Session::new(1, false, Audio::new("mock-device")),
            mock::Sampler::new().fail_activation(),
        );
        fixture.input.signal_start(1);
        fixture.session.tick(Instant::now());
        assert!(fixture.session.is_started());
        assert_eq!(fixture.sampler.voice_count(), 1);
    }

    #[test]
    fn test_press_glide_release() {
        let mut fixture = started(1, false);
        let now = Instant::now();
        let (f50, f60) = {
            let lane = fixture.session.lane(Player::One).unwrap();
            (lane.frequency_at(50.0), lane.frequency_at(60.0))
        };

        fixture.session.handle_edge(ButtonEdge::press(Player::One, Button::A));
        fixture.session.tick(now);
        fixture.input.add_spin(Player::One, 64);
        fixture.session.tick(now);
        fixture.session.handle_edge(ButtonEdge::release(Player::One, Button::A));

        assert_eq!(
            fixture.sampler.voice(0).calls,
            vec![
                Call::Attack(f50),
                Call::Attack(f60),
                Call::Release(f50),
                Call::Attack(f60),
                Call::Release(f60),
            ]
        );
        assert_eq!(fixture.recorder.last_fill(Player::One), Some(40.0));
        let updates = fixture.recorder.updates();
        assert!(updates.contains(&Update::Playing(Player::One, true)));
        assert_eq!(updates.last(), Some(&Update::Playing(Player::One, false)));
    }

    #[test]
    fn test_lanes_are_independent() {
        let mut fixture = started(2, false);
        fixture.session.handle_edge(ButtonEdge::press(Player::Two, Button::A));
        fixture.input.add_spin(Player::One, -256);
        fixture.session.tick(Instant::now());

        assert_eq!(fixture.session.lane(Player::One).unwrap().position(), 10.0);
        assert_eq!(fixture.session.lane(Player::Two).unwrap().position(), 50.0);
        assert!(fixture.sampler.voice(0).calls.is_empty());
        assert_eq!(fixture.sampler.voice(1).calls.len(), 1);
    }

    #[test]
    fn test_unknown_instrument_falls_back() {
        let mut fixture = started(1, false);
        let assigned = fixture.session.assign_instrument(Player::One, "unknown-name");
        assert_eq!(assigned.name(), "trombone");
        assert_eq!(fixture.sampler.voice_count(), 2);
        assert_eq!(fixture.sampler.live_voices(), 1);
    }

    #[test]
    fn test_unknown_initial_instrument_falls_back() {
        let config = config::Session::new(1, false, Audio::new("mock-device"))
            .with_instruments(&["kazoo"]);
        let mut fixture = fixture(config, mock::Sampler::new());
        fixture.input.signal_start(1);
        fixture.session.tick(Instant::now());
        assert_eq!(
            fixture.session.lane(Player::One).unwrap().instrument().name(),
            "trombone"
        );
    }

    #[test]
    fn test_carousel() {
        let mut fixture = started(2, true);
        fixture.session.handle_edge(ButtonEdge::press(Player::One, Button::Left));
        assert_eq!(
            fixture.recorder.updates().last(),
            Some(&Update::Selection(Player::One, "saxophone".to_string()))
        );
        fixture.session.handle_edge(ButtonEdge::press(Player::One, Button::Right));
        fixture.session.handle_edge(ButtonEdge::press(Player::One, Button::Right));
        fixture.session.handle_edge(ButtonEdge::press(Player::One, Button::B));

        let lane = fixture.session.lane(Player::One).unwrap();
        assert_eq!(lane.instrument().name(), "saxophone");
        assert_eq!(lane.position(), 50.0);
        assert_eq!(fixture.sampler.voice_count(), 3);
        assert!(fixture.sampler.voice(0).disconnected());
        assert_eq!(fixture.sampler.voice(0).calls_after_disconnect(), 0);
        assert_eq!(fixture.sampler.live_voices(), 2);
        assert_eq!(
            fixture.recorder.updates().last(),
            Some(&Update::Instrument(Player::One, "saxophone".to_string()))
        );
    }

    #[test]
    fn test_selection_needs_start_and_enablement() {
        let mut fixture = fixture(
            config::Session::new(1, true, Audio::new("mock-device")),
            mock::Sampler::new(),
        );
        fixture.session.handle_edge(ButtonEdge::press(Player::One, Button::B));
        assert_eq!(fixture.sampler.voice_count(), 0);

        let mut fixture = started(1, false);
        fixture.session.handle_edge(ButtonEdge::press(Player::One, Button::B));
        assert_eq!(fixture.sampler.voice_count(), 1);
    }

    #[test]
    fn test_release_before_start_is_silent() {
        let mut fixture = fixture(
            config::Session::new(1, false, Audio::new("mock-device")),
            mock::Sampler::new(),
        );
        fixture.session.handle_edge(ButtonEdge::press(Player::One, Button::A));
        fixture.session.handle_edge(ButtonEdge::release(Player::One, Button::A));
        assert!(!fixture.session.lane(Player::One).unwrap().is_held());
    }

    #[test]
    fn test_load_failures_do_not_abort_assignment() {
        let mut fixture = fixture(
            config::Session::new(1, false, Audio::new("mock-device")),
            mock::Sampler::new().fail_note("C3"),
        );
        fixture.input.signal_start(1);
        fixture.session.tick(Instant::now());
        assert!(fixture.session.lane(Player::One).unwrap().has_voice());
    }

    #[test]
    fn test_ambience_starts_with_session() {
        let config = config::Session::new(1, false, Audio::new("mock-device")).with_ambience(vec![
            AmbientTrack::new("crowd", "crowd/clap.ogg", "1s", "2s"),
        ]);
        let mut fixture = fixture(config, mock::Sampler::new());
        let start = Instant::now();
        fixture.input.signal_start(1);
        fixture.session.tick(start);
        assert_eq!(fixture.session.ambient_tracks(), 1);

        let crowd = fixture.sampler.voice(1);
        assert_eq!(crowd.name, "crowd");
        assert_eq!(crowd.calls.len(), 2);

        fixture.session.tick(start + Duration::from_secs(2));
        assert_eq!(fixture.sampler.voice(1).calls.len(), 4);
    }
}
