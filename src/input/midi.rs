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
use std::collections::HashMap;
use std::{error::Error, io, sync::Arc};

use midly::{live::LiveEvent, MidiMessage};
use tokio::{
    sync::mpsc::{self, Sender},
    task::JoinHandle,
};
use tracing::{debug, error, info, span, trace, Instrument, Level};

use super::{Button, ButtonEdge, InputState, Player};
use crate::config::{self, SpinnerEncoding};
use crate::midi::{self, Device};

/// What a single MIDI message means to the cabinet.
#[derive(Debug, PartialEq)]
enum Decoded {
    Edge(ButtonEdge),
    Spin(Player, i64),
    Start(usize),
}

/// MIDI bindings, keyed by (zero based channel, note or controller).
struct Bindings {
    buttons: HashMap<(u8, u8), (Player, Button)>,
    spinners: HashMap<(u8, u8), (Player, SpinnerEncoding)>,
    start: HashMap<(u8, u8), usize>,
}

impl Bindings {
    fn new(config: &config::MidiInput) -> Result<Bindings, config::ConfigError> {
        let mut bindings = Bindings {
            buttons: HashMap::new(),
            spinners: HashMap::new(),
            start: HashMap::new(),
        };
        for binding in config.buttons() {
            let key = (binding.channel()?.as_int(), binding.note()?.as_int());
            bindings
                .buttons
                .insert(key, (binding.player(), binding.button()));
        }
        for binding in config.spinners() {
            let key = (binding.channel()?.as_int(), binding.controller()?.as_int());
            bindings
                .spinners
                .insert(key, (binding.player(), binding.encoding()));
        }
        for binding in config.start() {
            let key = (binding.channel()?.as_int(), binding.note()?.as_int());
            bindings.start.insert(key, binding.players());
        }
        Ok(bindings)
    }

    fn decode(&self, raw_event: &[u8]) -> Option<Decoded> {
        let event = match LiveEvent::parse(raw_event) {
            Ok(event) => event,
            Err(e) => {
                error!(err = format!("{:?}", e), "Error parsing event.");
                return None;
            }
        };
        let LiveEvent::Midi { channel, message } = event else {
            return None;
        };
        let channel = channel.as_int();

        let (note, pressed) = match message {
            MidiMessage::NoteOn { key, vel } => (key.as_int(), vel.as_int() > 0),
            MidiMessage::NoteOff { key, .. } => (key.as_int(), false),
            MidiMessage::Controller { controller, value } => {
                let (player, encoding) = self.spinners.get(&(channel, controller.as_int()))?;
                return Some(Decoded::Spin(*player, encoding.decode(value.as_int())));
            }
            _ => return None,
        };

        if let Some((player, button)) = self.buttons.get(&(channel, note)) {
            return Some(Decoded::Edge(ButtonEdge {
                player: *player,
                button: *button,
                pressed,
            }));
        }
        // Start buttons only latch on press.
        match self.start.get(&(channel, note)) {
            Some(players) if pressed => Some(Decoded::Start(*players)),
            _ => None,
        }
    }
}

/// Reads cabinet controls from a MIDI encoder board.
pub struct Driver {
    device: Arc<dyn Device>,
    state: Arc<InputState>,
    bindings: Arc<Bindings>,
}

impl Driver {
    pub fn new(
        config: &config::MidiInput,
        state: Arc<InputState>,
    ) -> Result<Arc<Self>, Box<dyn Error>> {
        Ok(Arc::new(Driver {
            device: midi::get_device(config.device())?,
            state,
            bindings: Arc::new(Bindings::new(config)?),
        }))
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<ButtonEdge>) -> JoinHandle<Result<(), io::Error>> {
        let (midi_events_tx, mut midi_events_rx) = mpsc::channel::<Vec<u8>>(64);
        let device = self.device.clone();
        let state = self.state.clone();
        let bindings = self.bindings.clone();

        let span = span!(Level::INFO, "MIDI driver", device = device.name());
        tokio::spawn(
            async move {
                info!("MIDI driver started.");
                device
                    .watch_events(midi_events_tx)
                    .map_err(|e| io::Error::other(e.to_string()))?;

                loop {
                    let raw_event = tokio::select! {
                        _ = events_tx.closed() => {
                            info!("Event receiver closed.");
                            break;
                        }
                        raw_event = midi_events_rx.recv() => match raw_event {
                            Some(raw_event) => raw_event,
                            None => {
                                info!("MIDI watcher closed.");
                                break;
                            }
                        },
                    };

                    match bindings.decode(&raw_event) {
                        Some(Decoded::Edge(edge)) => {
                            trace!(player = %edge.player, button = ?edge.button, pressed = edge.pressed, "Button.");
                            if events_tx.send(edge).await.is_err() {
                                break;
                            }
                        }
                        Some(Decoded::Spin(player, steps)) => state.add_spin(player, steps),
                        Some(Decoded::Start(players)) => {
                            info!(players, "Start pressed.");
                            state.signal_start(players);
                        }
                        None => debug!(event = ?raw_event, "Unbound MIDI event."),
                    }
                }

                device.stop_watch_events();
                Ok(())
            }
            .instrument(span),
        )
    }
}
