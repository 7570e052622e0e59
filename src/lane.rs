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

//! A player lane: slide position, instrument choice and the voice it drives.

use tracing::{debug, trace};

use crate::input::{Player, SpinnerReading};
use crate::instrument::InstrumentProfile;
use crate::pitch::{self, REST_POSITION};
use crate::sampler::Voice;

pub mod binding;

pub use binding::{NoActiveVoice, VoiceBinding};

/// The previous position a lane starts from after every instrument change.
const INITIAL_PREVIOUS_POSITION: f64 = 0.0;

/// One player's control state.
pub struct PlayerControlState {
    player: Player,
    instrument: InstrumentProfile,
    position: f64,
    previous_position: f64,
    binding: VoiceBinding,
    held: bool,
}

impl PlayerControlState {
    /// Creates an idle lane at rest with no voice bound.
    pub fn new(player: Player, instrument: InstrumentProfile) -> PlayerControlState {
        PlayerControlState {
            player,
            instrument,
            position: REST_POSITION,
            previous_position: INITIAL_PREVIOUS_POSITION,
            binding: VoiceBinding::new(),
            held: false,
        }
    }

    /// Switches the lane to a new instrument. The old voice is disconnected
    /// before the new one is created, and the slide returns to rest.
    pub fn assign_instrument<F>(&mut self, instrument: InstrumentProfile, create: F)
    where
        F: FnOnce(&InstrumentProfile) -> Box<dyn Voice>,
    {
        self.binding.dispose();
        self.binding.bind(create(&instrument));
        debug!(player = %self.player, instrument = instrument.name(), "Instrument assigned");

        self.instrument = instrument;
        self.position = REST_POSITION;
        self.previous_position = INITIAL_PREVIOUS_POSITION;
    }

    /// Handles a trigger press. Returns false if the trigger was already held.
    pub fn press(&mut self) -> bool {
        !std::mem::replace(&mut self.held, true)
    }

    /// Handles a trigger release, releasing the note at the current position.
    /// Returns the released frequency.
    pub fn release_trigger(&mut self) -> f64 {
        self.held = false;
        let frequency = self.frequency();
        self.trigger(|binding| binding.release(frequency));
        frequency
    }

    /// Advances the slide by one tick of spinner motion and retriggers the held
    /// note. Returns true if the slide moved.
    pub fn advance(&mut self, reading: SpinnerReading, glide_gain: f64) -> bool {
        self.previous_position = self.position;
        self.position = pitch::clamp_position(self.position + reading.displacement(glide_gain));
        let moved = self.position != self.previous_position;

        if self.held {
            let current = self.frequency();
            self.trigger(|binding| binding.attack(current));
            if moved {
                let previous = self.frequency_at(self.previous_position);
                self.trigger(|binding| {
                    binding.release(previous)?;
                    binding.attack(current)
                });
            }
        }
        moved
    }

    fn trigger<F>(&mut self, trigger: F)
    where
        F: FnOnce(&mut VoiceBinding) -> Result<(), NoActiveVoice>,
    {
        if let Err(e) = trigger(&mut self.binding) {
            trace!(player = %self.player, err = %e, "Trigger ignored");
        }
    }

    /// The frequency at the current position.
    pub fn frequency(&self) -> f64 {
        self.frequency_at(self.position)
    }

    /// The frequency for a position on this lane's instrument.
    pub fn frequency_at(&self, position: f64) -> f64 {
        pitch::map_position(position, &self.instrument)
    }

    /// The slide fill percentage shown for this lane.
    pub fn slide_fill(&self) -> f64 {
        pitch::MAX_POSITION - self.position
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn instrument(&self) -> &InstrumentProfile {
        &self.instrument
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn previous_position(&self) -> f64 {
        self.previous_position
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn has_voice(&self) -> bool {
        self.binding.is_bound()
    }
}
