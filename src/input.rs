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

//! Cabinet input: button edges delivered as events, spinner and start state polled.

use std::error::Error;
use std::fmt;
use std::io;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use tokio::{sync::mpsc::Sender, task::JoinHandle};

use crate::config;

pub mod keyboard;
pub mod midi;
#[cfg(test)]
pub mod scripted;

/// One of the cabinet's player positions.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "u8")]
pub enum Player {
    One,
    Two,
}

impl Player {
    /// Every player, in order.
    pub const ALL: [Player; 2] = [Player::One, Player::Two];

    /// Zero based index, for addressing per-player storage.
    pub fn index(self) -> usize {
        match self {
            Player::One => 0,
            Player::Two => 1,
        }
    }

    /// One based player number, as printed on the cabinet.
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// The players taking part in a session of the given size.
    pub fn first(count: usize) -> impl Iterator<Item = Player> {
        Player::ALL.into_iter().take(count)
    }
}

impl TryFrom<u8> for Player {
    type Error = String;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        match number {
            1 => Ok(Player::One),
            2 => Ok(Player::Two),
            _ => Err(format!("invalid player {}, expected 1 or 2", number)),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// The per-player button set.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    A,
    B,
    Up,
    Down,
    Left,
    Right,
}

impl FromStr for Button {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a" => Ok(Button::A),
            "b" => Ok(Button::B),
            "up" => Ok(Button::Up),
            "down" => Ok(Button::Down),
            "left" => Ok(Button::Left),
            "right" => Ok(Button::Right),
            _ => Err(format!("unknown button {}", s)),
        }
    }
}

/// A button press or release.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonEdge {
    pub player: Player,
    pub button: Button,
    pub pressed: bool,
}

impl ButtonEdge {
    pub fn press(player: Player, button: Button) -> ButtonEdge {
        ButtonEdge {
            player,
            button,
            pressed: true,
        }
    }

    pub fn release(player: Player, button: Button) -> ButtonEdge {
        ButtonEdge {
            player,
            button,
            pressed: false,
        }
    }
}

/// Spinner movement accumulated since the previous poll.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpinnerReading {
    /// Signed encoder steps.
    pub step_delta: i64,
    /// Encoder steps in one full revolution.
    pub step_resolution: u32,
}

impl SpinnerReading {
    /// Slide travel for this reading. A zero resolution never moves the slide.
    pub fn displacement(&self, glide_gain: f64) -> f64 {
        if self.step_resolution == 0 {
            return 0.0;
        }
        self.step_delta as f64 / self.step_resolution as f64 * glide_gain
    }
}

/// Input state shared between the drivers writing it and the session polling it.
pub struct InputState {
    spinners: [AtomicI64; 2],
    step_resolution: u32,
    one_player: AtomicBool,
    two_player: AtomicBool,
}

impl InputState {
    /// Creates a new input state for spinners with the given resolution.
    pub fn new(step_resolution: u32) -> InputState {
        InputState {
            spinners: [AtomicI64::new(0), AtomicI64::new(0)],
            step_resolution,
            one_player: AtomicBool::new(false),
            two_player: AtomicBool::new(false),
        }
    }

    /// Adds spinner steps for a player.
    pub fn add_spin(&self, player: Player, steps: i64) {
        self.spinners[player.index()].fetch_add(steps, Ordering::Relaxed);
    }

    /// Returns the steps accumulated since the last call and resets the accumulator.
    pub fn take_spinner(&self, player: Player) -> SpinnerReading {
        SpinnerReading {
            step_delta: self.spinners[player.index()].swap(0, Ordering::Relaxed),
            step_resolution: self.step_resolution,
        }
    }

    /// Records that the start button for a one or two player session was pressed.
    /// Returns false for any other player count.
    pub fn signal_start(&self, players: usize) -> bool {
        match players {
            1 => self.one_player.store(true, Ordering::Relaxed),
            2 => self.two_player.store(true, Ordering::Relaxed),
            _ => return false,
        }
        true
    }

    /// Returns true once a session of the given size has been started.
    pub fn session_ready(&self, players: usize) -> bool {
        match players {
            1 => self.one_player.load(Ordering::Relaxed),
            2 => self.two_player.load(Ordering::Relaxed),
            _ => false,
        }
    }

    /// The spinner resolution readings are reported with.
    pub fn step_resolution(&self) -> u32 {
        self.step_resolution
    }
}

/// Sources of cabinet input. Edges go out on the channel; spinner and start
/// state is written to the shared InputState.
pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<ButtonEdge>) -> JoinHandle<Result<(), io::Error>>;
}

/// Creates the driver for the given input configuration.
pub fn get_driver(
    config: &config::Input,
    state: Arc<InputState>,
) -> Result<Arc<dyn Driver>, Box<dyn Error>> {
    let driver: Arc<dyn Driver> = match config {
        config::Input::Keyboard => Arc::new(keyboard::Driver::new(state)),
        config::Input::Midi(midi_config) => midi::Driver::new(midi_config, state)?,
    };
    Ok(driver)
}
