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
use std::io;
use std::sync::Arc;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{debug, info, span, warn, Level};

use super::{Button, ButtonEdge, InputState, Player};

const START: &str = "start";
const SPIN: &str = "spin";
const DOWN: &str = "down";
const UP: &str = "up";

/// A parsed keyboard command.
#[derive(Debug, PartialEq)]
enum Command {
    Start(usize),
    Edge(ButtonEdge),
    Spin(Player, i64),
}

fn parse_player(input: &str) -> Result<Player, String> {
    let number: u8 = input
        .parse()
        .map_err(|_| format!("invalid player {}", input))?;
    Player::try_from(number)
}

fn parse_command(input: &str) -> Result<Command, String> {
    let words: Vec<String> = input.split_whitespace().map(str::to_lowercase).collect();
    let words: Vec<&str> = words.iter().map(String::as_str).collect();

    match words.as_slice() {
        [START, players] => match *players {
            "1" => Ok(Command::Start(1)),
            "2" => Ok(Command::Start(2)),
            _ => Err(format!("invalid player count {}", players)),
        },
        [player, SPIN, delta] => {
            let player = parse_player(player)?;
            let delta = delta
                .parse::<i64>()
                .map_err(|_| format!("invalid spin delta {}", delta))?;
            Ok(Command::Spin(player, delta))
        }
        [player, button, direction] => {
            let player = parse_player(player)?;
            let button: Button = button.parse()?;
            match *direction {
                DOWN => Ok(Command::Edge(ButtonEdge::press(player, button))),
                UP => Ok(Command::Edge(ButtonEdge::release(player, button))),
                _ => Err(format!("expected {} or {}, got {}", DOWN, UP, direction)),
            }
        }
        _ => Err("unrecognized command".to_string()),
    }
}

/// Drives the cabinet from line commands on standard input.
pub struct Driver {
    state: Arc<InputState>,
}

impl Driver {
    pub fn new(state: Arc<InputState>) -> Driver {
        Driver { state }
    }

    /// Reads and applies one command. Returns false once the input is exhausted.
    fn monitor_io<R, W>(
        events_tx: &Sender<ButtonEdge>,
        state: &InputState,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({} 1|2, <player> <button> {}|{}, <player> {} <delta>): ",
            START, DOWN, UP, SPIN,
        )?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }
        if input.trim().is_empty() {
            return Ok(true);
        }

        match parse_command(&input) {
            Ok(Command::Start(players)) => {
                info!(players, "Start pressed.");
                state.signal_start(players);
            }
            Ok(Command::Spin(player, delta)) => {
                debug!(player = %player, delta, "Spin.");
                state.add_spin(player, delta);
            }
            Ok(Command::Edge(edge)) => events_tx
                .blocking_send(edge)
                .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))?,
            Err(e) => warn!(input = input.trim(), err = e, "Unrecognized input"),
        }
        Ok(true)
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<ButtonEdge>) -> JoinHandle<Result<(), io::Error>> {
        let state = self.state.clone();
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, &state, io::stdin().lock(), io::stdout())? {}

            info!("Keyboard input closed.");
            Ok(())
        })
    }
}
