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
use crate::input::{Button, ButtonEdge, Player};

/// What a button edge asks the session to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// The trigger went down.
    Press(Player),
    /// The trigger came up.
    Release(Player),
    /// Move the instrument carousel by the given number of entries.
    Cycle(Player, isize),
    /// Assign the instrument the carousel is showing.
    Confirm(Player),
}

/// Maps button edges to session actions.
#[derive(Clone, Copy, Debug)]
pub struct Router {
    players: usize,
    instrument_selectable: bool,
}

impl Router {
    pub fn new(players: usize, instrument_selectable: bool) -> Router {
        Router {
            players,
            instrument_selectable,
        }
    }

    /// Returns the action for an edge, or None if the edge means nothing in
    /// this session.
    pub fn route(&self, edge: ButtonEdge) -> Option<Action> {
        if edge.player.index() >= self.players {
            return None;
        }

        let player = edge.player;
        match (edge.button, edge.pressed) {
            (Button::A, true) => Some(Action::Press(player)),
            (Button::A, false) => Some(Action::Release(player)),
            _ if !self.instrument_selectable || !edge.pressed => None,
            (Button::Left, _) => Some(Action::Cycle(player, -1)),
            (Button::Right, _) => Some(Action::Cycle(player, 1)),
            (Button::B, _) => Some(Action::Confirm(player)),
            _ => None,
        }
    }
}
