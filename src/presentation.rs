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

//! Cabinet display updates. Purely output; nothing here feeds back into lanes.

use tracing::{debug, info, trace};

use crate::input::Player;

/// Receives display updates from the session.
pub trait Presentation: Send {
    /// Removes the "press start" overlay.
    fn dismiss_overlay(&mut self);

    /// Shows whether a player's trigger is held.
    fn set_playing(&mut self, player: Player, playing: bool);

    /// Sets the slide fill, a percentage in [0, 100].
    fn set_slide_fill(&mut self, player: Player, percent: f64);

    /// Shows the instrument a player is playing.
    fn set_instrument(&mut self, player: Player, instrument: &str);

    /// Shows the instrument the carousel is pointing at.
    fn show_selection(&mut self, player: Player, instrument: &str);
}

/// Presentation that logs every change.
#[derive(Default)]
pub struct TracingPresentation {
    fills: [Option<f64>; 2],
}

impl TracingPresentation {
    pub fn new() -> TracingPresentation {
        TracingPresentation::default()
    }
}

impl Presentation for TracingPresentation {
    fn dismiss_overlay(&mut self) {
        info!("Session started.");
    }

    fn set_playing(&mut self, player: Player, playing: bool) {
        debug!(player = %player, playing, "Playing.");
    }

    fn set_slide_fill(&mut self, player: Player, percent: f64) {
        let fill = &mut self.fills[player.index()];
        if *fill != Some(percent) {
            *fill = Some(percent);
            trace!(player = %player, percent, "Slide fill.");
        }
    }

    fn set_instrument(&mut self, player: Player, instrument: &str) {
        info!(player = %player, instrument, "Instrument.");
    }

    fn show_selection(&mut self, player: Player, instrument: &str) {
        info!(player = %player, instrument, "Selecting.");
    }
}


#[cfg(test)]
mod tests {
    use super::test::Recorder;
    use super::*;

    #[test]
    fn test_recorder_shares_updates() {
        let recorder = Recorder::new();
        let mut presentation: Box<dyn Presentation> = Box::new(recorder.clone());
        presentation.set_slide_fill(Player::One, 50.0);
        presentation.set_slide_fill(Player::Two, 20.0);
        presentation.set_slide_fill(Player::One, 40.0);
        presentation.set_playing(Player::One, true);

        assert_eq!(recorder.last_fill(Player::One), Some(40.0));
        assert_eq!(recorder.last_fill(Player::Two), Some(20.0));
        assert_eq!(recorder.updates().len(), 4);
    }

    #[test]
    fn test_tracing_fill_tracks_changes() {
        let mut presentation = TracingPresentation::new();
        presentation.set_slide_fill(Player::Two, 35.0);
        assert_eq!(presentation.fills, [None, Some(35.0)]);
    }
}
