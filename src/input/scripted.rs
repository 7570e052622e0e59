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
use std::time::Duration;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{debug, info};

use super::{ButtonEdge, InputState, Player};

/// One scripted input action.
#[derive(Clone, Debug)]
pub enum Step {
    Start(usize),
    Edge(ButtonEdge),
    Spin(Player, i64),
    Wait(Duration),
}

/// Replays a fixed script, then closes its event channel.
pub struct Driver {
    state: Arc<InputState>,
    script: Vec<Step>,
}

impl Driver {
    pub fn new(state: Arc<InputState>, script: Vec<Step>) -> Arc<Driver> {
        Arc::new(Driver { state, script })
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<ButtonEdge>) -> JoinHandle<Result<(), io::Error>> {
        let state = self.state.clone();
        let script = self.script.clone();
        tokio::spawn(async move {
            for step in script {
                debug!(step = ?step, "Scripted step.");
                match step {
                    Step::Start(players) => {
                        state.signal_start(players);
                    }
                    Step::Edge(edge) => events_tx
                        .send(edge)
                        .await
                        .map_err(|e| io::Error::new(io::ErrorKind::BrokenPipe, e))?,
                    Step::Spin(player, steps) => state.add_spin(player, steps),
                    Step::Wait(duration) => tokio::time::sleep(duration).await,
                }
            }
            info!("Script finished.");
            Ok(())
        })
    }
}
