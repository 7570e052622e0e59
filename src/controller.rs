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
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, span, trace, Instrument, Level};

use crate::input::{ButtonEdge, Driver};
use crate::session::Session;

/// Drives a session: ticks at the frame rate and handles edges as they arrive.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller that owns the session until the driver closes.
    pub fn new(session: Session, driver: Arc<dyn Driver>, frame_rate: u32) -> Controller {
        let span = span!(Level::INFO, "controller", frame_rate);
        Controller {
            handle: tokio::spawn(Controller::run(session, driver, frame_rate).instrument(span)),
        }
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    async fn run(mut session: Session, driver: Arc<dyn Driver>, frame_rate: u32) {
        let (events_tx, mut events_rx) = mpsc::channel::<ButtonEdge>(32);
        let join_handle = driver.monitor_events(events_tx);

        let mut frames = tokio::time::interval(Duration::from_secs_f64(1.0 / frame_rate.max(1) as f64));
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(players = session.players(), "Controller started.");

        loop {
            tokio::select! {
                _ = frames.tick() => session.tick(Instant::now()),
                edge = events_rx.recv() => match edge {
                    Some(edge) => {
                        trace!(edge = ?edge, "Received edge.");
                        session.handle_edge(edge);
                    }
                    None => break,
                },
            }
        }

        info!("Controller closing.");
        match join_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(err = %e, "Input driver failed"),
            Err(e) => error!(err = %e, "Error waiting for input driver to stop"),
        }
    }
}
