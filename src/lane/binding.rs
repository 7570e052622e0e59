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
use tracing::debug;

use crate::sampler::Voice;

/// Returned when a trigger arrives before any voice is bound.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
#[error("no voice is bound")]
pub struct NoActiveVoice;

/// Exclusive owner of a lane's voice.
#[derive(Default)]
pub struct VoiceBinding {
    voice: Option<Box<dyn Voice>>,
}

impl VoiceBinding {
    /// Creates a binding with no voice.
    pub fn new() -> VoiceBinding {
        VoiceBinding::default()
    }

    /// Runs the trigger against the bound voice, if there is one.
    pub fn try_trigger<F>(&mut self, trigger: F) -> Result<(), NoActiveVoice>
    where
        F: FnOnce(&mut dyn Voice),
    {
        let voice = self.voice.as_mut().ok_or(NoActiveVoice)?;
        trigger(voice.as_mut());
        Ok(())
    }

    pub fn attack(&mut self, frequency: f64) -> Result<(), NoActiveVoice> {
        self.try_trigger(|voice| voice.attack(frequency))
    }

    pub fn release(&mut self, frequency: f64) -> Result<(), NoActiveVoice> {
        self.try_trigger(|voice| voice.release(frequency))
    }

    /// Installs a voice, disconnecting whatever was bound before.
    pub fn bind(&mut self, voice: Box<dyn Voice>) {
        self.dispose();
        self.voice = Some(voice);
    }

    /// Disconnects and drops the bound voice. Returns true if there was one.
    pub fn dispose(&mut self) -> bool {
        match self.voice.take() {
            Some(mut voice) => {
                voice.disconnect();
                debug!("Voice disposed");
                true
            }
            None => false,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.voice.is_some()
    }
}

impl Drop for VoiceBinding {
    fn drop(&mut self) {
        self.dispose();
    }
}
