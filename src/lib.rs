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

//! A spinner-driven slide instrument for arcade cabinets.

pub mod ambience;
pub mod audio;
pub mod config;
pub mod controller;
pub mod input;
pub mod instrument;
pub mod lane;
pub mod midi;
pub mod pitch;
pub mod presentation;
pub mod router;
pub mod sampler;
pub mod session;
#[cfg(test)]
mod testutil;
pub mod verify;
