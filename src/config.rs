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

//! Cabinet configuration, loaded from YAML with environment overrides.

use std::path::Path;

use ::config::{Config, Environment, File};

mod ambience;
mod audio;
mod error;
mod input;
mod session;

pub use self::ambience::AmbientTrack;
pub use self::audio::{Audio, DEFAULT_SAMPLE_RATE};
pub use self::error::ConfigError;
pub use self::input::{ButtonBinding, Input, MidiInput, SpinnerBinding, SpinnerEncoding, StartBinding};
pub use self::session::Session;

const ENV_PREFIX: &str = "SLIDEHORN";

/// Loads and validates the session configuration at the given path. Relative
/// asset paths resolve against the file's directory.
pub fn load(path: &Path) -> Result<Session, ConfigError> {
    let mut session = Config::builder()
        .add_source(File::from(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<Session>()?;

    if let Some(parent) = path.parent() {
        session.set_base_path(parent);
    }
    session.validate()?;
    Ok(session)
}
