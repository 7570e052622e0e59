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

//! Slide position to pitch conversion and note name helpers.

use crate::instrument::InstrumentProfile;

/// The lowest slide position.
pub const MIN_POSITION: f64 = 0.0;

/// The highest slide position.
pub const MAX_POSITION: f64 = 100.0;

/// The slide position a lane rests at after start and after every instrument change.
pub const REST_POSITION: f64 = 50.0;

/// Reference pitch for MIDI note 69.
const A4_FREQUENCY: f64 = 440.0;
const A4_MIDI: f64 = 69.0;

/// Maps a slide position in [0, 100] to a frequency in the profile's range.
///
/// The interpolation is logarithmic so that equal slide travel covers an equal
/// musical interval. The position is not clamped here.
pub fn map_position(position: f64, profile: &InstrumentProfile) -> f64 {
    let min = profile.min_frequency_hz();
    let max = profile.max_frequency_hz();

    // Hit the endpoints exactly rather than through powf rounding.
    if position == MIN_POSITION {
        return min;
    }
    if position == MAX_POSITION {
        return max;
    }

    min * (max / min).powf(position / MAX_POSITION)
}

/// Clamps a slide position into [0, 100].
pub fn clamp_position(position: f64) -> f64 {
    position.clamp(MIN_POSITION, MAX_POSITION)
}

/// Converts a (possibly fractional) MIDI note number to a frequency in Hz.
pub fn midi_to_frequency(midi: f64) -> f64 {
    A4_FREQUENCY * 2f64.powf((midi - A4_MIDI) / 12.0)
}

/// Converts a frequency in Hz to a fractional MIDI note number.
pub fn frequency_to_midi(frequency: f64) -> f64 {
    A4_MIDI + 12.0 * (frequency / A4_FREQUENCY).log2()
}

/// Converts an interval in semitones to a playback rate ratio.
pub fn interval_to_ratio(semitones: f64) -> f64 {
    2f64.powf(semitones / 12.0)
}

/// Parses a note name such as "C4", "A#1" or "Bb4" into a MIDI note number.
///
/// Octave numbering puts middle C at C4 (MIDI 60), so C-1 is MIDI 0.
pub fn parse_note_name(name: &str) -> Option<u8> {
    let mut chars = name.trim().chars().peekable();

    let base: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let mut accidental = 0;
    while let Some(c) = chars.peek() {
        match c {
            '#' | 's' => accidental += 1,
            'b' => accidental -= 1,
            _ => break,
        }
        chars.next();
    }

    let octave: i32 = chars.collect::<String>().parse().ok()?;
    let midi = (octave + 1) * 12 + base + accidental;

    u8::try_from(midi).ok().filter(|m| *m <= 127)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Catalog;

    fn trombone() -> InstrumentProfile {
        Catalog::builtin()
            .expect("builtin catalog")
            .get("trombone")
            .expect("trombone")
            .clone()
    }

    #[test]
    fn test_endpoints() {
        let profile = trombone();
        assert_eq!(map_position(0.0, &profile), 82.41);
        assert_eq!(map_position(100.0, &profile), 466.16);
    }

    #[test]
    fn test_strictly_increasing() {
        let profile = trombone();
        let mut last = map_position(0.0, &profile);
        for step in 1..=1000 {
            let position = step as f64 / 10.0;
            let frequency = map_position(position, &profile);
            assert!(
                frequency > last,
                "frequency at {} ({}) not above {}",
                position,
                frequency,
                last
            );
            last = frequency;
        }
    }

    #[test]
    fn test_rest_position_is_g3() {
        let profile = trombone();
        let frequency = map_position(REST_POSITION, &profile);
        assert!((frequency - 196.0).abs() < 0.1, "got {}", frequency);
        assert_eq!(frequency_to_midi(frequency).round(), 55.0);
    }

    #[test]
    fn test_equal_travel_equal_interval() {
        let profile = trombone();
        let low = map_position(10.0, &profile) / map_position(0.0, &profile);
        let high = map_position(100.0, &profile) / map_position(90.0, &profile);
        assert!((low - high).abs() < 1e-9);
    }

    #[test]
    fn test_clamp_position() {
        assert_eq!(clamp_position(-12.0), 0.0);
        assert_eq!(clamp_position(150.0), 100.0);
        assert_eq!(clamp_position(42.5), 42.5);
    }

    #[test]
    fn test_parse_note_name() {
        assert_eq!(parse_note_name("C4"), Some(60));
        assert_eq!(parse_note_name("A4"), Some(69));
        assert_eq!(parse_note_name("A#1"), Some(34));
        assert_eq!(parse_note_name("Bb4"), Some(70));
        assert_eq!(parse_note_name("Cs2"), Some(37));
        assert_eq!(parse_note_name("C-1"), Some(0));
        assert_eq!(parse_note_name("H2"), None);
        assert_eq!(parse_note_name("C"), None);
        assert_eq!(parse_note_name("G10"), None);
    }

    #[test]
    fn test_midi_frequency_conversions() {
        assert!((midi_to_frequency(69.0) - 440.0).abs() < 1e-9);
        assert!((midi_to_frequency(40.0) - 82.41).abs() < 0.01);
        assert!((frequency_to_midi(466.16) - 70.0).abs() < 0.01);
        assert!((interval_to_ratio(12.0) - 2.0).abs() < 1e-12);
        assert!((interval_to_ratio(-12.0) - 0.5).abs() < 1e-12);
    }
}
