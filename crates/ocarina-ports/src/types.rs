use serde::{Deserialize, Serialize};
use std::fmt;

/// Sheet-relative time in microseconds, monotonic within a session.
pub type Micros = i64;

/// The MIDI key of the lowest playable ocarina note (G3).
const LOWEST_KEY: u8 = 55;

/// The playable range of the ocarina, lowest to highest.
///
/// The discriminant order is the on-screen position ordinal, so
/// `NoteName::index` doubles as the lane index in the presentation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteName {
    G3,
    Ab3,
    A3,
    Bb3,
    B3,
    C4,
    Db4,
    D4,
    Eb4,
    E4,
    F4,
    Gb4,
    G4,
    Ab4,
    A4,
    Bb4,
    B4,
    C5,
}

impl NoteName {
    /// Maps a raw MIDI key to a playable note. Keys outside the ocarina
    /// range (55..=72) are rejected, never coerced to a neighbor.
    pub fn from_midi_key(key: u8) -> Option<Self> {
        let note = match key {
            55 => Self::G3,
            56 => Self::Ab3,
            57 => Self::A3,
            58 => Self::Bb3,
            59 => Self::B3,
            60 => Self::C4,
            61 => Self::Db4,
            62 => Self::D4,
            63 => Self::Eb4,
            64 => Self::E4,
            65 => Self::F4,
            66 => Self::Gb4,
            67 => Self::G4,
            68 => Self::Ab4,
            69 => Self::A4,
            70 => Self::Bb4,
            71 => Self::B4,
            72 => Self::C5,
            _ => return None,
        };
        Some(note)
    }

    pub fn midi_key(self) -> u8 {
        LOWEST_KEY + self.index()
    }

    /// Position ordinal within the playable range, 0 for G3 up to 17 for C5.
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn is_flat(self) -> bool {
        matches!(
            self,
            Self::Ab3 | Self::Bb3 | Self::Db4 | Self::Eb4 | Self::Gb4 | Self::Ab4 | Self::Bb4
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::G3 => "G3",
            Self::Ab3 => "Ab3",
            Self::A3 => "A3",
            Self::Bb3 => "Bb3",
            Self::B3 => "B3",
            Self::C4 => "C4",
            Self::Db4 => "Db4",
            Self::D4 => "D4",
            Self::Eb4 => "Eb4",
            Self::E4 => "E4",
            Self::F4 => "F4",
            Self::Gb4 => "Gb4",
            Self::G4 => "G4",
            Self::Ab4 => "Ab4",
            Self::A4 => "A4",
            Self::Bb4 => "Bb4",
            Self::B4 => "B4",
            Self::C5 => "C5",
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One note event, either live from the instrument or driven by the
/// reference sheet. Immutable once emitted; `note_index` and `is_flat`
/// are derived from `note` at construction so the presentation layer
/// never has to look them up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiSignal {
    pub note: NoteName,
    pub note_index: u8,
    pub is_flat: bool,
    pub velocity: u8,
    pub on: bool,
}

impl MidiSignal {
    pub fn new(note: NoteName, velocity: u8, on: bool) -> Self {
        Self {
            note,
            note_index: note.index(),
            is_flat: note.is_flat(),
            velocity,
            // A note-on with zero velocity is a note-off in disguise.
            on: on && velocity > 0,
        }
    }
}

impl fmt::Display for MidiSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.on { "on" } else { "off" };
        write!(f, "{} vel {} {}", self.note, self.velocity, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midi_key_mapping_covers_playable_range() {
        for key in 55..=72u8 {
            let note = NoteName::from_midi_key(key).unwrap();
            assert_eq!(note.midi_key(), key);
        }
        assert!(NoteName::from_midi_key(54).is_none());
        assert!(NoteName::from_midi_key(73).is_none());
    }

    #[test]
    fn flats_are_marked() {
        assert!(NoteName::Ab3.is_flat());
        assert!(NoteName::Gb4.is_flat());
        assert!(!NoteName::G3.is_flat());
        assert!(!NoteName::C5.is_flat());
    }

    #[test]
    fn zero_velocity_note_on_becomes_off() {
        let signal = MidiSignal::new(NoteName::C4, 0, true);
        assert!(!signal.on);
    }
}
