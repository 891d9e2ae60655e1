use ocarina_ports::types::{Micros, MidiSignal, NoteName};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One scheduled note event of the reference sheet, on and off alike.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SheetNote {
    pub at_us: Micros,
    pub signal: MidiSignal,
}

/// One note the player is expected to hit. Targets are built from the
/// sheet's note-ons only and are strictly ordered by timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetNote {
    pub id: u64,
    pub at_us: Micros,
    pub note: NoteName,
}

/// A fully imported reference sheet: the schedule the driver emits, the
/// targets the judge consumes, and the total length.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Sheet {
    pub notes: Vec<SheetNote>,
    pub targets: Vec<TargetNote>,
    pub length_us: Micros,
}

impl Sheet {
    pub fn length(&self) -> Duration {
        Duration::from_micros(self.length_us.max(0) as u64)
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
