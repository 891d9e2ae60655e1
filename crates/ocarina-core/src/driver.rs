use ocarina_domain_sheet::{Sheet, SheetNote};
use ocarina_ports::types::Micros;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Playing,
    Paused,
    Finished,
}

impl DriverState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Finished => "finished",
        }
    }
}

impl std::fmt::Display for DriverState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot {action} while {from}")]
pub struct TransitionError {
    pub from: DriverState,
    pub action: &'static str,
}

impl TransitionError {
    fn new(from: DriverState, action: &'static str) -> Self {
        Self { from, action }
    }
}

/// Drives scheduled emission of one reference sheet.
///
/// `Idle -> Playing <-> Paused -> Finished -> Idle`, with `Finished`
/// one-way: once the sheet is exhausted only `stop`/`reset` leave it.
/// Elapsed time accumulates only while `Playing`, so the remaining-time
/// trajectory is identical whether or not the session was ever paused,
/// and a resumed session can never re-emit an already consumed entry.
pub struct PlaybackDriver {
    state: DriverState,
    notes: Vec<SheetNote>,
    cursor: usize,
    length_us: Micros,
    elapsed_us: Micros,
}

impl Default for PlaybackDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackDriver {
    pub fn new() -> Self {
        Self {
            state: DriverState::Idle,
            notes: Vec::new(),
            cursor: 0,
            length_us: 0,
            elapsed_us: 0,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != DriverState::Idle
    }

    /// Loads a sheet and starts playing from the top.
    pub fn start(&mut self, sheet: &Sheet) -> Result<(), TransitionError> {
        if self.state != DriverState::Idle {
            return Err(TransitionError::new(self.state, "start"));
        }
        self.notes = sheet.notes.clone();
        self.length_us = sheet.length_us;
        self.cursor = 0;
        self.elapsed_us = 0;
        self.state = DriverState::Playing;
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), TransitionError> {
        if self.state != DriverState::Playing {
            return Err(TransitionError::new(self.state, "pause"));
        }
        self.state = DriverState::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), TransitionError> {
        if self.state != DriverState::Paused {
            return Err(TransitionError::new(self.state, "resume"));
        }
        self.state = DriverState::Playing;
        Ok(())
    }

    /// Forceful exit to `Idle` from any active state, discarding progress.
    pub fn stop(&mut self) -> Result<(), TransitionError> {
        if self.state == DriverState::Idle {
            return Err(TransitionError::new(self.state, "stop"));
        }
        self.reset();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.state = DriverState::Idle;
        self.notes.clear();
        self.cursor = 0;
        self.length_us = 0;
        self.elapsed_us = 0;
    }

    /// Advances the playback clock and returns the notes that came due,
    /// in timestamp order, each exactly once. Flips to `Finished` when the
    /// schedule and the sheet's tail are exhausted. No-op unless `Playing`.
    pub fn advance(&mut self, dt: Duration) -> Vec<SheetNote> {
        if self.state != DriverState::Playing {
            return Vec::new();
        }
        self.elapsed_us = self.elapsed_us.saturating_add(dt.as_micros() as Micros);

        let mut due = Vec::new();
        while let Some(note) = self.notes.get(self.cursor) {
            if note.at_us > self.elapsed_us {
                break;
            }
            due.push(*note);
            self.cursor += 1;
        }

        if self.cursor >= self.notes.len() && self.elapsed_us >= self.length_us {
            self.state = DriverState::Finished;
        }
        due
    }

    pub fn elapsed_us(&self) -> Micros {
        self.elapsed_us
    }

    /// Total length minus elapsed playback time; frozen while paused.
    pub fn remaining_time(&self) -> Duration {
        let left = self.length_us.saturating_sub(self.elapsed_us);
        Duration::from_micros(left.max(0) as u64)
    }
}
