use ocarina_domain_sheet::TargetNote;
use ocarina_ports::types::{Micros, NoteName};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug)]
pub struct JudgeConfig {
    /// Full width of the acceptance window, centered on the target.
    pub window_us: Micros,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self { window_us: 600_000 }
    }
}

/// Outcome of one interaction. The wire code (0..=4) follows declaration
/// order and is stable across the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotePrecision {
    Middle,
    Left,
    Right,
    Miss,
    EarlyMiss,
}

impl NotePrecision {
    pub fn from_code(code: u8) -> Option<Self> {
        let precision = match code {
            0 => Self::Middle,
            1 => Self::Left,
            2 => Self::Right,
            3 => Self::Miss,
            4 => Self::EarlyMiss,
            _ => return None,
        };
        Some(precision)
    }

    pub fn to_code(self) -> u8 {
        self as u8
    }

    pub fn is_hit(self) -> bool {
        matches!(self, Self::Middle | Self::Left | Self::Right)
    }

    fn sector_bonus(self) -> i64 {
        match self {
            Self::Middle => 10,
            Self::Left | Self::Right => 5,
            Self::Miss | Self::EarlyMiss => 0,
        }
    }
}

/// Score multiplier as a step function of the chain count. Bands are
/// inclusive at their lower bound.
pub fn multiplier_for_chain(chain: u32) -> i64 {
    if chain < 10 {
        1
    } else if chain <= 15 {
        2
    } else if chain <= 20 {
        4
    } else {
        8
    }
}

/// Classifies one played note against the target currently due.
///
/// The window is centered on the target timestamp and split into three
/// equal sectors: early flank `Left`, center `Middle`, late flank `Right`
/// (trailing edge inclusive). A press before the window opens is
/// `EarlyMiss`; the wrong note inside the window, or any press after the
/// window closed, is `Miss`.
pub fn classify(
    target_at_us: Micros,
    target_note: NoteName,
    played: NoteName,
    at_us: Micros,
    window_us: Micros,
) -> NotePrecision {
    let start = target_at_us - window_us / 2;
    let end = start + window_us;
    if at_us < start {
        return NotePrecision::EarlyMiss;
    }
    if at_us > end || played != target_note {
        return NotePrecision::Miss;
    }
    let sector = ((at_us - start) * 3 / window_us.max(1)).min(2);
    match sector {
        0 => NotePrecision::Left,
        1 => NotePrecision::Middle,
        _ => NotePrecision::Right,
    }
}

/// Totals the bridge reports after each interaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDelta {
    pub total_score: i64,
    pub latest_delta: i64,
    pub hit_streak: u32,
}

/// Running tallies of one session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScoreTally {
    pub total_score: i64,
    pub hit_streak: u32,
    pub highest_streak: u32,
    pub hit_notes: u32,
    pub missed_notes: u32,
    pub poor_notes: u32,
}

impl ScoreTally {
    /// Applies one classified interaction. A hit extends the chain and
    /// scores `(10 + sector bonus) x multiplier` at the new chain length;
    /// a miss costs 10 and breaks the chain; an early miss costs 20 and
    /// restarts the chain at 1 rather than 0 (the wrong press itself opens
    /// the next chain).
    pub fn apply(&mut self, precision: NotePrecision) -> ScoreDelta {
        let delta = match precision {
            NotePrecision::Middle | NotePrecision::Left | NotePrecision::Right => {
                self.hit_streak += 1;
                self.hit_notes += 1;
                (10 + precision.sector_bonus()) * multiplier_for_chain(self.hit_streak)
            }
            NotePrecision::Miss => {
                self.hit_streak = 0;
                self.missed_notes += 1;
                -10
            }
            NotePrecision::EarlyMiss => {
                self.hit_streak = 1;
                self.poor_notes += 1;
                -20
            }
        };
        self.highest_streak = self.highest_streak.max(self.hit_streak);
        self.total_score += delta;
        ScoreDelta {
            total_score: self.total_score,
            latest_delta: delta,
            hit_streak: self.hit_streak,
        }
    }
}

/// One judged interaction, ready for the bridge.
#[derive(Clone, Copy, Debug)]
pub struct Interaction {
    pub precision: NotePrecision,
    pub delta: ScoreDelta,
}

/// Owns the ordered due-target queue and the running tally for the active
/// session. Live input consumes the current target whatever the outcome;
/// targets whose window expires unplayed turn into misses on `advance_to`.
pub struct Judge {
    cfg: JudgeConfig,
    targets: VecDeque<TargetNote>,
    tally: ScoreTally,
}

impl Judge {
    pub fn new(cfg: JudgeConfig) -> Self {
        Self {
            cfg,
            targets: VecDeque::new(),
            tally: ScoreTally::default(),
        }
    }

    pub fn load_targets(&mut self, targets: Vec<TargetNote>) {
        self.targets = targets.into();
        self.tally = ScoreTally::default();
    }

    pub fn reset(&mut self) {
        self.targets.clear();
        self.tally = ScoreTally::default();
    }

    pub fn tally(&self) -> ScoreTally {
        self.tally
    }

    pub fn current_target(&self) -> Option<&TargetNote> {
        self.targets.front()
    }

    /// Judges a live note-on. Expired targets are flushed first so the
    /// press is always measured against the target actually due. Input
    /// with no remaining target is not an interaction at all.
    pub fn on_note_on(&mut self, played: NoteName, at_us: Micros) -> Vec<Interaction> {
        let mut interactions = self.advance_to(at_us);
        let Some(target) = self.targets.front().copied() else {
            return interactions;
        };

        let precision = classify(target.at_us, target.note, played, at_us, self.cfg.window_us);
        self.targets.pop_front();
        let delta = self.tally.apply(precision);
        interactions.push(Interaction { precision, delta });
        interactions
    }

    /// Converts every target whose window has fully passed into a miss.
    pub fn advance_to(&mut self, now_us: Micros) -> Vec<Interaction> {
        let mut interactions = Vec::new();
        while let Some(target) = self.targets.front() {
            let window_end = target.at_us + self.cfg.window_us / 2;
            if now_us <= window_end {
                break;
            }
            self.targets.pop_front();
            let delta = self.tally.apply(NotePrecision::Miss);
            interactions.push(Interaction {
                precision: NotePrecision::Miss,
                delta,
            });
        }
        interactions
    }

    /// Applies a precision the presentation layer computed itself (the
    /// minigame's positional hit test). Shares the tally with the live
    /// input path.
    pub fn record(&mut self, precision: NotePrecision) -> ScoreDelta {
        self.tally.apply(precision)
    }
}
