use crate::model::{Sheet, SheetNote, TargetNote};
use midly::{Fps, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use ocarina_ports::types::{Micros, MidiSignal, NoteName};
use std::collections::BTreeMap;
use std::path::Path;

type Tick = i64;

#[derive(thiserror::Error, Debug)]
pub enum SheetError {
    #[error("io error: {0}")]
    Io(String),
    #[error("parse error: {0}")]
    Parse(String),
}

pub fn import_midi_path(path: &Path) -> Result<Sheet, SheetError> {
    let data = std::fs::read(path).map_err(|e| SheetError::Io(e.to_string()))?;
    import_midi_bytes(&data)
}

/// Imports a standard MIDI file into a playable sheet. Keys outside the
/// ocarina range are dropped; everything else keeps its file order, with
/// note-offs sorted ahead of note-ons at the same tick.
pub fn import_midi_bytes(data: &[u8]) -> Result<Sheet, SheetError> {
    let smf = Smf::parse(data).map_err(|e| SheetError::Parse(e.to_string()))?;
    let (ppq, tempo_override) = match smf.header.timing {
        Timing::Metrical(ticks) => (ticks.as_int(), None),
        Timing::Timecode(fps, ticks_per_frame) => {
            let (ppq, us_per_quarter) = timecode_ppq_and_tempo(fps, ticks_per_frame);
            (ppq, Some(us_per_quarter))
        }
    };

    let mut tempo_points: BTreeMap<Tick, u32> = BTreeMap::new();
    let mut raw_notes: Vec<RawNote> = Vec::new();

    for track in &smf.tracks {
        let mut tick: Tick = 0;
        for event in track {
            tick += event.delta.as_int() as Tick;
            match &event.kind {
                TrackEventKind::Midi { message, .. } => match message {
                    MidiMessage::NoteOn { key, vel } => {
                        let velocity = vel.as_int();
                        raw_notes.push(RawNote {
                            tick,
                            key: key.as_int(),
                            velocity,
                            on: velocity > 0,
                        });
                    }
                    MidiMessage::NoteOff { key, .. } => {
                        raw_notes.push(RawNote {
                            tick,
                            key: key.as_int(),
                            velocity: 0,
                            on: false,
                        });
                    }
                    _ => {}
                },
                TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter)) => {
                    tempo_points.insert(tick, us_per_quarter.as_int());
                }
                _ => {}
            }
        }
    }

    raw_notes.sort_by(|a, b| {
        a.tick
            .cmp(&b.tick)
            .then_with(|| a.on.cmp(&b.on))
            .then_with(|| a.key.cmp(&b.key))
    });

    let tempo_map = TempoSegments::new(ppq, tempo_points, tempo_override);

    let mut notes = Vec::with_capacity(raw_notes.len());
    let mut targets = Vec::new();
    let mut next_target_id: u64 = 1;
    let mut length_us: Micros = 0;

    for raw in raw_notes {
        let Some(note) = NoteName::from_midi_key(raw.key) else {
            continue;
        };
        let at_us = tempo_map.tick_to_micros(raw.tick);
        length_us = length_us.max(at_us);
        if raw.on {
            targets.push(TargetNote {
                id: next_target_id,
                at_us,
                note,
            });
            next_target_id += 1;
        }
        notes.push(SheetNote {
            at_us,
            signal: MidiSignal::new(note, raw.velocity, raw.on),
        });
    }

    Ok(Sheet {
        notes,
        targets,
        length_us,
    })
}

struct RawNote {
    tick: Tick,
    key: u8,
    velocity: u8,
    on: bool,
}

struct TempoSegments {
    ppq: u16,
    segments: Vec<TempoSegment>,
}

#[derive(Clone, Copy)]
struct TempoSegment {
    start_tick: Tick,
    start_us: Micros,
    us_per_quarter: u32,
}

impl TempoSegments {
    fn new(ppq: u16, points: BTreeMap<Tick, u32>, override_us_per_quarter: Option<u32>) -> Self {
        let mut points: Vec<(Tick, u32)> = if let Some(us_per_quarter) = override_us_per_quarter {
            vec![(0, us_per_quarter)]
        } else {
            points.into_iter().collect()
        };
        if points.is_empty() || points[0].0 != 0 {
            points.insert(0, (0, 500_000));
        }

        let mut segments = Vec::with_capacity(points.len());
        let mut current_us: Micros = 0;
        for (idx, (tick, us_per_quarter)) in points.iter().enumerate() {
            if idx > 0 {
                let (prev_tick, prev_tempo) = points[idx - 1];
                current_us += ticks_to_us(tick - prev_tick, prev_tempo, ppq);
            }
            segments.push(TempoSegment {
                start_tick: *tick,
                start_us: current_us,
                us_per_quarter: *us_per_quarter,
            });
        }

        Self { ppq, segments }
    }

    fn tick_to_micros(&self, tick: Tick) -> Micros {
        let mut seg = self.segments[0];
        for candidate in &self.segments {
            if candidate.start_tick > tick {
                break;
            }
            seg = *candidate;
        }
        seg.start_us + ticks_to_us(tick - seg.start_tick, seg.us_per_quarter, self.ppq)
    }
}

fn ticks_to_us(ticks: Tick, us_per_quarter: u32, ppq: u16) -> Micros {
    let ticks = ticks as i128;
    let us_per_quarter = us_per_quarter as i128;
    let ppq = ppq.max(1) as i128;
    ((ticks * us_per_quarter) / ppq) as Micros
}

fn timecode_ppq_and_tempo(fps: Fps, ticks_per_frame: u8) -> (u16, u32) {
    let ticks_per_frame = ticks_per_frame.max(1) as u16;
    match fps {
        Fps::Fps24 => (24 * ticks_per_frame, 1_000_000),
        Fps::Fps25 => (25 * ticks_per_frame, 1_000_000),
        Fps::Fps30 => (30 * ticks_per_frame, 1_000_000),
        Fps::Fps29 => (30 * ticks_per_frame, 1_001_000),
    }
}
