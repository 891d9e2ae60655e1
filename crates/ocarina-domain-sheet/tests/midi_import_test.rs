use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use ocarina_domain_sheet::import_midi_bytes;
use ocarina_ports::types::NoteName;

fn note_on(delta: u32, key: u8, vel: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            },
        },
    }
}

fn note_off(delta: u32, key: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            },
        },
    }
}

fn tempo(delta: u32, us_per_quarter: u32) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(us_per_quarter))),
    }
}

fn smf_bytes(events: Vec<TrackEvent<'static>>) -> Vec<u8> {
    let mut track = events;
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    let smf = Smf {
        header: Header {
            format: Format::SingleTrack,
            timing: Timing::Metrical(u15::new(480)),
        },
        tracks: vec![track],
    };
    let mut data = Vec::new();
    smf.write(&mut data).unwrap();
    data
}

#[test]
fn import_builds_timed_notes_and_targets() {
    let data = smf_bytes(vec![
        note_on(0, 60, 100),
        note_off(480, 60),
        note_on(0, 64, 90),
        note_off(480, 64),
    ]);

    let sheet = import_midi_bytes(&data).unwrap();

    // Default tempo: 480 ticks = one quarter = 500ms.
    assert_eq!(sheet.targets.len(), 2);
    assert_eq!(sheet.targets[0].note, NoteName::C4);
    assert_eq!(sheet.targets[0].at_us, 0);
    assert_eq!(sheet.targets[1].note, NoteName::E4);
    assert_eq!(sheet.targets[1].at_us, 500_000);
    assert_eq!(sheet.notes.len(), 4);
    assert_eq!(sheet.length_us, 1_000_000);
}

#[test]
fn tempo_change_shifts_later_events() {
    let data = smf_bytes(vec![
        note_on(0, 60, 100),
        note_off(480, 60),
        // Double speed from here on.
        tempo(0, 250_000),
        note_on(480, 62, 100),
        note_off(480, 62),
    ]);

    let sheet = import_midi_bytes(&data).unwrap();

    assert_eq!(sheet.targets.len(), 2);
    // 500ms at the default tempo, then 480 ticks at 250ms per quarter.
    assert_eq!(sheet.targets[1].at_us, 750_000);
    assert_eq!(sheet.length_us, 1_000_000);
}

#[test]
fn keys_outside_playable_range_are_skipped() {
    let data = smf_bytes(vec![
        note_on(0, 30, 100),
        note_off(120, 30),
        note_on(0, 72, 100),
        note_off(480, 72),
    ]);

    let sheet = import_midi_bytes(&data).unwrap();

    assert_eq!(sheet.targets.len(), 1);
    assert_eq!(sheet.targets[0].note, NoteName::C5);
    assert_eq!(sheet.notes.len(), 2);
}

#[test]
fn zero_velocity_note_on_is_not_a_target() {
    let data = smf_bytes(vec![note_on(0, 60, 100), note_on(480, 60, 0)]);

    let sheet = import_midi_bytes(&data).unwrap();

    assert_eq!(sheet.targets.len(), 1);
    assert!(!sheet.notes[1].signal.on);
}

#[test]
fn garbage_bytes_fail_to_parse() {
    assert!(import_midi_bytes(&[0x00, 0x01, 0x02]).is_err());
}
