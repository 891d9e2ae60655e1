use ocarina_domain_judge::{
    classify, multiplier_for_chain, Judge, JudgeConfig, NotePrecision, ScoreTally,
};
use ocarina_domain_sheet::TargetNote;
use ocarina_ports::types::NoteName;
use pretty_assertions::assert_eq;

fn target(id: u64, at_us: i64, note: NoteName) -> TargetNote {
    TargetNote { id, at_us, note }
}

#[test]
fn multiplier_steps_at_band_boundaries() {
    let cases = [(9, 1), (10, 2), (15, 2), (16, 4), (20, 4), (21, 8)];
    for (chain, expected) in cases {
        assert_eq!(multiplier_for_chain(chain), expected, "chain {chain}");
    }
    assert_eq!(multiplier_for_chain(0), 1);
    assert_eq!(multiplier_for_chain(100), 8);
}

#[test]
fn classify_sectors_across_the_window() {
    // Target at 1s, window 600ms: open 700ms, close 1300ms.
    let at = 1_000_000;
    let note = NoteName::A4;
    let window = 600_000;

    assert_eq!(
        classify(at, note, note, 699_999, window),
        NotePrecision::EarlyMiss
    );
    assert_eq!(classify(at, note, note, 700_000, window), NotePrecision::Left);
    assert_eq!(classify(at, note, note, 899_999, window), NotePrecision::Left);
    assert_eq!(
        classify(at, note, note, 900_000, window),
        NotePrecision::Middle
    );
    assert_eq!(
        classify(at, note, note, 1_000_000, window),
        NotePrecision::Middle
    );
    assert_eq!(
        classify(at, note, note, 1_100_000, window),
        NotePrecision::Right
    );
    assert_eq!(
        classify(at, note, note, 1_300_000, window),
        NotePrecision::Right
    );
    assert_eq!(
        classify(at, note, note, 1_300_001, window),
        NotePrecision::Miss
    );
}

#[test]
fn wrong_note_in_window_is_a_miss() {
    let outcome = classify(1_000_000, NoteName::A4, NoteName::C4, 1_000_000, 600_000);
    assert_eq!(outcome, NotePrecision::Miss);
}

#[test]
fn miss_resets_chain_but_early_miss_restarts_at_one() {
    let mut tally = ScoreTally::default();
    tally.apply(NotePrecision::Middle);
    tally.apply(NotePrecision::Middle);
    tally.apply(NotePrecision::Middle);

    let after_miss = tally.apply(NotePrecision::Miss);
    assert_eq!(after_miss.hit_streak, 0);
    assert_eq!(after_miss.latest_delta, -10);

    tally.apply(NotePrecision::Middle);
    tally.apply(NotePrecision::Middle);
    let after_early = tally.apply(NotePrecision::EarlyMiss);
    assert_eq!(after_early.hit_streak, 1);
    assert_eq!(after_early.latest_delta, -20);
}

#[test]
fn twelve_center_hits_cross_the_first_multiplier_band() {
    let mut tally = ScoreTally::default();
    let mut last = None;
    for _ in 0..12 {
        last = Some(tally.apply(NotePrecision::Middle));
    }
    // Nine hits at x1 (20 each), three at x2 (40 each).
    let last = last.unwrap();
    assert_eq!(last.total_score, 300);
    assert_eq!(last.hit_streak, 12);
    assert_eq!(tally.hit_notes, 12);
}

#[test]
fn flank_hits_score_the_lower_bonus() {
    let mut tally = ScoreTally::default();
    let left = tally.apply(NotePrecision::Left);
    assert_eq!(left.latest_delta, 15);
    let right = tally.apply(NotePrecision::Right);
    assert_eq!(right.latest_delta, 15);
}

#[test]
fn highest_streak_survives_a_chain_break() {
    let mut tally = ScoreTally::default();
    for _ in 0..5 {
        tally.apply(NotePrecision::Middle);
    }
    tally.apply(NotePrecision::Miss);
    tally.apply(NotePrecision::Middle);
    assert_eq!(tally.highest_streak, 5);
    assert_eq!(tally.hit_streak, 1);
}

#[test]
fn expired_target_becomes_a_miss_exactly_once() {
    let mut judge = Judge::new(JudgeConfig { window_us: 600_000 });
    judge.load_targets(vec![target(1, 1_000_000, NoteName::C4)]);

    // Window closes at 1.3s.
    assert!(judge.advance_to(1_300_000).is_empty());
    let missed = judge.advance_to(1_300_001);
    assert_eq!(missed.len(), 1);
    assert_eq!(missed[0].precision, NotePrecision::Miss);
    assert!(judge.advance_to(2_000_000).is_empty());
}

#[test]
fn live_hit_consumes_the_current_target() {
    let mut judge = Judge::new(JudgeConfig { window_us: 600_000 });
    judge.load_targets(vec![
        target(1, 1_000_000, NoteName::C4),
        target(2, 2_000_000, NoteName::E4),
    ]);

    let first = judge.on_note_on(NoteName::C4, 1_000_000);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].precision, NotePrecision::Middle);
    assert_eq!(judge.current_target().map(|t| t.id), Some(2));
}

#[test]
fn late_press_flushes_expired_targets_first() {
    let mut judge = Judge::new(JudgeConfig { window_us: 600_000 });
    judge.load_targets(vec![
        target(1, 1_000_000, NoteName::C4),
        target(2, 3_000_000, NoteName::E4),
    ]);

    // Pressing at 3s: target 1 expired long ago, target 2 is due.
    let interactions = judge.on_note_on(NoteName::E4, 3_000_000);
    assert_eq!(interactions.len(), 2);
    assert_eq!(interactions[0].precision, NotePrecision::Miss);
    assert_eq!(interactions[1].precision, NotePrecision::Middle);
}

#[test]
fn early_press_consumes_the_upcoming_target() {
    let mut judge = Judge::new(JudgeConfig { window_us: 600_000 });
    judge.load_targets(vec![target(1, 5_000_000, NoteName::C4)]);

    let interactions = judge.on_note_on(NoteName::C4, 1_000_000);
    assert_eq!(interactions.len(), 1);
    assert_eq!(interactions[0].precision, NotePrecision::EarlyMiss);
    assert!(judge.current_target().is_none());
}

#[test]
fn stray_input_after_the_last_target_is_ignored() {
    let mut judge = Judge::new(JudgeConfig::default());
    judge.load_targets(Vec::new());
    assert!(judge.on_note_on(NoteName::C4, 0).is_empty());
}

#[test]
fn precision_codes_roundtrip() {
    for code in 0..=4u8 {
        let precision = NotePrecision::from_code(code).unwrap();
        assert_eq!(precision.to_code(), code);
    }
    assert!(NotePrecision::from_code(5).is_none());
}
