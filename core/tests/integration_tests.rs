use fluteplan_core::calibration::DesignSession;
use fluteplan_core::models;
use fluteplan_core::physics::{Method, Tube, WarningKind};
use fluteplan_core::pitch;

fn d4_session() -> DesignSession {
    // A 580 mm tube sounds close to D4 once the open-end correction is in.
    let tube = Tube::new(580.0, 20.0, 3.0).unwrap();
    DesignSession::new(tube, 20.0, Method::HalfWave)
}

#[test]
fn test_full_design_session() {
    let mut session = d4_session();
    let warnings = session.generate_notes(293.66, 6).unwrap();
    assert!(warnings.is_empty(), "expected a clean solve: {warnings:?}");
    assert!(session.validate());

    // Six chromatic steps above D4: higher notes vent closer to the
    // blowing end, so from-base distances increase with pitch.
    let positions: Vec<f64> = session
        .notes
        .iter()
        .map(|n| n.position.unwrap())
        .collect();
    for pair in positions.windows(2) {
        assert!(pair[0] < pair[1]);
    }

    // Drill hole 1, measure it flat, and let the engine recalibrate
    let before = session.notes.clone();
    let measurement = session.measure_note(0, 308.0, 5.0).unwrap();
    assert!(measurement.delta_warnings.is_empty());
    assert!(session.delta_is_measured);

    // Ground truth never moves again
    assert!(session.notes[0].is_measured);
    assert_eq!(session.notes[0].position, before[0].position);
    assert_eq!(session.notes[0].frequency, 308.0);

    // Everything downstream shifted toward the base (flat hole => the
    // correction grew)
    for index in 1..6 {
        assert!(session.notes[index].position.unwrap() > before[index].position.unwrap());
    }
    assert!(session.validate());

    // A second measurement supersedes the first delta and leaves both
    // measured holes alone
    let first_delta = session.delta;
    session.measure_note(1, 326.0, 5.0).unwrap();
    assert_ne!(session.delta, first_delta);
    assert!(session.notes[0].is_measured && session.notes[1].is_measured);
    assert_eq!(session.notes[0].frequency, 308.0);
    assert_eq!(session.notes[1].frequency, 326.0);
}

#[test]
fn test_regeneration_keeps_measurements_across_base_change() {
    let mut session = d4_session();
    session.generate_notes(293.66, 6).unwrap();
    session.measure_note(0, 308.0, 5.0).unwrap();
    let frozen = session.notes[0].clone();

    // The maker retunes the design a semitone up and asks for two more holes
    session.generate_notes(311.13, 8).unwrap();
    assert_eq!(session.notes.len(), 8);
    assert_eq!(session.notes[0], frozen);
    assert!(session.notes[1..].iter().all(|n| !n.is_measured));
    assert!(session.notes.iter().all(|n| n.position.is_some()));
}

#[test]
fn test_out_of_range_targets_are_flagged_not_fatal() {
    let mut session = d4_session();
    // Two octaves below the tube's range: nothing fits
    let warnings = session.generate_notes(73.42, 3).unwrap();
    assert!(!warnings.is_empty());
    assert!(warnings
        .iter()
        .all(|w| w.warning == WarningKind::OutOfRange));
    assert!(!session.validate());
}

#[test]
fn test_engine_surface_stays_consistent_between_methods() {
    // The same target drilled under the quarter-wave model sits much closer
    // to the blowing end, since the stopped tube needs half the column.
    let tube = Tube::new(580.0, 20.0, 3.0).unwrap();
    let mut half = DesignSession::new(tube, 20.0, Method::HalfWave);
    let mut quarter = DesignSession::new(tube, 20.0, Method::QuarterWave);

    half.generate_notes(293.66, 1).unwrap();
    quarter.generate_notes(146.83, 1).unwrap();

    // 293.66 half-wave and 146.83 quarter-wave want the same air column,
    // but the a-priori deltas differ, so the holes land close, not equal.
    let p_half = half.notes[0].position.unwrap();
    let p_quarter = quarter.notes[0].position.unwrap();
    assert!((p_half - p_quarter).abs() < 10.0);
}

#[test]
fn test_ratio_method_agrees_with_pitch_helpers() {
    let model = models::model_by_key("pentatonic_6").unwrap();
    let holes = models::ratio_positions(model, 440.0, 19.0, 20.0).unwrap();

    for hole in &holes {
        let expected =
            pitch::frequency_from_semitone_offset(440.0, hole.semitone as f64);
        assert!((hole.frequency - expected).abs() < 1e-9);
        assert_eq!(
            hole.note,
            pitch::note_name_with_octave(hole.frequency).unwrap()
        );
    }
}
