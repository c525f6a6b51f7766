use crate::physics::*;

fn test_tube() -> Tube {
    Tube::new(450.0, 20.0, 3.0).unwrap()
}

#[test]
fn speed_of_sound_matches_reference_points() {
    // (331.3 + 0.606 * T) * 1000 mm/s
    assert!((speed_of_sound(20.0) - 343_420.0).abs() < 0.1);
    assert!((speed_of_sound(0.0) - 331_300.0).abs() < 0.1);
    assert!((speed_of_sound(30.0) - 349_480.0).abs() < 0.1);
}

#[test]
fn speed_of_sound_increases_with_temperature() {
    assert!(speed_of_sound(20.0) > speed_of_sound(0.0));
    assert!(speed_of_sound(40.0) > speed_of_sound(20.0));
    // No clamping: extreme temperatures extrapolate
    assert!(speed_of_sound(-60.0) < speed_of_sound(-40.0));
}

#[test]
fn effective_length_reference_points() {
    // Half-wave at A4, 20 C: 343420 / 880 = 390.25 mm
    assert!((effective_length(440.0, 20.0, Method::HalfWave) - 390.25).abs() < 0.01);
    // Quarter-wave at A3: same length, the halved divisor compensates
    assert!((effective_length(220.0, 20.0, Method::QuarterWave) - 390.25).abs() < 0.01);
}

#[test]
fn quarter_wave_is_exactly_half_of_half_wave() {
    for &f in &[110.0, 261.63, 440.0, 987.77] {
        for &t in &[-10.0, 0.0, 20.0, 35.0] {
            let half = effective_length(f, t, Method::HalfWave);
            let quarter = effective_length(f, t, Method::QuarterWave);
            assert_eq!(quarter, 0.5 * half, "f={f} t={t}");
        }
    }
}

#[test]
fn hole_end_correction_grows_with_hole_size() {
    let model = HoleCorrectionModel::default();
    let mut last = 0.0;
    for d in [3.0, 5.0, 8.0, 12.0, 15.0] {
        let correction = model.hole_end_correction(d, 19.0);
        assert!(correction > last, "correction must grow with diameter");
        last = correction;
    }
    // alpha = 0.75 + 0.5 * (8/20) = 0.95, times radius 4
    assert!((model.hole_end_correction(8.0, 20.0) - 3.8).abs() < 1e-12);
}

#[test]
fn chimney_correction_is_linear_in_wall() {
    let model = HoleCorrectionModel::default();
    assert_eq!(model.chimney_correction(0.0), 0.0);
    assert!((model.chimney_correction(3.0) - 2.25).abs() < 1e-12);
    assert!((model.chimney_correction(4.0) - 2.0 * model.chimney_correction(2.0)).abs() < 1e-12);
}

#[test]
fn a_priori_delta_per_method() {
    // 0.6 x radius open-open, 1.0 x radius stopped
    assert!((a_priori_delta(Method::HalfWave, 19.0) - 5.7).abs() < 1e-12);
    assert!((a_priori_delta(Method::QuarterWave, 19.0) - 9.5).abs() < 1e-12);
}

#[test]
fn delta_band_flags_only_outliers() {
    // Estimate for 20 mm bore, half-wave: 6.0 -> band [1.2, 18.0]
    assert_eq!(delta_plausibility(6.0, Method::HalfWave, 20.0), None);
    assert_eq!(delta_plausibility(1.3, Method::HalfWave, 20.0), None);
    assert_eq!(delta_plausibility(17.9, Method::HalfWave, 20.0), None);
    assert_eq!(
        delta_plausibility(0.5, Method::HalfWave, 20.0),
        Some(WarningKind::ImplausibleDelta)
    );
    assert_eq!(
        delta_plausibility(25.0, Method::HalfWave, 20.0),
        Some(WarningKind::ImplausibleDelta)
    );
    assert_eq!(
        delta_plausibility(-2.0, Method::HalfWave, 20.0),
        Some(WarningKind::ImplausibleDelta)
    );
}

#[test]
fn solve_position_concrete_scenario() {
    // 450 mm tube, 20 mm bore, 3 mm wall, 20 C, half-wave, A4 target
    let tube = test_tube();
    let model = HoleCorrectionModel::default();

    let small = solve_position(440.0, 8.0, 5.7, &tube, 20.0, Method::HalfWave, &model).unwrap();
    assert!(small.position_mm > 0.0 && small.position_mm < 450.0);
    assert!(!small.clamped);
    assert!(small.warnings.is_empty());

    // Bigger hole vents closer to the blowing end, i.e. further from the base
    let large = solve_position(440.0, 12.0, 5.7, &tube, 20.0, Method::HalfWave, &model).unwrap();
    assert!(small.position_mm < large.position_mm);

    let from_blowing_small = 450.0 - small.position_mm;
    let from_blowing_large = 450.0 - large.position_mm;
    assert!(from_blowing_large < from_blowing_small);
}

#[test]
fn solve_position_higher_frequency_moves_toward_blowing_end() {
    let tube = test_tube();
    let model = HoleCorrectionModel::default();
    let a4 = solve_position(440.0, 8.0, 5.7, &tube, 20.0, Method::HalfWave, &model).unwrap();
    let d5 = solve_position(587.33, 8.0, 5.7, &tube, 20.0, Method::HalfWave, &model).unwrap();
    assert!(450.0 - d5.position_mm < 450.0 - a4.position_mm);
}

#[test]
fn solve_position_clamps_when_no_air_column_remains() {
    // At 20 kHz the effective length is shorter than the corrections, so
    // the acoustic distance goes negative and the result clamps.
    let tube = test_tube();
    let model = HoleCorrectionModel::default();
    let solve = solve_position(20_000.0, 8.0, 5.7, &tube, 20.0, Method::HalfWave, &model).unwrap();
    assert!(solve.clamped);
    assert!(solve.warnings.contains(&WarningKind::OutOfRange));
    assert_eq!(solve.position_mm, tube.physical_length);
}

#[test]
fn solve_position_clamps_low_targets_to_zero() {
    // 100 Hz wants a 1.7 m air column; it cannot fit a 450 mm tube.
    let tube = test_tube();
    let model = HoleCorrectionModel::default();
    let solve = solve_position(100.0, 8.0, 5.7, &tube, 20.0, Method::HalfWave, &model).unwrap();
    assert!(solve.clamped);
    assert!(solve.warnings.contains(&WarningKind::OutOfRange));
    assert_eq!(solve.position_mm, 0.0);
}

#[test]
fn solvers_reject_non_positive_inputs() {
    let tube = test_tube();
    let model = HoleCorrectionModel::default();
    assert!(solve_position(0.0, 8.0, 5.7, &tube, 20.0, Method::HalfWave, &model).is_err());
    assert!(solve_position(440.0, -1.0, 5.7, &tube, 20.0, Method::HalfWave, &model).is_err());
    assert!(solve_delta(-440.0, 100.0, 8.0, &tube, 20.0, Method::HalfWave, &model).is_err());
    assert!(solve_delta(440.0, 100.0, 0.0, &tube, 20.0, Method::HalfWave, &model).is_err());
    assert!(Tube::new(0.0, 20.0, 3.0).is_err());
    assert!(Tube::new(450.0, -20.0, 3.0).is_err());
    assert!(Tube::new(450.0, 20.0, -0.1).is_err());
}

#[test]
fn method_strings_round_trip() {
    assert_eq!(Method::parse("half-wave").unwrap(), Method::HalfWave);
    assert_eq!(Method::parse("quarter-wave").unwrap(), Method::QuarterWave);
    assert_eq!(Method::HalfWave.as_str(), "half-wave");
    assert!(Method::parse("eighth-wave").is_err());
}

#[test]
fn forward_then_inverse_recovers_delta() {
    let tube = test_tube();
    let model = HoleCorrectionModel::default();
    for method in [Method::HalfWave, Method::QuarterWave] {
        for &delta in &[2.0, 5.7, 9.5, 14.0] {
            let frequency = match method {
                Method::HalfWave => 440.0,
                Method::QuarterWave => 220.0,
            };
            let forward =
                solve_position(frequency, 8.0, delta, &tube, 20.0, method, &model).unwrap();
            assert!(!forward.clamped, "pick inputs that stay in range");

            let inverse = solve_delta(
                frequency,
                forward.position_mm,
                8.0,
                &tube,
                20.0,
                method,
                &model,
            )
            .unwrap();
            assert!(
                (inverse.delta_mm - delta).abs() < 1e-9,
                "round trip broke: {} vs {delta}",
                inverse.delta_mm
            );
        }
    }
}

#[test]
fn implausible_measurement_is_flagged_but_accepted() {
    // A hole measured 100 mm from the blowing end at 440 Hz implies an
    // absurd 284 mm end correction; the solver reports it and moves on.
    let tube = test_tube();
    let model = HoleCorrectionModel::default();
    let solve = solve_delta(440.0, 350.0, 8.0, &tube, 20.0, Method::HalfWave, &model).unwrap();
    assert!(solve.delta_mm > 250.0);
    assert!(solve.warnings.contains(&WarningKind::ImplausibleDelta));
}

#[test]
fn fuzz_round_trip_over_plausible_geometries() {
    // Simple deterministic PRNG
    let mut seed: u32 = 123456789;
    let mut rand = || {
        seed = (seed.wrapping_mul(1103515245).wrapping_add(12345)) & 0x7fffffff;
        seed as f64 / 0x7fffffff as f64
    };

    let model = HoleCorrectionModel::default();
    for i in 0..1000 {
        let tube = Tube::new(
            300.0 + rand() * 400.0,
            12.0 + rand() * 18.0,
            1.0 + rand() * 4.0,
        )
        .unwrap();
        let frequency = 200.0 + rand() * 1800.0;
        let hole = 3.0 + rand() * 12.0;
        let delta = 2.0 + rand() * 13.0;
        let temperature = rand() * 40.0;
        let method = if rand() > 0.5 {
            Method::HalfWave
        } else {
            Method::QuarterWave
        };

        let forward =
            solve_position(frequency, hole, delta, &tube, temperature, method, &model).unwrap();
        assert!(forward.position_mm.is_finite());
        assert!(forward.position_mm >= 0.0 && forward.position_mm <= tube.physical_length);

        if forward.clamped {
            continue;
        }
        let inverse = solve_delta(
            frequency,
            forward.position_mm,
            hole,
            &tube,
            temperature,
            method,
            &model,
        )
        .unwrap();
        let tolerance = 1e-6 * delta.abs().max(1.0);
        assert!(
            (inverse.delta_mm - delta).abs() < tolerance,
            "iteration {i}: {} vs {delta}",
            inverse.delta_mm
        );
    }
}
