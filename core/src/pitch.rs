use crate::EngineError;
use serde::Serialize;

/// The 12 pitch classes, index 0 = C.
pub const CHROMATIC_SCALE: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const A4: f64 = 440.0;

// C0 = A4 * 2^-4.75 (~16.35 Hz), the reference for chromatic indexing
fn c0() -> f64 {
    A4 * 2.0_f64.powf(-4.75)
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ClosestNote {
    pub name: String,
    pub chromatic_index: u8,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct FrequencyAccuracy {
    pub is_exact: bool,
    pub cents: f64,
    pub closest_note: String,
}

/// Nearest pitch class for a frequency, without octave.
pub fn closest_note(frequency: f64) -> Result<ClosestNote, EngineError> {
    let index = chromatic_index(frequency)?;
    Ok(ClosestNote {
        name: CHROMATIC_SCALE[index as usize].to_string(),
        chromatic_index: index,
    })
}

/// Nearest pitch class index in [0, 12).
pub fn chromatic_index(frequency: f64) -> Result<u8, EngineError> {
    let half_steps = half_steps_above_c0(frequency)?;
    let index = (half_steps.round() as i64).rem_euclid(12);
    Ok(index as u8)
}

/// Nearest note name with octave, e.g. "A4" or "C#5".
pub fn note_name_with_octave(frequency: f64) -> Result<String, EngineError> {
    let half_steps = half_steps_above_c0(frequency)?;
    let rounded = half_steps.round() as i64;
    let index = rounded.rem_euclid(12) as usize;
    let octave = rounded.div_euclid(12);
    Ok(format!("{}{}", CHROMATIC_SCALE[index], octave))
}

/// f = base * 2^(n/12). Total for positive base; n may be fractional.
pub fn frequency_from_semitone_offset(base_frequency: f64, semitones: f64) -> f64 {
    base_frequency * 2.0_f64.powf(semitones / 12.0)
}

/// Signed fractional semitone interval from f1 to f2.
/// Antisymmetric: semitone_interval(a, b) == -semitone_interval(b, a).
/// Both frequencies must be positive.
pub fn semitone_interval(f1: f64, f2: f64) -> f64 {
    12.0 * (f2 / f1).log2()
}

/// How far a frequency sits from the chromatic grid, in cents.
/// `is_exact` when |cents| is within the tolerance (100 cents = 1 semitone).
pub fn frequency_accuracy(
    frequency: f64,
    tolerance_cents: f64,
) -> Result<FrequencyAccuracy, EngineError> {
    let closest = closest_note(frequency)?;
    let half_steps = half_steps_above_c0(frequency)?;
    let cents = (half_steps - half_steps.round()) * 100.0;

    Ok(FrequencyAccuracy {
        is_exact: cents.abs() <= tolerance_cents,
        cents,
        closest_note: closest.name,
    })
}

fn half_steps_above_c0(frequency: f64) -> Result<f64, EngineError> {
    if frequency <= 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "frequency must be positive, got {frequency}"
        )));
    }
    Ok(12.0 * (frequency / c0()).log2())
}
