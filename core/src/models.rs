use crate::physics::{self, HoleCorrectionModel};
use crate::pitch::{self, CHROMATIC_SCALE};
use crate::EngineError;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;

/// A named just-intonation interval and its equal-tempered semitone count.
#[derive(Serialize, Debug, Clone, Copy)]
pub struct IntervalRatio {
    pub name: &'static str,
    pub ratio: f64,
    pub semitones: i32,
}

/// The interval table of the Sanfen-Sunyi (three-parts gain/loss) method.
pub const INTERVAL_RATIOS: [IntervalRatio; 8] = [
    IntervalRatio { name: "Perfect Fifth (San Fen Sun Yi)", ratio: 3.0 / 2.0, semitones: 7 },
    IntervalRatio { name: "Perfect Fourth (San Fen Yi Yi)", ratio: 4.0 / 3.0, semitones: 5 },
    IntervalRatio { name: "Major Third", ratio: 5.0 / 4.0, semitones: 4 },
    IntervalRatio { name: "Minor Third", ratio: 6.0 / 5.0, semitones: 3 },
    IntervalRatio { name: "Major Second", ratio: 9.0 / 8.0, semitones: 2 },
    IntervalRatio { name: "Minor Second", ratio: 16.0 / 15.0, semitones: 1 },
    IntervalRatio { name: "Major Sixth", ratio: 5.0 / 3.0, semitones: 9 },
    IntervalRatio { name: "Minor Seventh", ratio: 16.0 / 9.0, semitones: 10 },
];

/// A fixed hole layout: ordered semitone offsets from the base pitch.
#[derive(Serialize, Debug, Clone, Copy)]
pub struct ScaleModel {
    pub key: &'static str,
    pub name: &'static str,
    pub holes: usize,
    pub intervals: &'static [i32],
}

/// The traditional xiao layouts, most common first within each hole count.
pub static SCALE_MODELS: [ScaleModel; 8] = [
    ScaleModel {
        key: "pentatonic_8",
        name: "Traditional major pentatonic (8 holes)",
        holes: 8,
        intervals: &[0, 2, 4, 7, 9, 12, 14, 16],
    },
    ScaleModel {
        key: "heptatonic_8",
        name: "Traditional heptatonic (8 holes)",
        holes: 8,
        intervals: &[0, 2, 4, 5, 7, 9, 10, 12],
    },
    ScaleModel {
        key: "diatonic_8",
        name: "Modern diatonic (8 holes)",
        holes: 8,
        intervals: &[0, 2, 4, 5, 7, 9, 11, 12],
    },
    ScaleModel {
        key: "pentatonic_7a",
        name: "Pentatonic with diatonic fourth (7 holes)",
        holes: 7,
        intervals: &[0, 2, 4, 7, 8, 10, 13],
    },
    ScaleModel {
        key: "pentatonic_7b",
        name: "Pentatonic with minor seventh (7 holes)",
        holes: 7,
        intervals: &[0, 2, 4, 7, 9, 10, 13],
    },
    ScaleModel {
        key: "pentatonic_6",
        name: "Traditional pentatonic (6 holes)",
        holes: 6,
        intervals: &[0, 2, 4, 7, 9, 12],
    },
    ScaleModel {
        key: "pentatonic_5",
        name: "Pure pentatonic (5 holes)",
        holes: 5,
        intervals: &[0, 2, 4, 7, 9],
    },
    ScaleModel {
        key: "pentatonic_4",
        name: "Minimal pentatonic (4 holes)",
        holes: 4,
        intervals: &[0, 2, 5, 7],
    },
];

static MODEL_INDEX: Lazy<BTreeMap<&'static str, &'static ScaleModel>> =
    Lazy::new(|| SCALE_MODELS.iter().map(|m| (m.key, m)).collect());

pub fn model_by_key(key: &str) -> Option<&'static ScaleModel> {
    MODEL_INDEX.get(key).copied()
}

pub fn models_for_hole_count(holes: usize) -> Vec<&'static ScaleModel> {
    SCALE_MODELS.iter().filter(|m| m.holes == holes).collect()
}

/// Ergonomic advisory on the spacing between two adjacent holes.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpacingAdvisory {
    /// Under 10 mm: the holes overlap in practice.
    Overlap,
    /// Under 15 mm: playable but hard to finger.
    TightSpacing,
}

const OVERLAP_SPACING_MM: f64 = 10.0;
const TIGHT_SPACING_MM: f64 = 15.0;

/// One row of the ratio-method table. `distance_from_edge` is the effective
/// length from the blowing edge (this method knows nothing about the
/// physical tube, so no base-end frame exists for it).
#[derive(Serialize, Debug, Clone)]
pub struct RatioHole {
    pub hole: usize,
    pub distance_from_edge: f64,
    pub spacing_to_next: Option<f64>,
    pub semitone: i32,
    pub note: String,
    pub frequency: f64,
    pub advisory: Option<SpacingAdvisory>,
}

/// Hole layouts that are traditionally wide anyway and exempt from the
/// spacing advisories (thumb holes and the last pair of dense layouts).
pub fn is_special_hole_pair(hole_index: usize, total_holes: usize) -> bool {
    match total_holes {
        8 => hole_index == 0 || hole_index == 6,
        7 => hole_index == 5,
        _ => false,
    }
}

/// The simple ratio method: each model interval maps to an effective length
/// with the plain open-tube end correction (0.6 x bore radius), no per-hole
/// geometry involved.
pub fn ratio_positions(
    model: &ScaleModel,
    base_frequency: f64,
    bore_diameter: f64,
    temperature_c: f64,
) -> Result<Vec<RatioHole>, EngineError> {
    if base_frequency <= 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "base frequency must be positive, got {base_frequency}"
        )));
    }
    if bore_diameter <= 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "bore diameter must be positive, got {bore_diameter}"
        )));
    }

    let speed = physics::speed_of_sound(temperature_c);
    let end_correction = 0.6 * (bore_diameter / 2.0);

    let lengths: Vec<(i32, f64, f64)> = model
        .intervals
        .iter()
        .map(|&semitone| {
            let frequency = pitch::frequency_from_semitone_offset(base_frequency, semitone as f64);
            let distance = speed / (2.0 * frequency) - end_correction;
            (semitone, frequency, distance)
        })
        .collect();

    let total = lengths.len();
    lengths
        .iter()
        .enumerate()
        .map(|(i, &(semitone, frequency, distance))| {
            let spacing_to_next = lengths
                .get(i + 1)
                .map(|&(_, _, next)| (distance - next).abs());
            let advisory = match spacing_to_next {
                Some(s) if !is_special_hole_pair(i, total) && s < OVERLAP_SPACING_MM => {
                    Some(SpacingAdvisory::Overlap)
                }
                Some(s) if !is_special_hole_pair(i, total) && s < TIGHT_SPACING_MM => {
                    Some(SpacingAdvisory::TightSpacing)
                }
                _ => None,
            };
            Ok(RatioHole {
                hole: i + 1,
                distance_from_edge: distance,
                spacing_to_next,
                semitone,
                note: pitch::note_name_with_octave(frequency)?,
                frequency,
                advisory,
            })
        })
        .collect()
}

// Benade's empirical constant for the hole-ratio correction factor.
const BENADE_K: f64 = 0.25;

// Row of semitone offsets the Benade table is computed over, rooted on D.
const BENADE_SEMITONES: [i32; 8] = [2, 4, 5, 7, 9, 11, 12, 14];
const BENADE_ROOT_INDEX: usize = 2;

/// One row of the Benade-formula table, distances from the blowing edge.
#[derive(Serialize, Debug, Clone)]
pub struct BenadeHole {
    pub hole: usize,
    pub basic_position: f64,
    pub corrected_position: f64,
    pub note: String,
}

/// Benade's closed-form layout: basic position L * (1 - 2^(-s/12)),
/// scaled by 1 + K * (d/D)^2 and offset by the chimney correction.
pub fn benade_positions(
    length: f64,
    bore_diameter: f64,
    hole_diameter: f64,
    wall_thickness: f64,
    num_holes: usize,
) -> Result<Vec<BenadeHole>, EngineError> {
    if length <= 0.0 || bore_diameter <= 0.0 || hole_diameter <= 0.0 {
        return Err(EngineError::InvalidInput(
            "length, bore diameter and hole diameter must be positive".to_string(),
        ));
    }
    if num_holes > BENADE_SEMITONES.len() {
        return Err(EngineError::InvalidInput(format!(
            "the Benade table covers at most {} holes, got {num_holes}",
            BENADE_SEMITONES.len()
        )));
    }

    let hole_ratio = hole_diameter / bore_diameter;
    let correction_factor = 1.0 + BENADE_K * hole_ratio * hole_ratio;
    let chimney = HoleCorrectionModel::default().chimney_correction(wall_thickness);

    Ok(BENADE_SEMITONES[..num_holes]
        .iter()
        .enumerate()
        .map(|(i, &semitone)| {
            let ratio = 1.0 - 2.0_f64.powf(-semitone as f64 / 12.0);
            let basic_position = length * ratio;
            BenadeHole {
                hole: i + 1,
                basic_position,
                corrected_position: basic_position * correction_factor + chimney,
                note: CHROMATIC_SCALE[(BENADE_ROOT_INDEX + semitone as usize) % 12].to_string(),
            }
        })
        .collect())
}
