use crate::physics::{self, HoleCorrectionModel, Method, Tube, WarningKind};
use crate::pitch::{self, CHROMATIC_SCALE};
use crate::EngineError;
use serde::{Deserialize, Serialize};

/// Default tone-hole diameter for freshly generated notes, mm.
pub const DEFAULT_HOLE_DIAMETER: f64 = 5.0;

/// One tone hole: the target (or measured) pitch and where to drill for it.
///
/// `position` is the distance from the open/base end, the same frame every
/// solver in this crate uses. Once `is_measured` is set the note is ground
/// truth: recalculation passes must never touch it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TargetNote {
    pub id: u32,
    pub frequency: f64,
    pub hole_diameter: f64,
    pub note_name: String,
    pub position: Option<f64>,
    pub is_measured: bool,
}

/// Empirical constants of the inter-hole coupling heuristic.
///
/// Each open hole upstream of a candidate shifts it by
/// (d / reference_diameter_mm) * exp(-spacing / decay_mm) * max_shift_mm.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct CouplingConfig {
    pub decay_mm: f64,
    pub max_shift_mm: f64,
    pub reference_diameter_mm: f64,
}

impl Default for CouplingConfig {
    fn default() -> Self {
        CouplingConfig {
            decay_mm: 50.0,
            max_shift_mm: 3.0,
            reference_diameter_mm: 5.0,
        }
    }
}

/// A warning raised while recomputing one note of a list.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteWarning {
    pub note_index: usize,
    pub warning: WarningKind,
}

/// Outcome of a recalculation pass: the new note list plus everything the
/// solver flagged along the way.
#[derive(Serialize, Debug, Clone)]
pub struct Recalibration {
    pub notes: Vec<TargetNote>,
    pub warnings: Vec<NoteWarning>,
}

/// Builds an ordered chromatic note list: note i (1-indexed) sits +i
/// semitones above the base frequency, with the default hole diameter and
/// no position yet.
pub fn generate_note_sequence(
    base_frequency: f64,
    count: usize,
) -> Result<Vec<TargetNote>, EngineError> {
    let base_index = pitch::chromatic_index(base_frequency)? as usize;

    Ok((1..=count)
        .map(|i| TargetNote {
            id: i as u32,
            frequency: pitch::frequency_from_semitone_offset(base_frequency, i as f64),
            hole_diameter: DEFAULT_HOLE_DIAMETER,
            note_name: CHROMATIC_SCALE[(base_index + i) % 12].to_string(),
            position: None,
            is_measured: false,
        })
        .collect())
}

/// Rebuilds a note list for a new base frequency and/or count without
/// losing measurements: measured notes are carried over verbatim, unmeasured
/// ones are re-derived in place (keeping their id and any edited hole
/// diameter), and growth appends fresh notes.
pub fn regenerate_preserving_measured(
    existing: &[TargetNote],
    base_frequency: f64,
    count: usize,
) -> Result<Vec<TargetNote>, EngineError> {
    let mut fresh = generate_note_sequence(base_frequency, count)?;

    for (slot, old) in fresh.iter_mut().zip(existing.iter()) {
        if old.is_measured {
            *slot = old.clone();
        } else {
            slot.id = old.id;
            slot.hole_diameter = old.hole_diameter;
        }
    }

    Ok(fresh)
}

/// Applies the near-field coupling heuristic to a candidate position.
///
/// The first hole has no upstream neighbours and passes through unchanged.
/// Otherwise every earlier hole that already has a position contributes a
/// shift that decays exponentially with spacing and scales with its
/// diameter; the sum is added to the candidate.
pub fn coupling_shift(
    candidate_position: f64,
    note_index: usize,
    notes: &[TargetNote],
    config: &CouplingConfig,
) -> f64 {
    if note_index == 0 {
        return candidate_position;
    }

    let mut cumulative = 0.0;
    for prev in notes.iter().take(note_index) {
        let Some(prev_position) = prev.position else {
            continue;
        };
        let spacing = (candidate_position - prev_position).abs();
        let coupling = (-spacing / config.decay_mm).exp();
        let size_factor = prev.hole_diameter / config.reference_diameter_mm;
        cumulative += size_factor * coupling * config.max_shift_mm;
    }

    candidate_position + cumulative
}

/// Forward-solves every unmeasured note against the current delta.
pub fn refresh_positions(
    notes: &[TargetNote],
    delta: f64,
    tube: &Tube,
    temperature_c: f64,
    method: Method,
    corrections: &HoleCorrectionModel,
    coupling: &CouplingConfig,
) -> Result<Recalibration, EngineError> {
    recalculate(notes, None, delta, tube, temperature_c, method, corrections, coupling)
}

/// Re-runs the forward solve for every note downstream of a measurement,
/// using the delta just recovered from it. Notes at or before the measured
/// index, and measured notes anywhere, come back untouched.
#[allow(clippy::too_many_arguments)]
pub fn recalibrate_after_measurement(
    measured_index: usize,
    notes: &[TargetNote],
    new_delta: f64,
    tube: &Tube,
    temperature_c: f64,
    method: Method,
    corrections: &HoleCorrectionModel,
    coupling: &CouplingConfig,
) -> Result<Recalibration, EngineError> {
    recalculate(
        notes,
        Some(measured_index),
        new_delta,
        tube,
        temperature_c,
        method,
        corrections,
        coupling,
    )
}

// The single recalculation pass behind refresh_positions and
// recalibrate_after_measurement. Walks in ascending index order so each
// note's coupling shift sees the already-updated positions of its
// predecessors.
#[allow(clippy::too_many_arguments)]
fn recalculate(
    notes: &[TargetNote],
    skip_through: Option<usize>,
    delta: f64,
    tube: &Tube,
    temperature_c: f64,
    method: Method,
    corrections: &HoleCorrectionModel,
    coupling: &CouplingConfig,
) -> Result<Recalibration, EngineError> {
    let mut updated = notes.to_vec();
    let mut warnings = Vec::new();

    for index in 0..updated.len() {
        if updated[index].is_measured {
            continue;
        }
        if matches!(skip_through, Some(through) if index <= through) {
            continue;
        }

        let solve = physics::solve_position(
            updated[index].frequency,
            updated[index].hole_diameter,
            delta,
            tube,
            temperature_c,
            method,
            corrections,
        )?;
        for warning in &solve.warnings {
            warnings.push(NoteWarning {
                note_index: index,
                warning: *warning,
            });
        }

        let shifted = coupling_shift(solve.position_mm, index, &updated, coupling);
        updated[index].position = Some(shifted);
    }

    Ok(Recalibration {
        notes: updated,
        warnings,
    })
}

/// Sanity gate for a calibration step: the first min(5, len) notes must all
/// sit strictly inside the tube. Notes beyond the fifth are deliberately
/// not checked.
pub fn validate_positions(notes: &[TargetNote], physical_length: f64) -> bool {
    let to_check = notes.len().min(5);
    notes[..to_check]
        .iter()
        .all(|note| matches!(note.position, Some(p) if p > 0.0 && p < physical_length))
}

/// Outcome of recording a physical measurement: the superseding delta and
/// every warning from the inverse solve and the downstream recalibration.
#[derive(Serialize, Debug, Clone)]
pub struct Measurement {
    pub delta_mm: f64,
    pub delta_warnings: Vec<WarningKind>,
    pub note_warnings: Vec<NoteWarning>,
}

/// One design session: the tube, the environment, the current delta and the
/// note list, with the calibration pipeline wired together.
#[derive(Debug, Clone)]
pub struct DesignSession {
    pub tube: Tube,
    pub temperature_c: f64,
    pub method: Method,
    pub delta: f64,
    pub delta_is_measured: bool,
    pub notes: Vec<TargetNote>,
    pub corrections: HoleCorrectionModel,
    pub coupling: CouplingConfig,
}

impl DesignSession {
    pub fn new(tube: Tube, temperature_c: f64, method: Method) -> DesignSession {
        DesignSession {
            tube,
            temperature_c,
            method,
            delta: physics::a_priori_delta(method, tube.inner_diameter),
            delta_is_measured: false,
            notes: Vec::new(),
            corrections: HoleCorrectionModel::default(),
            coupling: CouplingConfig::default(),
        }
    }

    /// Changes temperature and method. An a-priori delta tracks the method;
    /// a measured delta survives.
    pub fn set_environment(&mut self, temperature_c: f64, method: Method) {
        self.temperature_c = temperature_c;
        self.method = method;
        if !self.delta_is_measured {
            self.delta = physics::a_priori_delta(method, self.tube.inner_diameter);
        }
    }

    /// Generates (or regenerates, preserving measured notes) the note list
    /// and solves every position.
    pub fn generate_notes(
        &mut self,
        base_frequency: f64,
        count: usize,
    ) -> Result<Vec<NoteWarning>, EngineError> {
        self.notes = if self.notes.is_empty() {
            generate_note_sequence(base_frequency, count)?
        } else {
            regenerate_preserving_measured(&self.notes, base_frequency, count)?
        };
        self.refresh()
    }

    /// Edits an unmeasured note's target and re-solves the list.
    pub fn update_note(
        &mut self,
        index: usize,
        frequency: f64,
        hole_diameter: f64,
    ) -> Result<Vec<NoteWarning>, EngineError> {
        let note_name = pitch::closest_note(frequency)?.name;
        check_diameter(hole_diameter)?;
        let note = self.note_mut(index)?;
        if note.is_measured {
            return Err(EngineError::InvalidInput(format!(
                "note {index} is measured and frozen"
            )));
        }
        note.frequency = frequency;
        note.hole_diameter = hole_diameter;
        note.note_name = note_name;
        self.refresh()
    }

    /// Records a physical measurement for a drilled hole: freezes the note,
    /// recovers the delta from it, and recalibrates everything downstream.
    /// Already-measured notes are never revisited.
    pub fn measure_note(
        &mut self,
        index: usize,
        measured_frequency: f64,
        measured_diameter: f64,
    ) -> Result<Measurement, EngineError> {
        let note_name = pitch::closest_note(measured_frequency)?.name;
        check_diameter(measured_diameter)?;
        let note = self.note_mut(index)?;
        let Some(position) = note.position else {
            return Err(EngineError::InvalidInput(format!(
                "note {index} has no computed position to measure against"
            )));
        };

        note.frequency = measured_frequency;
        note.hole_diameter = measured_diameter;
        note.note_name = note_name;
        note.is_measured = true;

        let delta_solve = physics::solve_delta(
            measured_frequency,
            position,
            measured_diameter,
            &self.tube,
            self.temperature_c,
            self.method,
            &self.corrections,
        )?;
        self.delta = delta_solve.delta_mm;
        self.delta_is_measured = true;

        let recalibration = recalibrate_after_measurement(
            index,
            &self.notes,
            self.delta,
            &self.tube,
            self.temperature_c,
            self.method,
            &self.corrections,
            &self.coupling,
        )?;
        self.notes = recalibration.notes;

        Ok(Measurement {
            delta_mm: delta_solve.delta_mm,
            delta_warnings: delta_solve.warnings,
            note_warnings: recalibration.warnings,
        })
    }

    /// Re-solves every unmeasured note against the current delta.
    pub fn refresh(&mut self) -> Result<Vec<NoteWarning>, EngineError> {
        let recalibration = refresh_positions(
            &self.notes,
            self.delta,
            &self.tube,
            self.temperature_c,
            self.method,
            &self.corrections,
            &self.coupling,
        )?;
        self.notes = recalibration.notes;
        Ok(recalibration.warnings)
    }

    pub fn validate(&self) -> bool {
        validate_positions(&self.notes, self.tube.physical_length)
    }

    fn note_mut(&mut self, index: usize) -> Result<&mut TargetNote, EngineError> {
        let count = self.notes.len();
        self.notes.get_mut(index).ok_or_else(|| {
            EngineError::InvalidInput(format!("note index {index} out of range ({count} notes)"))
        })
    }
}

fn check_diameter(diameter: f64) -> Result<(), EngineError> {
    if diameter <= 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "hole diameter must be positive, got {diameter}"
        )));
    }
    Ok(())
}
