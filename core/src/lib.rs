//! Tone-hole placement engine for end-blown and fipple flutes.
//!
//! The crate is pure computation: target pitches plus tube geometry in,
//! drilling positions out, with an inverse solver that recovers the
//! empirical end correction from a measured hole. It compiles to
//! WebAssembly; the browser UI owns all rendering and calls in here.
//!
//! Every position this crate exposes is a distance from the open/base end
//! of the tube, the end a maker rests a ruler against.

pub mod calibration;
pub mod models;
pub mod physics;
pub mod pitch;

#[cfg(test)]
mod physics_tests;

use calibration::DesignSession;
use physics::{Method, Tube};
use serde::Serialize;
use std::fmt;
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    InvalidInput(String),
    UnknownModel(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::UnknownModel(key) => write!(f, "unknown scale model '{key}'"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<EngineError> for JsValue {
    fn from(err: EngineError) -> JsValue {
        JsValue::from_str(&err.to_string())
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub struct FluteDesigner {
    inner: DesignSession,
}

#[wasm_bindgen]
impl FluteDesigner {
    /// Starts a session for one tube. Lengths in mm; defaults to 20 C and
    /// the half-wave model until `set_environment` says otherwise.
    #[wasm_bindgen(constructor)]
    pub fn new(
        physical_length: f64,
        inner_diameter: f64,
        wall_thickness: f64,
    ) -> Result<FluteDesigner, JsValue> {
        console_error_panic_hook::set_once();
        let tube = Tube::new(physical_length, inner_diameter, wall_thickness)?;
        Ok(FluteDesigner {
            inner: DesignSession::new(tube, 20.0, Method::HalfWave),
        })
    }

    /// Method is "half-wave" or "quarter-wave".
    pub fn set_environment(&mut self, temperature_c: f64, method: &str) -> Result<(), JsValue> {
        let method = Method::parse(method)?;
        self.inner.set_environment(temperature_c, method);
        Ok(())
    }

    /// Builds the chromatic note list off a base frequency and solves every
    /// position. Regenerating keeps measured notes exactly as they are.
    /// Returns the warnings raised while solving.
    pub fn generate_notes(&mut self, base_frequency: f64, count: usize) -> Result<JsValue, JsValue> {
        let warnings = self.inner.generate_notes(base_frequency, count)?;
        to_js(&warnings)
    }

    /// Edits one unmeasured note's target frequency and hole diameter.
    pub fn update_note(
        &mut self,
        index: usize,
        frequency: f64,
        hole_diameter: f64,
    ) -> Result<JsValue, JsValue> {
        let warnings = self.inner.update_note(index, frequency, hole_diameter)?;
        to_js(&warnings)
    }

    /// Records the measured frequency and diameter of a drilled hole. The
    /// note freezes, the delta is re-derived from it, and all downstream
    /// unmeasured notes are recalibrated.
    pub fn measure_note(
        &mut self,
        index: usize,
        measured_frequency: f64,
        measured_diameter: f64,
    ) -> Result<JsValue, JsValue> {
        let measurement = self
            .inner
            .measure_note(index, measured_frequency, measured_diameter)?;
        to_js(&measurement)
    }

    /// The current note list with positions (mm from the open/base end).
    pub fn notes(&self) -> Result<JsValue, JsValue> {
        to_js(&self.inner.notes)
    }

    /// The end correction currently applied, mm.
    pub fn delta(&self) -> f64 {
        self.inner.delta
    }

    /// Whether the delta came from a physical measurement rather than the
    /// a-priori estimate.
    pub fn delta_is_measured(&self) -> bool {
        self.inner.delta_is_measured
    }

    /// Whether the first notes of the list landed inside the tube.
    pub fn validate(&self) -> bool {
        self.inner.validate()
    }
}

/// Nearest pitch class for a frequency.
#[wasm_bindgen]
pub fn closest_note(frequency: f64) -> Result<JsValue, JsValue> {
    to_js(&pitch::closest_note(frequency)?)
}

/// Cents deviation from the chromatic grid.
#[wasm_bindgen]
pub fn frequency_accuracy(frequency: f64, tolerance_cents: f64) -> Result<JsValue, JsValue> {
    to_js(&pitch::frequency_accuracy(frequency, tolerance_cents)?)
}

/// The Sanfen-Sunyi interval table.
#[wasm_bindgen]
pub fn interval_ratios() -> Result<JsValue, JsValue> {
    to_js(&models::INTERVAL_RATIOS)
}

/// Scale models available for a hole count.
#[wasm_bindgen]
pub fn scale_models(hole_count: usize) -> Result<JsValue, JsValue> {
    to_js(&models::models_for_hole_count(hole_count))
}

/// Ratio-method table for a named scale model.
#[wasm_bindgen]
pub fn ratio_positions(
    model_key: &str,
    base_frequency: f64,
    bore_diameter: f64,
    temperature_c: f64,
) -> Result<JsValue, JsValue> {
    let model = models::model_by_key(model_key)
        .ok_or_else(|| EngineError::UnknownModel(model_key.to_string()))?;
    to_js(&models::ratio_positions(
        model,
        base_frequency,
        bore_diameter,
        temperature_c,
    )?)
}

/// Benade-formula table.
#[wasm_bindgen]
pub fn benade_positions(
    length: f64,
    bore_diameter: f64,
    hole_diameter: f64,
    wall_thickness: f64,
    num_holes: usize,
) -> Result<JsValue, JsValue> {
    to_js(&models::benade_positions(
        length,
        bore_diameter,
        hole_diameter,
        wall_thickness,
        num_holes,
    )?)
}
