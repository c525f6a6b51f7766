use crate::EngineError;
use serde::{Deserialize, Serialize};

// Delta plausibility band, relative to the a-priori estimate.
// A measured delta outside the band is flagged but never rejected.
const DELTA_BAND_LOW: f64 = 0.2;
const DELTA_BAND_HIGH: f64 = 3.0;

/// Resonance model of the bore: open at both ends (half-wave) or
/// stopped at the blowing end (quarter-wave).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    HalfWave,
    QuarterWave,
}

impl Method {
    pub fn parse(s: &str) -> Result<Method, EngineError> {
        match s {
            "half-wave" => Ok(Method::HalfWave),
            "quarter-wave" => Ok(Method::QuarterWave),
            other => Err(EngineError::InvalidInput(format!(
                "unknown calculation method '{other}'"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::HalfWave => "half-wave",
            Method::QuarterWave => "quarter-wave",
        }
    }
}

/// The physical tube. All lengths in mm.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct Tube {
    /// Blowing edge to open base.
    pub physical_length: f64,
    pub inner_diameter: f64,
    pub wall_thickness: f64,
}

impl Tube {
    pub fn new(
        physical_length: f64,
        inner_diameter: f64,
        wall_thickness: f64,
    ) -> Result<Tube, EngineError> {
        if physical_length <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "physical length must be positive, got {physical_length}"
            )));
        }
        if inner_diameter <= 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "inner diameter must be positive, got {inner_diameter}"
            )));
        }
        if wall_thickness < 0.0 {
            return Err(EngineError::InvalidInput(format!(
                "wall thickness must not be negative, got {wall_thickness}"
            )));
        }
        Ok(Tube {
            physical_length,
            inner_diameter,
            wall_thickness,
        })
    }
}

/// Empirical correction coefficients for a tone hole.
///
/// alpha = alpha_base + alpha_slope * (d/D), applied to the hole radius;
/// chimney_factor scales the wall thickness.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct HoleCorrectionModel {
    pub alpha_base: f64,
    pub alpha_slope: f64,
    pub chimney_factor: f64,
}

impl Default for HoleCorrectionModel {
    fn default() -> Self {
        HoleCorrectionModel {
            alpha_base: 0.75,
            alpha_slope: 0.5,
            chimney_factor: 0.75,
        }
    }
}

impl HoleCorrectionModel {
    /// Acoustic length added by an open tone hole.
    /// alpha grows with the hole/bore ratio: small holes ~0.75, large ~1.0.
    pub fn hole_end_correction(&self, hole_diameter: f64, inner_diameter: f64) -> f64 {
        let alpha = self.alpha_base + self.alpha_slope * (hole_diameter / inner_diameter);
        alpha * (hole_diameter / 2.0)
    }

    /// Extra effective length from the wall "chimney" the air traverses.
    pub fn chimney_correction(&self, wall_thickness: f64) -> f64 {
        self.chimney_factor * wall_thickness
    }
}

/// Kinds of recoverable conditions a solve can flag.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A position fell outside the tube (or the acoustic length went
    /// negative) and was clamped.
    OutOfRange,
    /// A measured delta landed outside the plausibility band around the
    /// a-priori estimate. Accepted anyway; measured data wins.
    ImplausibleDelta,
}

/// Result of a forward position solve. `position_mm` is the distance from
/// the open/base end; `clamped` marks values forced back into the tube.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Solve {
    pub position_mm: f64,
    pub clamped: bool,
    pub warnings: Vec<WarningKind>,
}

/// Result of an inverse delta solve.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DeltaSolve {
    pub delta_mm: f64,
    pub warnings: Vec<WarningKind>,
}

// v = (331.3 + 0.606 * T) * 1000  [mm/s]
pub fn speed_of_sound(temperature_c: f64) -> f64 {
    (331.3 + 0.606 * temperature_c) * 1000.0
}

// L_eff = c / (2f) for an open-open bore, c / (4f) for a stopped one.
// Quarter-wave is exactly half the half-wave length at equal frequency.
pub fn effective_length(frequency: f64, temperature_c: f64, method: Method) -> f64 {
    let c = speed_of_sound(temperature_c);
    match method {
        Method::HalfWave => c / (2.0 * frequency),
        Method::QuarterWave => c / (4.0 * frequency),
    }
}

// A-priori open-end correction: 0.6 * bore radius for an open-open tube,
// 1.0 * bore radius for a stopped one (UNSW formula).
pub fn a_priori_delta(method: Method, inner_diameter: f64) -> f64 {
    let radius = inner_diameter / 2.0;
    match method {
        Method::HalfWave => 0.6 * radius,
        Method::QuarterWave => 1.0 * radius,
    }
}

/// Checks a delta against the plausibility band around the a-priori
/// estimate. Outside the band is a warning, never an error.
pub fn delta_plausibility(delta: f64, method: Method, inner_diameter: f64) -> Option<WarningKind> {
    let estimate = a_priori_delta(method, inner_diameter);
    if delta < DELTA_BAND_LOW * estimate || delta > DELTA_BAND_HIGH * estimate {
        Some(WarningKind::ImplausibleDelta)
    } else {
        None
    }
}

/// Forward solve: where to drill for a target frequency.
///
/// distance_from_blowing_end = L_eff - (delta + hole correction + chimney),
/// then converted to the public frame (distance from the open/base end)
/// and clamped into [0, physical_length] with a warning.
pub fn solve_position(
    target_frequency: f64,
    hole_diameter: f64,
    delta: f64,
    tube: &Tube,
    temperature_c: f64,
    method: Method,
    model: &HoleCorrectionModel,
) -> Result<Solve, EngineError> {
    check_positive("target frequency", target_frequency)?;
    check_positive("hole diameter", hole_diameter)?;

    let base_length = effective_length(target_frequency, temperature_c, method);
    let total_correction = delta
        + model.hole_end_correction(hole_diameter, tube.inner_diameter)
        + model.chimney_correction(tube.wall_thickness);

    let mut warnings = Vec::new();
    let mut clamped = false;

    let mut from_blowing_end = base_length - total_correction;
    if from_blowing_end <= 0.0 {
        // Target too high (or geometry implausible) for this tube.
        warnings.push(WarningKind::OutOfRange);
        clamped = true;
        from_blowing_end = 0.0;
    }

    let mut position = tube.physical_length - from_blowing_end;
    if position < 0.0 {
        warnings.push(WarningKind::OutOfRange);
        clamped = true;
        position = 0.0;
    } else if position > tube.physical_length {
        warnings.push(WarningKind::OutOfRange);
        clamped = true;
        position = tube.physical_length;
    }

    Ok(Solve {
        position_mm: position,
        clamped,
        warnings,
    })
}

/// Inverse solve: recover the empirical delta from one drilled hole whose
/// frequency and position (from the open/base end) were physically measured.
///
/// delta = L_eff - distance_from_blowing_end - hole correction - chimney.
/// Exact inverse of `solve_position` whenever the forward solve did not clamp.
pub fn solve_delta(
    measured_frequency: f64,
    measured_position_from_base: f64,
    hole_diameter: f64,
    tube: &Tube,
    temperature_c: f64,
    method: Method,
    model: &HoleCorrectionModel,
) -> Result<DeltaSolve, EngineError> {
    check_positive("measured frequency", measured_frequency)?;
    check_positive("hole diameter", hole_diameter)?;

    let base_length = effective_length(measured_frequency, temperature_c, method);
    let from_blowing_end = tube.physical_length - measured_position_from_base;
    let delta = base_length
        - from_blowing_end
        - model.hole_end_correction(hole_diameter, tube.inner_diameter)
        - model.chimney_correction(tube.wall_thickness);

    let warnings = delta_plausibility(delta, method, tube.inner_diameter)
        .into_iter()
        .collect();

    Ok(DeltaSolve {
        delta_mm: delta,
        warnings,
    })
}

fn check_positive(what: &str, value: f64) -> Result<(), EngineError> {
    if value <= 0.0 {
        return Err(EngineError::InvalidInput(format!(
            "{what} must be positive, got {value}"
        )));
    }
    Ok(())
}
