use super::bands::BandSchedule;
use super::error::{ModelError, ModelResult};

/// Compound growth factor `(1 + rate)^years`.
pub fn uprate_factor(annual_rate: f64, years_elapsed: u32) -> f64 {
    (1.0 + annual_rate).powi(years_elapsed as i32)
}

/// Schedule in force `years_elapsed` years after `base` when every finite
/// threshold compounds at `annual_rate`. Marginal rates never move.
pub fn uprate(
    base: &BandSchedule,
    annual_rate: f64,
    years_elapsed: u32,
) -> ModelResult<BandSchedule> {
    if !annual_rate.is_finite() || annual_rate <= -1.0 {
        return Err(ModelError::InvalidParameters(format!(
            "uprating rate {annual_rate} must be finite and > -1"
        )));
    }
    if years_elapsed > i32::MAX as u32 {
        return Err(ModelError::InvalidHorizon(format!(
            "{years_elapsed} years is out of range"
        )));
    }
    if annual_rate == 0.0 || years_elapsed == 0 {
        return Ok(base.clone());
    }

    let factor = uprate_factor(annual_rate, years_elapsed);
    if !factor.is_finite() || factor <= 0.0 {
        return Err(ModelError::InvalidHorizon(format!(
            "uprating at {annual_rate} for {years_elapsed} years gives factor {factor}"
        )));
    }
    base.scaled(factor)
}
