//! Errors raised at the planner boundary

use thiserror::Error;

/// Input rejected before it reaches the rate math.
#[derive(Debug, Error, PartialEq)]
pub enum PlannerError {
    #[error("rate must be a positive finite number, got {rate}")]
    InvalidRate { rate: f64 },
    #[error("facility speed must be a positive finite number, got {speed}")]
    InvalidSpeed { speed: f64 },
    #[error("facility count must be a non-negative finite number, got {count}")]
    InvalidFacilityCount { count: f64 },
}

pub fn validate_rate(rate: f64) -> Result<f64, PlannerError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(PlannerError::InvalidRate { rate })
    }
}

pub fn validate_speed(speed: f64) -> Result<f64, PlannerError> {
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err(PlannerError::InvalidSpeed { speed })
    }
}

pub fn validate_facility_count(count: f64) -> Result<f64, PlannerError> {
    if count.is_finite() && count >= 0.0 {
        Ok(count)
    } else {
        Err(PlannerError::InvalidFacilityCount { count })
    }
}
