//! Validation helper functions for configuration types.

use crate::core::errors::{GatekeeperError, Result};

/// Validate that a usize value is greater than zero.
pub fn validate_positive_usize(value: usize, field: &str) -> Result<()> {
    if value == 0 {
        return Err(GatekeeperError::config(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

/// Validate that an f64 value is in the unit range [0.0, 1.0].
pub fn validate_unit_range(value: f64, field: &str) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(GatekeeperError::config(format!(
            "{field} must be between 0.0 and 1.0"
        )));
    }
    Ok(())
}

/// Validate that a value lies within the inclusive range `[min, max]`.
pub fn validate_range(value: f64, min: f64, max: f64, field: &str) -> Result<()> {
    if !(min..=max).contains(&value) {
        return Err(GatekeeperError::config(format!(
            "{field} must be between {min} and {max}"
        )));
    }
    Ok(())
}
