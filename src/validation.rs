//! Parameter validation helpers.
//!
//! Small reusable checks shared by settings validation and command
//! parameter handling. Each returns a static reason string so callers can
//! wrap it in their own typed error with field context.

use std::time::Duration;

/// Validates that an identifier is non-empty and has no surrounding
/// whitespace.
pub fn require_nonempty_id(id: &str) -> Result<(), &'static str> {
    if id.is_empty() {
        return Err("identifier cannot be empty");
    }
    if id.trim() != id {
        return Err("identifier cannot have leading or trailing whitespace");
    }
    Ok(())
}

/// Validates that a value is finite and strictly positive.
pub fn require_positive(value: f64) -> Result<(), &'static str> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err("value must be a positive number")
    }
}

/// Validates that a value is a fraction in (0, 1].
pub fn require_fraction(value: f64) -> Result<(), &'static str> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err("value must be in (0, 1]")
    }
}

/// Validates that a count is non-zero.
pub fn require_nonzero(value: usize) -> Result<(), &'static str> {
    if value > 0 {
        Ok(())
    } else {
        Err("value must be greater than zero")
    }
}

/// Validates that a timeout budget is non-zero.
pub fn require_nonzero_duration(value: Duration) -> Result<(), &'static str> {
    if value.is_zero() {
        Err("duration must be greater than zero")
    } else {
        Ok(())
    }
}
