//! Error types shared by the surface provider and the mechanics context
//!
//! Numerical degeneracies (zero velocity, zero normal) are never errors;
//! they are masked to zero where they happen. Only malformed formulas and
//! invalid arguments at the API boundary end up here

use thiserror::Error;

/// Failure while turning a text formula into an evaluable surface
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SurfaceError {
    #[error("Parsing failed: {message} (at column {position})")]
    Parse { position: usize, message: String },

    #[error("Parsing failed: unknown function `{name}` (at column {position})")]
    UnknownFunction { name: String, position: usize },

    #[error("Parsing failed: `{name}` takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },

    #[error("Derivation failed: {0}")]
    Derivation(String),
}

/// Invalid input rejected by the mechanics context
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MechanicsError {
    #[error("body mass must be finite and > 0, got {0}")]
    InvalidMass(f64),

    #[error("body position must be finite, got ({0}, {1}, {2})")]
    InvalidPosition(f64, f64, f64),

    #[error("parameter `{name}` must be finite, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}
