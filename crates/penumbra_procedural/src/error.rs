//! # Field Error Types
//!
//! All errors that can occur while synthesizing a density field.

use thiserror::Error;

/// Errors that can occur in field synthesis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// Field edge length is not a power of two inside the supported range.
    #[error("invalid field size {size}: must be a power of two in {min}..={max}")]
    InvalidSize {
        /// The rejected size.
        size: u32,
        /// Smallest accepted size.
        min: u32,
        /// Largest accepted size.
        max: u32,
    },

    /// No octave scales were supplied.
    #[error("at least one octave scale is required")]
    EmptyOctaves,

    /// An octave scale was zero, negative or not finite.
    #[error("invalid octave scale {0}: must be finite and positive")]
    InvalidOctaveScale(f64),

    /// The repeat factor was zero, negative or not finite.
    #[error("invalid repeat factor {0}: must be finite and positive")]
    InvalidRepeatFactor(f64),

    /// Raw texel data does not match the declared size.
    #[error("texel data length mismatch: expected {expected} bytes, got {actual}")]
    DataLength {
        /// Bytes required by the declared size.
        expected: usize,
        /// Bytes supplied.
        actual: usize,
    },
}

/// Result type for field operations.
pub type FieldResult<T> = Result<T, FieldError>;
