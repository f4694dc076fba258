//! # Error Types
//!
//! This module defines all error types for the sampler.
//!
//! ## Error Types
//! - `InvalidArgument` - Bad tonality, degree, octave, span, time signature or configuration value
//! - `UnsupportedOperation` - Instrument wiring mistakes (double connect, unknown disconnect)
//! - `SchedulingInvariantViolation` - A scheduling pass observed an impossible state
//! - `ConfigError` - A YAML configuration document could not be read
//!
//! ## Usage
//! ```rust
//! use tonal_sampler::{generate, GenerateOptions, SamplerError};
//!
//! match generate(14, &GenerateOptions::default()) {
//!     Ok(sample) => println!("{} notes", sample.len()),
//!     Err(SamplerError::InvalidArgument(message)) => eprintln!("Bad input: {}", message),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SamplerError {
    /// Invalid input to generation or configuration.
    ///
    /// Always recoverable: the caller corrects the value and retries. Never
    /// leaves a scheduler in a partially updated state.
    ///
    /// # Example
    /// ```
    /// # use tonal_sampler::SamplerError;
    /// let err = SamplerError::InvalidArgument("tonic degree 12 is outside 0-11".to_string());
    /// assert_eq!(err.to_string(), "Invalid argument: tonic degree 12 is outside 0-11");
    /// ```
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation that is not allowed in the current wiring.
    ///
    /// # Example
    /// ```
    /// # use tonal_sampler::SamplerError;
    /// let err = SamplerError::UnsupportedOperation("instrument 'lead' is already connected".to_string());
    /// assert_eq!(err.to_string(), "Unsupported operation: instrument 'lead' is already connected");
    /// ```
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Internal scheduling failure. The scheduler that raised it is stopped
    /// and must be restarted with `play()`.
    #[error("Scheduling invariant violated: {0}")]
    SchedulingInvariantViolation(String),

    /// YAML configuration could not be deserialized.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl SamplerError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SamplerError::InvalidArgument(message.into())
    }
}
