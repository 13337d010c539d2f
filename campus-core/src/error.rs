//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, PartialEq)]
pub enum CampusError {
    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),

    /// Invalid or missing configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The exploration decay function id is not in `1..=20`.
    #[error("Invalid decay function number: {0}")]
    InvalidDecayFunction(u32),

    /// Two sequences derived from the same trajectory have different lengths.
    #[error("Length mismatch: {what} has length {actual}, expected {expected}")]
    LengthMismatch {
        /// Name of the offending sequence.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// An action does not belong to the action space of the environment.
    #[error("Invalid action: {0}")]
    InvalidAction(String),
}

impl CampusError {
    /// Returns an error if `actual != expected`.
    pub fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::LengthMismatch {
                what,
                expected,
                actual,
            })
        }
    }
}
