//! # Error Types
//!
//! Structured error types for slope_core. Validation failures always name the
//! offending field so the host interface can point the operator at the exact
//! entry that needs fixing.
//!
//! ## Example
//!
//! ```rust
//! use slope_core::errors::{SlopeError, SlopeResult};
//!
//! fn validate_height(height_m: f64) -> SlopeResult<()> {
//!     if height_m <= 0.0 {
//!         return Err(SlopeError::invalid_input(
//!             "height",
//!             height_m.to_string(),
//!             "Slope height must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for slope_core operations
pub type SlopeResult<T> = Result<T, SlopeError>;

/// Structured error type for the analysis pipeline.
///
/// Validation and solver failures are terminal for the current run; render
/// and document failures are local to their own output artifact.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum SlopeError {
    /// An input value is invalid (failed to parse, out of range, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// A record index is outside the current store bounds
    #[error("Index {index} out of bounds for store of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The external stability solver raised; message carried verbatim
    #[error("Solver error: {message}")]
    Solver { message: String },

    /// A render-stage failure that could not be degraded away
    #[error("Render error: {reason}")]
    Render { reason: String },

    /// Document composition or encoding failure
    #[error("Document error: {reason}")]
    Document { reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl SlopeError {
    /// Create an InvalidInput error
    pub fn invalid_input(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SlopeError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        SlopeError::MissingField {
            field: field.into(),
        }
    }

    /// Create a Solver error carrying the collaborator's message verbatim
    pub fn solver(message: impl Into<String>) -> Self {
        SlopeError::Solver {
            message: message.into(),
        }
    }

    /// Create a Render error
    pub fn render(reason: impl Into<String>) -> Self {
        SlopeError::Render {
            reason: reason.into(),
        }
    }

    /// Create a Document error
    pub fn document(reason: impl Into<String>) -> Self {
        SlopeError::Document {
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(
        operation: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        SlopeError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True when the error names malformed or missing user input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SlopeError::InvalidInput { .. }
                | SlopeError::MissingField { .. }
                | SlopeError::IndexOutOfBounds { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            SlopeError::InvalidInput { .. } => "INVALID_INPUT",
            SlopeError::MissingField { .. } => "MISSING_FIELD",
            SlopeError::IndexOutOfBounds { .. } => "INDEX_OUT_OF_BOUNDS",
            SlopeError::Solver { .. } => "SOLVER_ERROR",
            SlopeError::Render { .. } => "RENDER_ERROR",
            SlopeError::Document { .. } => "DOCUMENT_ERROR",
            SlopeError::FileError { .. } => "FILE_ERROR",
            SlopeError::SerializationError { .. } => "SERIALIZATION_ERROR",
            SlopeError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = SlopeError::invalid_input("unit_weight", "-5.0", "Unit weight must be positive");
        let json = serde_json::to_string(&error).unwrap();
        let roundtrip: SlopeError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(SlopeError::missing_field("right_limit").error_code(), "MISSING_FIELD");
        assert_eq!(SlopeError::solver("diverged").error_code(), "SOLVER_ERROR");
        assert_eq!(
            SlopeError::IndexOutOfBounds { index: 3, len: 2 }.error_code(),
            "INDEX_OUT_OF_BOUNDS"
        );
    }

    #[test]
    fn test_validation_classification() {
        assert!(SlopeError::missing_field("left_limit").is_validation());
        assert!(!SlopeError::solver("boom").is_validation());
    }
}
