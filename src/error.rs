//! Error types for the anofox-anomaly library.

use thiserror::Error;

/// Result type alias for anomaly detection operations.
pub type Result<T> = std::result::Result<T, AnomalyError>;

/// Errors that can occur during decomposition and anomaly detection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnomalyError {
    /// Input data is empty.
    #[error("empty input data")]
    EmptyData,

    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Input has the wrong shape or lacks a required column.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Unrecognised method name or span unit.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Timestamp-related error.
    #[error("timestamp error: {0}")]
    TimestampError(String),

    /// Missing values detected when not allowed.
    #[error("missing values detected in data")]
    MissingValues,

    /// Index out of bounds.
    #[error("index out of bounds: {index} (size: {size})")]
    IndexOutOfBounds { index: usize, size: usize },
}

impl AnomalyError {
    /// Whether the error belongs to the invalid-input family (bad shape,
    /// missing columns, out-of-range parameters).
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            AnomalyError::InvalidInput(_)
                | AnomalyError::InvalidParameter(_)
                | AnomalyError::DimensionMismatch { .. }
                | AnomalyError::TimestampError(_)
                | AnomalyError::MissingValues
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = AnomalyError::EmptyData;
        assert_eq!(err.to_string(), "empty input data");

        let err = AnomalyError::InsufficientData { needed: 14, got: 10 };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 14, got 10"
        );

        let err = AnomalyError::InvalidInput("time_decompose: target column `y` missing".into());
        assert_eq!(
            err.to_string(),
            "invalid input: time_decompose: target column `y` missing"
        );

        let err = AnomalyError::Unsupported("method `mstl`".to_string());
        assert_eq!(err.to_string(), "unsupported: method `mstl`");

        let err = AnomalyError::DimensionMismatch {
            expected: 3,
            got: 2,
        };
        assert_eq!(err.to_string(), "dimension mismatch: expected 3, got 2");
    }

    #[test]
    fn invalid_input_family() {
        assert!(AnomalyError::InvalidInput("x".into()).is_invalid_input());
        assert!(AnomalyError::InvalidParameter("alpha".into()).is_invalid_input());
        assert!(AnomalyError::MissingValues.is_invalid_input());
        assert!(!AnomalyError::Unsupported("x".into()).is_invalid_input());
        assert!(!AnomalyError::InsufficientData { needed: 2, got: 1 }.is_invalid_input());
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = AnomalyError::EmptyData;
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }
}
