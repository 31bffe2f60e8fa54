//! Error types for the analysis engine
//!
//! All failures surface before any partial result is returned; the engine
//! either produces a complete result table or one of these errors.

use std::fmt;

use fieldstat_shared::{FrameError, NumericError};

/// Result type alias for engine operations
pub type AnalysisResult<T> = Result<T, AnovaError>;

/// Error type for the analysis engine
#[derive(Debug, Clone, PartialEq)]
pub enum AnovaError {
    /// Factor arities do not match the pivot dimensions
    InputShape { expected: usize, got: usize },

    /// The design itself is unusable
    Design { reason: String },

    /// A covariance matrix is singular or a statistic is non-finite
    Numeric { context: String },

    /// Unknown data transform name
    Transform { name: String },

    /// The observation table is malformed
    Table { detail: String },
}

impl fmt::Display for AnovaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnovaError::InputShape { expected, got } => {
                write!(
                    f,
                    "Pivot has {} condition columns, factor arities give {}",
                    got, expected
                )
            }
            AnovaError::Design { reason } => write!(f, "Unusable design: {}", reason),
            AnovaError::Numeric { context } => write!(f, "Numeric failure in {}", context),
            AnovaError::Transform { name } => {
                write!(f, "Unknown transform '{}'", name)
            }
            AnovaError::Table { detail } => write!(f, "Bad observation table: {}", detail),
        }
    }
}

impl std::error::Error for AnovaError {}

impl AnovaError {
    /// Create an input shape error
    pub fn input_shape(expected: usize, got: usize) -> Self {
        AnovaError::InputShape { expected, got }
    }

    /// Create a design error
    pub fn design(reason: impl Into<String>) -> Self {
        AnovaError::Design {
            reason: reason.into(),
        }
    }

    /// Create a numeric error
    pub fn numeric(context: impl Into<String>) -> Self {
        AnovaError::Numeric {
            context: context.into(),
        }
    }

    /// Create a transform error
    pub fn transform(name: impl Into<String>) -> Self {
        AnovaError::Transform { name: name.into() }
    }
}

impl From<FrameError> for AnovaError {
    fn from(value: FrameError) -> Self {
        AnovaError::Table {
            detail: value.to_string(),
        }
    }
}

impl From<NumericError> for AnovaError {
    fn from(value: NumericError) -> Self {
        AnovaError::Numeric {
            context: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_shape_display() {
        let err = AnovaError::input_shape(6, 4);
        let msg = err.to_string();
        assert!(msg.contains("6"));
        assert!(msg.contains("4"));
    }

    #[test]
    fn test_transform_display() {
        let err = AnovaError::transform("winsor99");
        assert!(err.to_string().contains("winsor99"));
    }

    #[test]
    fn test_frame_error_converts() {
        let err: AnovaError = FrameError::missing_column("dv").into();
        assert!(matches!(err, AnovaError::Table { .. }));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnovaError>();
    }
}
