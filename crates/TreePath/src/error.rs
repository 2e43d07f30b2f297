//! Error types for the path expression engine and its command line front end.
//!
//! Compilation failures and evaluation failures are separate variants so callers
//! can tell a malformed expression from a runtime semantic violation.

use std::fmt;

use treepath_support::EvaluationError;

/// Result type alias for engine operations
pub type PathResult<T> = Result<T, PathError>;

#[derive(Debug)]
pub enum PathError {
    /// The expression text could not be parsed.
    ParseError { expression: String, message: String },

    /// Evaluation hit a hard error.
    EvaluationError {
        expression: String,
        source: EvaluationError,
    },

    /// IO error (file operations, etc.)
    IoError(std::io::Error),

    /// JSON serialization/deserialization error
    JsonError(serde_json::Error),

    /// Invalid input parameters
    InvalidInput(String),
}

impl PathError {
    /// The hard evaluation error, if this is one.
    pub fn evaluation_error(&self) -> Option<&EvaluationError> {
        match self {
            PathError::EvaluationError { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::ParseError {
                expression,
                message,
            } => write!(f, "Parse error in expression '{}': {}", expression, message),
            PathError::EvaluationError { expression, source } => write!(
                f,
                "An error occurred while evaluating expression: {}: {}",
                expression, source
            ),
            PathError::IoError(err) => write!(f, "IO error: {}", err),
            PathError::JsonError(err) => write!(f, "JSON error: {}", err),
            PathError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for PathError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PathError::EvaluationError { source, .. } => Some(source),
            PathError::IoError(err) => Some(err),
            PathError::JsonError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PathError {
    fn from(err: std::io::Error) -> Self {
        PathError::IoError(err)
    }
}

impl From<serde_json::Error> for PathError {
    fn from(err: serde_json::Error) -> Self {
        PathError::JsonError(err)
    }
}

impl From<String> for PathError {
    fn from(err: String) -> Self {
        PathError::InvalidInput(err)
    }
}
