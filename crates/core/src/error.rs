//! Error types for cityq.
//!
//! A single error enum covers configuration, I/O, LLM, both answering
//! backends, routing and prompt failures.

use thiserror::Error;

/// Unified error type for cityq.
///
/// Library functions return `Result<T, AppError>`. Backend failures are
/// turned into typed outcomes by the router rather than surfacing as panics.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors, including missing credentials
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Structured (SQL) backend errors
    #[error("Structured backend error: {0}")]
    Structured(String),

    /// Semantic (retrieval) backend errors
    #[error("Semantic backend error: {0}")]
    Semantic(String),

    /// Routing errors
    #[error("Router error: {0}")]
    Router(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Malformed user input (empty question, unreadable document)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let err = AppError::Semantic("index unreachable".to_string());
        assert_eq!(err.to_string(), "Semantic backend error: index unreachable");

        let err = AppError::InvalidInput("empty question".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty question");
    }

    #[test]
    fn test_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: AppError = parse_err.into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
