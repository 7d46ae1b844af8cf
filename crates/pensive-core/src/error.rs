//! Error types for PensiveDB.

use thiserror::Error;

/// Result type alias using PensiveError.
pub type Result<T> = std::result::Result<T, PensiveError>;

/// Errors that can occur in the pensive system.
#[derive(Error, Debug)]
pub enum PensiveError {
    /// Invalid argument provided.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Database error.
    #[error("Database error: {message}")]
    Database { message: String },

    /// Embedding model error.
    #[error("Embedding error: {message}")]
    Embedding { message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PensiveError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Create an embedding error.
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PensiveError::database("disk full");
        assert!(err.to_string().contains("disk full"));

        let err = PensiveError::config("unknown index mode: hnsw");
        assert!(err.to_string().contains("hnsw"));
    }
}
