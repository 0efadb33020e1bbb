//! Error types for PRIMs operations.
//!
//! Retrieval failures and reward updates that do nothing are ordinary outcomes,
//! not errors. This hierarchy covers configuration, persistence and lookups by
//! name, where a caller can reasonably recover.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for PRIMs operations.
pub type PrimsResult<T> = Result<T, PrimsError>;

/// Main error type for PRIMs operations.
#[derive(Error, Debug)]
pub enum PrimsError {
    /// Configuration could not be loaded or is out of range.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
    },

    /// A chunk lookup by name failed.
    #[error("Chunk not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        chunk: Option<String>,
    },

    /// A persisted record could not be decoded.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Configuration (CFG_xxx)
    CfgInvalidValue,

    // Validation (VAL_xxx)
    ValInvalidInput,

    // Chunks (CHUNK_xxx)
    ChunkNotFound,
    ChunkNotOperator,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseMissingField,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::CfgInvalidValue => "CFG_001",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ChunkNotFound => "CHUNK_001",
            ErrorCode::ChunkNotOperator => "CHUNK_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseMissingField => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl PrimsError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
        }
    }

    /// Create a not found error.
    pub fn not_found(chunk: impl Into<String>) -> Self {
        let name = chunk.into();
        Self::NotFound {
            message: format!("Chunk '{}' is not in declarative memory", name),
            code: ErrorCode::ChunkNotFound,
            chunk: Some(name),
        }
    }

    /// Create a validation error for a chunk used as an operator that is not one.
    pub fn not_operator(chunk: impl Into<String>) -> Self {
        let chunk = chunk.into();
        let mut details = HashMap::new();
        details.insert("chunk".to_string(), chunk.clone());
        Self::Validation {
            message: format!("Chunk '{}' is not an operator", chunk),
            code: ErrorCode::ChunkNotOperator,
            details,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create a parse error for a field absent from a record.
    pub fn missing_field(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseMissingField,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::CfgInvalidValue,
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            Self::Serialization(_) => ErrorCode::ParseInvalidJson,
            Self::Io(_) => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Configuration(_) => Some("Check the model configuration file and PRIMS_* variables"),
            Self::NotFound { .. } => Some("Add the chunk to declarative memory before referring to it"),
            Self::Parse { .. } => Some("Re-export the memory snapshot; the record is incomplete"),
            _ => None,
        }
    }
}
