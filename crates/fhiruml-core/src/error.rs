//! Error types for profile-to-diagram conversion

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for diagram building and parsing
#[derive(Debug, Error)]
pub enum FhirUmlError {
    /// Diagram text could not be understood
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Cardinality text that is not `<digits>..<digits|*>`
    #[error("Invalid cardinality '{value}' at line {line}")]
    InvalidCardinality { value: String, line: usize },

    /// Relation arrow that does not name a known relation kind
    #[error("Unknown relation arrow '{arrow}' at line {line}")]
    UnknownArrow { arrow: String, line: usize },

    /// Relation endpoint that names no parsed class
    #[error("Relation at line {line} references unknown class '{title}'")]
    UnresolvedClass { title: String, line: usize },

    /// Class block without a closing brace
    #[error("Class '{title}' opened at line {line} is never closed")]
    UnterminatedClass { title: String, line: usize },

    /// The requested element list is missing or empty
    #[error("No element definitions available for the {view} view")]
    NoElementDefinitions { view: String },

    /// Configuration loading or validation errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Model,
    Config,
    Io,
    Serialization,
}

impl FhirUmlError {
    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            FhirUmlError::ParseError { .. } => ErrorKind::Parse,
            FhirUmlError::InvalidCardinality { .. } => ErrorKind::Parse,
            FhirUmlError::UnknownArrow { .. } => ErrorKind::Parse,
            FhirUmlError::UnresolvedClass { .. } => ErrorKind::Parse,
            FhirUmlError::UnterminatedClass { .. } => ErrorKind::Parse,
            FhirUmlError::NoElementDefinitions { .. } => ErrorKind::Model,
            FhirUmlError::ConfigError { .. } => ErrorKind::Config,
            FhirUmlError::IoError { .. } => ErrorKind::Io,
            FhirUmlError::Json(_) => ErrorKind::Serialization,
        }
    }

    /// Check if this error is recoverable (a caller may try another input)
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Parse | ErrorKind::Model)
    }

    /// Create a parse error
    pub fn parse_error(line: usize, message: impl Into<String>) -> Self {
        Self::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Create an invalid cardinality error
    pub fn invalid_cardinality(value: impl Into<String>, line: usize) -> Self {
        Self::InvalidCardinality {
            value: value.into(),
            line,
        }
    }

    /// Create an unknown arrow error
    pub fn unknown_arrow(arrow: impl Into<String>, line: usize) -> Self {
        Self::UnknownArrow {
            arrow: arrow.into(),
            line,
        }
    }

    /// Create an unresolved class error
    pub fn unresolved_class(title: impl Into<String>, line: usize) -> Self {
        Self::UnresolvedClass {
            title: title.into(),
            line,
        }
    }

    /// Create an unterminated class error
    pub fn unterminated_class(title: impl Into<String>, line: usize) -> Self {
        Self::UnterminatedClass {
            title: title.into(),
            line,
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}

/// Convert from std::io::Error
impl From<std::io::Error> for FhirUmlError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            path: PathBuf::new(),
            source: err,
        }
    }
}
