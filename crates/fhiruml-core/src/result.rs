//! Result type alias for conversion operations

use crate::error::FhirUmlError;

/// Standard Result type for conversion operations
pub type Result<T> = std::result::Result<T, FhirUmlError>;
