//! FHIR resource models read by the diagram builder

pub mod common;
pub mod element_definition;
pub mod structure_definition;

// Re-exports
pub use common::*;
pub use element_definition::*;
pub use structure_definition::*;
