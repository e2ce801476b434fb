//! Configuration for diagram conversion
//!
//! Settings are plain values passed into the builder and writer; nothing is
//! read from global state. Files are discovered by walking up from the working
//! directory and may be written in JSON, YAML or TOML.

pub mod diagram_config;
pub mod loader;

pub use diagram_config::{DiagramConfig, DiagramView, FhirUmlConfig, RenderEngineConfig};
pub use loader::{CONFIG_FILE_NAMES, ConfigLoader};
