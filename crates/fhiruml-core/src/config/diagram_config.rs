//! Configuration sections for diagram building and image rendering
//!
//! ## Example Configuration (fhiruml.yaml)
//!
//! ```yaml
//! diagram:
//!   view: differential
//!   hideRemovedObjects: true
//!   showConstraints: false
//!   showBindings: true
//!   reduceSliceClasses: true
//!
//! render:
//!   command: plantuml
//!   args: ["-pipe"]
//! ```

use crate::error::FhirUmlError;
use crate::result::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Which element list of a profile is drawn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramView {
    #[default]
    Snapshot,
    Differential,
}

impl fmt::Display for DiagramView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagramView::Snapshot => f.write_str("snapshot"),
            DiagramView::Differential => f.write_str("differential"),
        }
    }
}

/// Options that shape the synthesized model and its text rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiagramConfig {
    pub view: DiagramView,
    /// Drop `0..0` elements and everything derived from them
    pub hide_removed_objects: bool,
    /// Constraint keys on attributes and a constraint legend
    pub show_constraints: bool,
    /// Value set binding line under bound attributes
    pub show_bindings: bool,
    /// Fold slice-only groups into their parent class
    pub reduce_slice_classes: bool,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            view: DiagramView::Snapshot,
            hide_removed_objects: true,
            show_constraints: true,
            show_bindings: true,
            reduce_slice_classes: false,
        }
    }
}

/// External command that turns diagram text into an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderEngineConfig {
    pub command: String,
    /// Arguments placed before the output format flag
    pub args: Vec<String>,
}

impl Default for RenderEngineConfig {
    fn default() -> Self {
        Self {
            command: "plantuml".to_string(),
            args: vec!["-pipe".to_string()],
        }
    }
}

/// Root of a configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FhirUmlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram: Option<DiagramConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderEngineConfig>,
}

impl FhirUmlConfig {
    /// Load from a YAML, JSON or TOML file, chosen by extension
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| FhirUmlError::io_error(path, e))?;
        let ext = path.extension().and_then(|e| e.to_str());

        match ext {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| FhirUmlError::config_error(e.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| FhirUmlError::config_error(e.to_string()))
            }
            Some("toml") => {
                toml::from_str(&content).map_err(|e| FhirUmlError::config_error(e.to_string()))
            }
            _ => Err(FhirUmlError::config_error(
                "Unsupported file extension (expected .yaml, .yml, .json, or .toml)",
            )),
        }
    }

    /// Diagram configuration with defaults
    pub fn diagram_config(&self) -> DiagramConfig {
        self.diagram.clone().unwrap_or_default()
    }

    /// Render engine configuration with defaults
    pub fn render_config(&self) -> RenderEngineConfig {
        self.render.clone().unwrap_or_default()
    }
}
