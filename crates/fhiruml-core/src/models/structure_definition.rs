//! StructureDefinition model - the profile a diagram is drawn from

use super::element_definition::{ElementDefinition, ElementList};
use serde::{Deserialize, Serialize};

fn default_resource_type() -> String {
    "StructureDefinition".to_string()
}

/// FHIR StructureDefinition resource
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureDefinition {
    #[serde(default = "default_resource_type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_: Option<bool>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ElementList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub differential: Option<ElementList>,
}

impl StructureDefinition {
    /// Empty definition with only a name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            resource_type: default_resource_type(),
            id: None,
            url: None,
            name: Some(name.into()),
            title: None,
            status: None,
            kind: None,
            abstract_: None,
            type_: None,
            base_definition: None,
            derivation: None,
            snapshot: None,
            differential: None,
        }
    }

    /// Snapshot elements (empty if there is no snapshot)
    pub fn snapshot_elements(&self) -> &[ElementDefinition] {
        self.snapshot
            .as_ref()
            .map(|list| list.element.as_slice())
            .unwrap_or_default()
    }

    /// Differential elements (empty if there is no differential)
    pub fn differential_elements(&self) -> &[ElementDefinition] {
        self.differential
            .as_ref()
            .map(|list| list.element.as_slice())
            .unwrap_or_default()
    }

    /// Display name: `name`, then `id`, then the constrained type
    pub fn display_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .or(self.type_.as_deref())
    }
}
