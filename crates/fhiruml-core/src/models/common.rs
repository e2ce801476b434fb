//! Common FHIR datatypes carried by element definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type reference in ElementDefinition
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeRef {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_profile: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<Vec<Extension>>,
}

impl TypeRef {
    /// Plain type reference with only a code
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    /// `valueUrl` of the first type-level extension, if any.
    ///
    /// Snapshots use this to override the declared code (for example
    /// primitive `id` elements typed through the fhir-type extension).
    pub fn extension_url_override(&self) -> Option<&str> {
        self.extension
            .as_ref()?
            .iter()
            .find_map(|ext| ext.value_url.as_deref())
    }

    /// Whether this type points at another resource
    pub fn is_reference(&self) -> bool {
        self.code == "Reference" || self.code == "canonical"
    }
}

/// Minimal extension shape: only `valueUrl` carries meaning for type resolution
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extension {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_url: Option<String>,
}

/// Value set binding
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub strength: BindingStrength,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Binding strength enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    Required,
    Extensible,
    Preferred,
    Example,
}

impl BindingStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingStrength::Required => "required",
            BindingStrength::Extensible => "extensible",
            BindingStrength::Preferred => "preferred",
            BindingStrength::Example => "example",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "required" => Some(BindingStrength::Required),
            "extensible" => Some(BindingStrength::Extensible),
            "preferred" => Some(BindingStrength::Preferred),
            "example" => Some(BindingStrength::Example),
            _ => None,
        }
    }
}

impl fmt::Display for BindingStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slicing definition
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Slicing {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Vec<Discriminator>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<SlicingRules>,
}

/// Slicing discriminator
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Discriminator {
    #[serde(rename = "type")]
    pub type_: DiscriminatorType,
    pub path: String,
}

/// Discriminator type enumeration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscriminatorType {
    Value,
    Exists,
    Pattern,
    Type,
    Profile,
    Position,
}

/// Slicing rules enumeration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlicingRules {
    Closed,
    Open,
    #[serde(rename = "openAtEnd")]
    OpenAtEnd,
}

/// Element constraint/invariant
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Constraint {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default)]
    pub human: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}
