//! ElementDefinition model - one path-addressed node of a profile

use super::common::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// List of element definitions
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ElementList {
    #[serde(default)]
    pub element: Vec<ElementDefinition>,
}

/// FHIR ElementDefinition
///
/// Only the properties that shape the diagram are modelled explicitly. Every
/// other property, including the polymorphic `fixed[x]` value, is kept in
/// `extra` in document order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<Vec<TypeRef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slicing: Option<Slicing>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<Binding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<Vec<Constraint>>,

    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ElementDefinition {
    /// Identity used for tables: the id, or the path when no id is present
    pub fn key(&self) -> &str {
        if self.id.is_empty() {
            &self.path
        } else {
            &self.id
        }
    }

    /// Declared type references (empty when untyped)
    pub fn types(&self) -> &[TypeRef] {
        self.type_.as_deref().unwrap_or_default()
    }

    /// Check if this element opens a slice group (non-empty discriminator list)
    pub fn is_slice_header(&self) -> bool {
        self.slicing
            .as_ref()
            .and_then(|s| s.discriminator.as_ref())
            .is_some_and(|d| !d.is_empty())
    }

    /// Check if this is a named slice
    pub fn has_slice_name(&self) -> bool {
        self.slice_name.as_deref().is_some_and(|name| !name.is_empty())
    }

    /// The `fixed[x]` value as `(TypeSuffix, value)`, e.g. `("Uri", "http://...")`
    pub fn fixed_value(&self) -> Option<(&str, &Value)> {
        self.extra.iter().find_map(|(key, value)| {
            key.strip_prefix("fixed")
                .filter(|suffix| suffix.starts_with(|c: char| c.is_ascii_uppercase()))
                .map(|suffix| (suffix, value))
        })
    }

    /// Store a `fixed[x]` value under `fixed<TypeCode>`
    pub fn set_fixed_value(&mut self, type_code: &str, value: Value) {
        self.extra
            .retain(|key, _| !(key.starts_with("fixed") && key.len() > "fixed".len()));
        self.extra
            .insert(format!("fixed{}", capitalize(type_code)), value);
    }
}

/// Upper-cases the first character (`dateTime` -> `DateTime`)
pub fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_element_with_slicing() {
        let json = r#"{
            "id": "Patient.identifier",
            "path": "Patient.identifier",
            "slicing": {
                "discriminator": [{"type": "value", "path": "system"}],
                "rules": "open"
            },
            "min": 1,
            "max": "*"
        }"#;

        let elem: ElementDefinition = serde_json::from_str(json).unwrap();
        assert!(elem.is_slice_header());
        assert!(!elem.has_slice_name());
        assert_eq!(elem.min, Some(1));
        assert_eq!(elem.max.as_deref(), Some("*"));
    }

    #[test]
    fn test_empty_discriminator_is_not_a_slice_header() {
        let json = r#"{
            "id": "Patient.extension",
            "path": "Patient.extension",
            "slicing": {"discriminator": [], "rules": "open"}
        }"#;
        let elem: ElementDefinition = serde_json::from_str(json).unwrap();
        assert!(!elem.is_slice_header());
    }

    #[test]
    fn test_fixed_value_is_captured_from_polymorphic_property() {
        let json = r#"{
            "id": "Patient.identifier:mrn.system",
            "path": "Patient.identifier.system",
            "fixedUri": "http://hospital.example.org/mrn",
            "mustSupport": true
        }"#;

        let elem: ElementDefinition = serde_json::from_str(json).unwrap();
        let (suffix, value) = elem.fixed_value().unwrap();
        assert_eq!(suffix, "Uri");
        assert_eq!(value.as_str(), Some("http://hospital.example.org/mrn"));
        assert_eq!(elem.extra.get("mustSupport"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_set_fixed_value_replaces_existing() {
        let mut elem = ElementDefinition {
            id: "Observation.status".into(),
            path: "Observation.status".into(),
            ..Default::default()
        };
        elem.set_fixed_value("string", Value::from("draft"));
        elem.set_fixed_value("code", Value::from("final"));

        let (suffix, value) = elem.fixed_value().unwrap();
        assert_eq!(suffix, "Code");
        assert_eq!(value, &Value::from("final"));
        assert_eq!(elem.extra.len(), 1);
    }

    #[test]
    fn test_key_falls_back_to_path() {
        let elem: ElementDefinition =
            serde_json::from_str(r#"{"path": "Patient.name"}"#).unwrap();
        assert_eq!(elem.key(), "Patient.name");
    }

    #[test]
    fn test_serialization_skips_unset_fields() {
        let elem = ElementDefinition {
            id: "Patient".into(),
            path: "Patient".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&elem).unwrap();
        assert_eq!(json, r#"{"id":"Patient","path":"Patient"}"#);
    }
}
