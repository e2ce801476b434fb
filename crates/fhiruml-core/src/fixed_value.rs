//! Expansion of composite fixed values into synthetic elements
//!
//! A primitive `fixed[x]` value is only recorded in the [`FixedValueIndex`].
//! A composite one (a `CodeableConcept`, an `Identifier`, ...) is walked
//! property by property and every node becomes an element definition of its
//! own, so the value renders as nested attributes. Leaf values are recorded in
//! the index under the synthesized id.

use crate::models::{ElementDefinition, TypeRef};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// Fixed values keyed by element id, built fresh for every table
#[derive(Debug, Clone, Default)]
pub struct FixedValueIndex {
    values: IndexMap<String, String>,
}

impl FixedValueIndex {
    pub fn get(&self, id: &str) -> Option<&str> {
        self.values.get(id).map(String::as_str)
    }

    pub fn insert(&mut self, id: impl Into<String>, value: impl Into<String>) {
        self.values.insert(id.into(), value.into());
    }
}

/// Text shown for a scalar JSON value
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Best-effort type code for a synthesized node
fn json_type_code(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "decimal",
        _ => "Element",
    }
}

/// Walks composite fixed values and appends the synthesized definitions
pub struct FixedValueExpander<'a> {
    definitions: &'a mut Vec<ElementDefinition>,
    index: &'a mut FixedValueIndex,
    synthesized: usize,
}

impl<'a> FixedValueExpander<'a> {
    pub fn new(definitions: &'a mut Vec<ElementDefinition>, index: &'a mut FixedValueIndex) -> Self {
        Self {
            definitions,
            index,
            synthesized: 0,
        }
    }

    /// Expands every fixed value in the list; returns how many definitions were added
    pub fn expand(mut self) -> usize {
        let fixed: Vec<(String, String, Value)> = self
            .definitions
            .iter()
            .filter_map(|definition| {
                definition.fixed_value().map(|(_, value)| {
                    (
                        definition.key().to_string(),
                        definition.path.clone(),
                        value.clone(),
                    )
                })
            })
            .collect();

        for (id, path, value) in fixed {
            match &value {
                Value::Object(properties) => self.walk_properties(&id, &path, properties),
                Value::Array(_) | Value::Null => {
                    tracing::debug!("Ignoring non-scalar fixed value shape on {}", id);
                }
                scalar => self.index.insert(id, scalar_text(scalar)),
            }
        }

        if self.synthesized > 0 {
            tracing::debug!(
                "Synthesized {} elements from composite fixed values",
                self.synthesized
            );
        }
        self.synthesized
    }

    fn walk_properties(&mut self, parent_id: &str, parent_path: &str, properties: &Map<String, Value>) {
        for (name, value) in properties {
            // Primitive extensions (`_value`) carry no structure of their own
            if name.starts_with('_') {
                continue;
            }
            match value {
                Value::Array(items) if items.len() == 1 => {
                    self.visit(parent_id, parent_path, name, name, &items[0]);
                }
                Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        self.visit(parent_id, parent_path, &format!("{name}[{i}]"), name, item);
                    }
                }
                other => self.visit(parent_id, parent_path, name, name, other),
            }
        }
    }

    fn visit(&mut self, parent_id: &str, parent_path: &str, segment: &str, name: &str, value: &Value) {
        let id = format!("{parent_id}.{segment}");
        let path = format!("{parent_path}.{name}");

        if !self.definitions.iter().any(|d| d.key() == id) {
            self.definitions.push(ElementDefinition {
                id: id.clone(),
                path: path.clone(),
                min: Some(1),
                max: Some("1".to_string()),
                type_: Some(vec![TypeRef::code(json_type_code(value))]),
                ..Default::default()
            });
            self.synthesized += 1;
        }

        match value {
            Value::Object(properties) => self.walk_properties(&id, &path, properties),
            Value::Array(_) | Value::Null => {}
            scalar => self.index.insert(id, scalar_text(scalar)),
        }
    }
}
