//! Builds [`Element`]s from element definitions

use super::{Cardinality, Element, ElementBinding};
use crate::fixed_value::FixedValueIndex;
use crate::models::{ElementDefinition, TypeRef, capitalize};

/// Last segment of a canonical URL (`.../StructureDefinition/Patient` -> `Patient`)
fn canonical_tail(url: &str) -> &str {
    let url = url.split('|').next().unwrap_or(url);
    url.rsplit('/').next().unwrap_or(url)
}

fn resolve_single(type_ref: &TypeRef) -> String {
    if let Some(url) = type_ref.extension_url_override() {
        return url.to_string();
    }

    let profiles = if type_ref.is_reference() {
        type_ref.target_profile.as_deref()
    } else if type_ref.code == "Extension" {
        type_ref.profile.as_deref()
    } else {
        None
    };

    match profiles {
        Some(profiles) if !profiles.is_empty() => {
            let targets: Vec<&str> = profiles.iter().map(|p| canonical_tail(p)).collect();
            format!("{}({})", type_ref.code, targets.join("|"))
        }
        _ => type_ref.code.clone(),
    }
}

/// Display type for a list of type references.
///
/// `None` when untyped, otherwise each type resolved and joined with `, `.
pub fn resolve_type(types: &[TypeRef]) -> Option<String> {
    if types.is_empty() {
        return None;
    }
    let resolved: Vec<String> = types.iter().map(resolve_single).collect();
    Some(resolved.join(", "))
}

/// Turns element definitions into elements, looking fixed values up by id
pub struct ElementFactory<'a> {
    fixed_values: &'a FixedValueIndex,
}

impl<'a> ElementFactory<'a> {
    pub fn new(fixed_values: &'a FixedValueIndex) -> Self {
        Self { fixed_values }
    }

    pub fn create(&self, definition: &ElementDefinition) -> Element {
        let types = definition.types();
        let mut element = Element::new(definition.key(), definition.path.clone());

        element.type_name = resolve_type(types);
        element.type_codes = types.iter().map(|t| t.code.clone()).collect();
        element.cardinality =
            Cardinality::from_definition(definition.min, definition.max.as_deref());
        element.is_slice_header = definition.is_slice_header();
        element.has_slice_name = definition.has_slice_name();
        element.is_choice_of_type_header =
            types.len() > 1 && !types.iter().any(TypeRef::is_reference);
        element.fixed_value = self.fixed_values.get(definition.key()).map(str::to_string);
        element.binding = definition.binding.as_ref().and_then(|binding| {
            binding
                .value_set
                .as_ref()
                .or(binding.description.as_ref())
                .map(|value_set| ElementBinding {
                    value_set: value_set.clone(),
                    strength: binding.strength,
                })
        });
        element.constraints = definition.constraint.clone().unwrap_or_default();
        element.refresh_visibility();
        element
    }

    /// One element per type code of a choice-of-type header
    pub fn choice_variants(&self, header: &Element) -> Vec<Element> {
        let base_name = header.name.replace("[x]", "");
        header
            .type_codes
            .iter()
            .map(|code| {
                let mut variant = Element::new(
                    format!("{}.{}", header.id, code),
                    format!("{}.{}", header.path, code),
                );
                variant.name = format!("{base_name}{}", capitalize(code));
                variant.type_name = Some(code.clone());
                variant.type_codes = vec![code.clone()];
                variant.is_choice_of_type_element = true;
                variant.refresh_visibility();
                variant
            })
            .collect()
    }
}
