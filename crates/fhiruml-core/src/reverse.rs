//! Diagram model back to FHIR element definitions
//!
//! The diagram text does not carry element ids, so they are rebuilt from the
//! class structure: the root class owns the profile root, and every relation
//! hands its target class the id of the attribute it stands for. What the
//! forward direction flattens (composite fixed values, choice variants,
//! folded slice headers) is not recovered.

use crate::element::{Element, ElementRef};
use crate::models::{
    Binding, ElementDefinition, ElementList, StructureDefinition, TypeRef,
};
use crate::parser::DiagramParser;
use crate::result::Result;
use crate::uml::UmlModel;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

const CORE_PROFILE_BASE: &str = "http://hl7.org/fhir/StructureDefinition/";

/// Ids for the attributes of `class`, derived from its main element
fn assign_child_ids(model: &mut UmlModel, class: usize) {
    let Some(main) = model.classes[class].main_element else {
        return;
    };
    let parent_id = model.arena[main].id.clone();
    let parent_path = model.arena[main].path.clone();

    let members = model.classes[class].elements.clone();
    for member in members {
        if member == main {
            continue;
        }
        let element = &mut model.arena[member];
        if element.has_slice_name {
            element.id = format!("{parent_id}:{}", element.name);
            element.path = parent_path.clone();
        } else {
            element.id = format!("{parent_id}.{}", element.name);
            element.path = format!("{parent_path}.{}", element.name);
        }
    }
}

/// Rebuild element ids and paths of a parsed model.
///
/// Classes are visited outward from the root class along relations, so a
/// class is only assigned once the attribute it details has its id.
pub fn reconstruct_ids(model: &mut UmlModel) {
    let Some(root) = model.classes.first().and_then(|c| c.main_element) else {
        return;
    };
    let root_element = &mut model.arena[root];
    root_element.id = root_element.name.clone();
    root_element.path = root_element.name.clone();

    let mut assigned = vec![false; model.classes.len()];
    assigned[0] = true;
    assign_child_ids(model, 0);

    let edges: Vec<(usize, usize)> = model
        .relations
        .iter()
        .map(|r| (r.from.0, r.to.0))
        .collect();
    loop {
        let mut progressed = false;
        for &(from, to) in &edges {
            if assigned[from] && !assigned[to] {
                assign_child_ids(model, to);
                assigned[to] = true;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    for (class, done) in model.classes.iter().zip(&assigned) {
        if !done {
            tracing::warn!("Class '{}' is not reachable from the root class", class.title);
        }
    }
}

/// Type references for a display type such as `Reference(Patient|Group), string`
fn type_refs(type_name: &str) -> Vec<TypeRef> {
    type_name
        .split(", ")
        .map(str::trim)
        .filter(|part| !part.is_empty() && *part != "N/A")
        .map(|part| {
            let Some((code, targets)) = part
                .split_once('(')
                .and_then(|(code, rest)| rest.strip_suffix(')').map(|targets| (code, targets)))
            else {
                return TypeRef::code(part);
            };
            let urls: Vec<String> = targets
                .split('|')
                .map(|target| format!("{CORE_PROFILE_BASE}{target}"))
                .collect();
            let mut type_ref = TypeRef::code(code);
            match code {
                "Reference" | "canonical" => type_ref.target_profile = Some(urls),
                "Extension" => type_ref.profile = Some(urls),
                _ => {}
            }
            type_ref
        })
        .collect()
}

/// JSON value of a fixed value printed as text
fn fixed_json(type_code: &str, text: &str) -> Value {
    match type_code {
        "boolean" | "integer" | "integer64" | "decimal" | "unsignedInt" | "positiveInt" => {
            serde_json::from_str::<Value>(text)
                .ok()
                .filter(|value| value.is_boolean() || value.is_number())
                .unwrap_or_else(|| Value::from(text))
        }
        _ => Value::from(text),
    }
}

fn to_definition(element: &Element) -> ElementDefinition {
    let mut definition = ElementDefinition {
        id: element.id.clone(),
        path: element.path.clone(),
        min: element.cardinality.min,
        max: element.cardinality.max_string(),
        ..Default::default()
    };

    if !element.is_main {
        definition.type_ = element
            .type_name
            .as_deref()
            .map(type_refs)
            .filter(|types| !types.is_empty());
    }
    if element.has_slice_name {
        definition.slice_name = Some(element.name.clone());
    }
    if let Some(text) = &element.fixed_value {
        let code = element
            .type_codes
            .first()
            .map(String::as_str)
            .unwrap_or("string");
        definition.set_fixed_value(code, fixed_json(code, text));
    }
    definition.binding = element.binding.as_ref().map(|binding| Binding {
        strength: binding.strength,
        value_set: Some(binding.value_set.clone()),
        description: None,
    });
    if !element.constraints.is_empty() {
        definition.constraint = Some(element.constraints.clone());
    }
    definition
}

fn collect_definitions(
    model: &UmlModel,
    element: ElementRef,
    classes_by_main: &HashMap<ElementRef, usize>,
    visited: &mut HashSet<ElementRef>,
    out: &mut Vec<ElementDefinition>,
) {
    if !visited.insert(element) {
        return;
    }
    // choice variants are regenerated from the header's type list
    if model.arena[element].is_choice_of_type_element {
        return;
    }
    out.push(to_definition(&model.arena[element]));

    if let Some(&class) = classes_by_main.get(&element) {
        for &child in &model.classes[class].elements {
            collect_definitions(model, child, classes_by_main, visited, out);
        }
    }
}

/// Element definitions of a model whose ids were rebuilt, in pre-order
pub fn to_element_definitions(model: &UmlModel) -> Vec<ElementDefinition> {
    let classes_by_main: HashMap<ElementRef, usize> = model
        .classes
        .iter()
        .enumerate()
        .filter_map(|(i, class)| class.main_element.map(|main| (main, i)))
        .collect();

    let mut definitions = Vec::new();
    let mut visited = HashSet::new();
    if let Some(root) = model.classes.first().and_then(|c| c.main_element) {
        collect_definitions(model, root, &classes_by_main, &mut visited, &mut definitions);
    }
    definitions
}

/// Wraps the model's element definitions in a StructureDefinition snapshot.
///
/// Name, URL and base definition come from the `Profile` legend group when
/// present; `name` overrides the name.
pub fn to_structure_definition(model: &UmlModel, name: Option<&str>) -> StructureDefinition {
    let profile = model
        .legend
        .group("Profile")
        .and_then(|group| group.rows.first());
    let cell = |index: usize| {
        profile
            .and_then(|row| row.get(index))
            .filter(|value| !value.is_empty())
            .cloned()
    };

    let root_class = model.main_class();
    let name = name
        .map(str::to_string)
        .or_else(|| cell(0))
        .or_else(|| root_class.map(|c| c.name.clone()))
        .unwrap_or_else(|| "Profile".to_string());

    let mut sd = StructureDefinition::named(name.clone());
    sd.id = Some(name);
    sd.url = cell(1);
    sd.base_definition = cell(2);
    sd.derivation = sd.base_definition.as_ref().map(|_| "constraint".to_string());
    sd.type_ = root_class.map(|c| c.type_name.clone());
    sd.snapshot = Some(ElementList {
        element: to_element_definitions(model),
    });
    sd
}

/// Parse diagram text straight into a StructureDefinition
pub fn diagram_to_structure_definition(text: &str, name: Option<&str>) -> Result<StructureDefinition> {
    let mut model = DiagramParser::new().parse(text)?;
    reconstruct_ids(&mut model);
    Ok(to_structure_definition(&model, name))
}
