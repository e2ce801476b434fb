//! PlantUML class-diagram reader
//!
//! Reads the text produced by [`crate::render::PlantUmlWriter`] back into a
//! [`UmlModel`]. The grammar is line oriented: class blocks, attribute lines,
//! group markers and binding lines inside a block, relation lines and a
//! legend outside. Relations are resolved after every class is known, so
//! they may appear anywhere in the text.
//!
//! Element ids are not part of the text. Parsed elements carry their name as
//! a provisional id; [`crate::reverse::reconstruct_ids`] rebuilds the real
//! ones from the relation structure.

use crate::config::DiagramView;
use crate::element::{Cardinality, CardinalityMax, Element, ElementBinding, ElementRef, Visibility};
use crate::error::FhirUmlError;
use crate::models::{BindingStrength, Constraint};
use crate::result::Result;
use crate::uml::{CustomClassType, LegendGroup, Relation, RelationKind, UmlClass, UmlModel};
use regex::Regex;
use std::sync::LazyLock;

static EMPHASIS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?(?:b|i|u|s|color(?::[^>]*)?)>").unwrap());

static CLASS_HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(class|struct)\s+"([^"]+)"\s*(<<.*>>)?\s*\{\s*$"#).unwrap()
});

static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\(([^)]+)\)$").unwrap());

static FIELD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*\{([^}]*)\}\s+([+\-~#])\s+([^:\s]+)\s*:\s*([^\[=<]+?)\s*(?:=\s*\*\*(.*?)\*\*)?\s*(?:\[([^\]]*)\])?\s*(?:<<(.+)>>)?\s*$",
    )
    .unwrap()
});

static GROUP_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*--(.*?)--\s*$").unwrap());

static BINDING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\{field\}\s+<size:\d+>\*\*Binding\*\*:\s*(.+?)\s+\(([a-z]+)\)\s*</size>\s*$")
        .unwrap()
});

static RELATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*"([^"]+)"\s+(\S+)\s+"([^"]*)"\s+"([^"]+)"\s*:\s*\*\*(.+?)\*\*\s*$"#).unwrap()
});

static LEGEND_START_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*legend(\s+.*)?$").unwrap());

static LEGEND_END_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*end\s*legend\s*$").unwrap());

/// Marker line the writer emits only for differential diagrams
const DIFFERENTIAL_MARKER: &str = "skinparam classAttributeFontColor";

fn strip_emphasis(text: &str) -> String {
    EMPHASIS_REGEX.replace_all(text, "").into_owned()
}

/// Type codes of a display type (`Reference(A|B), string` -> `[Reference, string]`)
fn type_codes(type_name: &str) -> Vec<String> {
    type_name
        .split(", ")
        .map(|part| part.split('(').next().unwrap_or(part).trim().to_string())
        .filter(|code| !code.is_empty())
        .collect()
}

fn legend_cells(line: &str) -> Option<Vec<String>> {
    let inner = line.trim().strip_prefix('|')?.strip_suffix('|')?;
    Some(
        inner
            .split('|')
            .map(|cell| {
                let cell = cell.trim();
                cell.strip_prefix('=').unwrap_or(cell).trim().replace('\u{00a6}', "|")
            })
            .collect(),
    )
}

/// Relation line waiting for every class to be parsed
struct PendingRelation {
    line: usize,
    from: String,
    arrow: String,
    cardinality: String,
    to: String,
    label: String,
}

enum Block {
    Top,
    Class {
        class: usize,
        opened_at: usize,
        group: Option<String>,
        last_element: Option<ElementRef>,
    },
    Legend {
        group: Option<usize>,
    },
}

/// Parser for PlantUML class diagrams
#[derive(Debug, Default)]
pub struct DiagramParser;

impl DiagramParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse diagram text into a model with provisional element ids
    pub fn parse(&self, text: &str) -> Result<UmlModel> {
        let mut model = UmlModel::default();
        let mut pending = Vec::new();
        let mut block = Block::Top;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = strip_emphasis(raw);

            block = match block {
                Block::Top => self.parse_top_line(&mut model, &mut pending, &line, line_no)?,
                Block::Class {
                    class,
                    opened_at,
                    mut group,
                    mut last_element,
                } => {
                    if line.trim() == "}" {
                        Block::Top
                    } else {
                        self.parse_class_line(
                            &mut model,
                            class,
                            &line,
                            line_no,
                            &mut group,
                            &mut last_element,
                        )?;
                        Block::Class {
                            class,
                            opened_at,
                            group,
                            last_element,
                        }
                    }
                }
                Block::Legend { mut group } => {
                    if LEGEND_END_REGEX.is_match(&line) {
                        Block::Top
                    } else {
                        parse_legend_line(&mut model, &line, &mut group);
                        Block::Legend { group }
                    }
                }
            };
        }

        if let Block::Class {
            class, opened_at, ..
        } = block
        {
            return Err(FhirUmlError::unterminated_class(
                model.classes[class].title.clone(),
                opened_at,
            ));
        }

        ensure_root_main_element(&mut model);
        resolve_relations(&mut model, pending)?;
        mark_choice_variants(&mut model);
        apply_constraint_legend(&mut model);

        tracing::debug!(
            "Parsed {} classes and {} relations",
            model.classes.len(),
            model.relations.len()
        );
        Ok(model)
    }

    fn parse_top_line(
        &self,
        model: &mut UmlModel,
        pending: &mut Vec<PendingRelation>,
        line: &str,
        line_no: usize,
    ) -> Result<Block> {
        if let Some(caps) = CLASS_HEADER_REGEX.captures(line) {
            let title = caps[2].to_string();
            let (type_name, name) = match TITLE_REGEX.captures(&title) {
                Some(parts) => (parts[1].to_string(), parts[2].to_string()),
                None => (title.clone(), title.clone()),
            };
            let custom_class_type = caps
                .get(3)
                .and_then(|s| CustomClassType::from_stereotype(s.as_str()));

            model.classes.push(UmlClass {
                title,
                type_name,
                name,
                is_main_class: model.classes.is_empty(),
                custom_class_type,
                ..Default::default()
            });
            return Ok(Block::Class {
                class: model.classes.len() - 1,
                opened_at: line_no,
                group: None,
                last_element: None,
            });
        }

        if let Some(caps) = RELATION_REGEX.captures(line) {
            pending.push(PendingRelation {
                line: line_no,
                from: caps[1].to_string(),
                arrow: caps[2].to_string(),
                cardinality: caps[3].to_string(),
                to: caps[4].to_string(),
                label: caps[5].trim().to_string(),
            });
            return Ok(Block::Top);
        }

        if LEGEND_START_REGEX.is_match(line) {
            return Ok(Block::Legend { group: None });
        }

        if line.trim_start().starts_with(DIFFERENTIAL_MARKER) {
            model.view = DiagramView::Differential;
        }
        Ok(Block::Top)
    }

    fn parse_class_line(
        &self,
        model: &mut UmlModel,
        class: usize,
        line: &str,
        line_no: usize,
        group: &mut Option<String>,
        last_element: &mut Option<ElementRef>,
    ) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        if let Some(caps) = GROUP_REGEX.captures(line) {
            let label = caps[1].trim();
            *group = (!label.is_empty()).then(|| label.to_string());
            return Ok(());
        }

        if let Some(caps) = BINDING_REGEX.captures(line) {
            let Some(element) = *last_element else {
                return Err(FhirUmlError::parse_error(
                    line_no,
                    "Binding line without a preceding attribute",
                ));
            };
            let strength = BindingStrength::parse(&caps[2]).ok_or_else(|| {
                FhirUmlError::parse_error(line_no, format!("Unknown binding strength '{}'", &caps[2]))
            })?;
            model.arena[element].binding = Some(ElementBinding {
                value_set: caps[1].to_string(),
                strength,
            });
            return Ok(());
        }

        let Some(caps) = FIELD_REGEX.captures(line) else {
            tracing::warn!("Ignoring unrecognized line {} in class body: {}", line_no, line.trim());
            return Ok(());
        };

        let name = caps[3].to_string();
        let mut element = Element::new(name.clone(), name);
        element.visibility = caps[2]
            .chars()
            .next()
            .and_then(Visibility::from_symbol)
            .unwrap_or_default();

        let type_name = caps[4].trim();
        if type_name != "N/A" {
            element.type_name = Some(type_name.to_string());
            element.type_codes = type_codes(type_name);
        }

        element.fixed_value = caps.get(5).map(|v| v.as_str().replace('\u{2217}', "*"));

        if let Some(text) = caps.get(6) {
            element.cardinality = Cardinality::parse(text.as_str())
                .ok_or_else(|| FhirUmlError::invalid_cardinality(text.as_str(), line_no))?;
        }

        if let Some(keys) = caps.get(7) {
            element.constraints = keys
                .as_str()
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(|key| Constraint {
                    key: key.to_string(),
                    severity: None,
                    human: String::new(),
                    expression: None,
                })
                .collect();
        }

        if let Some(label) = group.as_deref() {
            element.has_slice_name = label.starts_with("Slices");
            if label != "Slices" {
                element.group = Some(label.to_string());
            }
        }

        let is_root = class == 0
            && element.visibility == Visibility::Private
            && model.classes[0].main_element.is_none();
        element.is_main = is_root;

        let element_ref = model.arena.alloc(element);
        let uml_class = &mut model.classes[class];
        uml_class.elements.push(element_ref);
        if is_root {
            uml_class.main_element = Some(element_ref);
        }
        *last_element = Some(element_ref);
        Ok(())
    }
}

fn parse_legend_line(model: &mut UmlModel, line: &str, group: &mut Option<usize>) {
    let trimmed = line.trim();
    if let Some(title) = trimmed.strip_prefix('=') {
        model.legend.groups.push(LegendGroup::new(title.trim(), &[]));
        *group = Some(model.legend.groups.len() - 1);
        return;
    }

    let Some(index) = *group else {
        return;
    };
    let Some(cells) = legend_cells(trimmed) else {
        return;
    };
    let legend_group = &mut model.legend.groups[index];
    if trimmed.starts_with("|=") {
        legend_group.header = cells;
    } else {
        legend_group.push_row(cells);
    }
}

/// The first class always owns the profile root; synthesize one when the
/// diagram does not list it
fn ensure_root_main_element(model: &mut UmlModel) {
    let Some(root_class) = model.classes.first() else {
        return;
    };
    if root_class.main_element.is_some() {
        return;
    }

    let mut root = Element::new(root_class.name.clone(), root_class.name.clone());
    root.is_main = true;
    root.type_name = Some(root_class.type_name.clone());
    root.type_codes = vec![root_class.type_name.clone()];
    root.cardinality = Cardinality::new(0, CardinalityMax::Unbounded);
    root.refresh_visibility();
    tracing::debug!("Synthesized root element {}", root.name);

    let root_ref = model.arena.alloc(root);
    let root_class = &mut model.classes[0];
    root_class.elements.insert(0, root_ref);
    root_class.main_element = Some(root_ref);
}

fn resolve_relations(model: &mut UmlModel, pending: Vec<PendingRelation>) -> Result<()> {
    for relation in pending {
        let from = model
            .find_class(&relation.from)
            .ok_or_else(|| FhirUmlError::unresolved_class(&relation.from, relation.line))?;
        let to = model
            .find_class(&relation.to)
            .ok_or_else(|| FhirUmlError::unresolved_class(&relation.to, relation.line))?;
        let kind = RelationKind::from_arrow(&relation.arrow)
            .ok_or_else(|| FhirUmlError::unknown_arrow(&relation.arrow, relation.line))?;
        // an empty cardinality stands for an element that sets neither bound
        let cardinality = if relation.cardinality.trim().is_empty() {
            Cardinality::default()
        } else {
            Cardinality::parse(&relation.cardinality).ok_or_else(|| {
                FhirUmlError::invalid_cardinality(&relation.cardinality, relation.line)
            })?
        };

        let main = model
            .class(from)
            .elements
            .iter()
            .copied()
            .find(|e| model.arena[*e].name == relation.label)
            .ok_or_else(|| {
                FhirUmlError::parse_error(
                    relation.line,
                    format!(
                        "Class '{}' has no attribute '{}'",
                        relation.from, relation.label
                    ),
                )
            })?;

        let parent = model.class(from).main_element;
        let target = &mut model.classes[to.0];
        target.main_element = Some(main);
        target.parent_element = parent;
        match target.custom_class_type {
            Some(CustomClassType::Slices) => model.arena[main].is_slice_header = true,
            Some(CustomClassType::ChoiceOfTypes) => {
                model.arena[main].is_choice_of_type_header = true
            }
            None => {}
        }

        model.relations.push(Relation {
            from,
            to,
            kind,
            label: relation.label,
            cardinality,
        });
    }
    Ok(())
}

/// Bracketless attributes of a `Choice of Types` class are the header's
/// type variants; anywhere else they are plain elements without cardinality
fn mark_choice_variants(model: &mut UmlModel) {
    let variants: Vec<ElementRef> = model
        .classes
        .iter()
        .filter(|class| class.custom_class_type == Some(CustomClassType::ChoiceOfTypes))
        .flat_map(|class| {
            class
                .elements
                .iter()
                .copied()
                .filter(move |e| Some(*e) != class.main_element)
        })
        .filter(|e| !model.arena[*e].cardinality.is_complete())
        .collect();
    for element in variants {
        model.arena[element].is_choice_of_type_element = true;
    }
}

/// Fill constraint severity and text from the `Constraints` legend table
fn apply_constraint_legend(model: &mut UmlModel) {
    let Some(group) = model.legend.group("Constraints") else {
        return;
    };
    let details: Vec<(String, String, String)> = group
        .rows
        .iter()
        .filter(|row| row.len() >= 3)
        .map(|row| (row[0].clone(), row[1].clone(), row[2].clone()))
        .collect();

    let refs: Vec<ElementRef> = model.arena.iter().map(|(r, _)| r).collect();
    for element in refs {
        for constraint in &mut model.arena[element].constraints {
            if let Some((_, severity, human)) = details.iter().find(|(key, _, _)| *key == constraint.key) {
                constraint.severity = (!severity.is_empty()).then(|| severity.clone());
                constraint.human = human.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const FOO_BAR: &str = r#"@startuml
hide empty members

class "Foo (Foo)" {
	{field} - Foo : Foo [0..*]
	{field} + bar : Bar [0..1]
}

class "Bar (bar)" {
	{field} + baz : string [1..1]
}

"Foo (Foo)" *-- "0..1" "Bar (bar)" : **bar**
@enduml
"#;

    fn names(model: &UmlModel, class: usize) -> Vec<&str> {
        model
            .class_elements(&model.classes[class])
            .map(|e| e.name.as_str())
            .collect()
    }

    #[test]
    fn test_parse_classes_and_relation() {
        let model = DiagramParser::new().parse(FOO_BAR).unwrap();

        assert_eq!(model.classes.len(), 2);
        assert_eq!(model.classes[0].type_name, "Foo");
        assert_eq!(model.classes[1].name, "bar");
        assert_eq!(names(&model, 0), vec!["Foo", "bar"]);
        assert_eq!(names(&model, 1), vec!["baz"]);

        assert_eq!(model.relations.len(), 1);
        let relation = &model.relations[0];
        assert_eq!(relation.kind, RelationKind::Composition);
        assert_eq!(relation.label, "bar");
        assert_eq!(relation.cardinality.to_string(), "0..1");

        let bar = model.classes[1].main_element.unwrap();
        assert_eq!(model.arena[bar].name, "bar");
        assert_eq!(model.classes[1].parent_element, model.classes[0].main_element);
        assert!(model.element(model.classes[0].main_element.unwrap()).is_main);
    }

    #[test]
    fn test_attribute_details() {
        let text = r#"class "Observation (Observation)" {
	{field} - Observation : Observation [0..*]
	{field} # status : <b>code</b> = **final** [1..1] <<ele-1, obs-6>>
	{field} <size:10>**Binding**: http://hl7.org/fhir/ValueSet/observation-status|4.0.1 (required)</size>
	{field} ~ subject : Reference(Patient|Group) [0..1]
	{field} + <s>focus</s> : Reference(Resource) [0..0]
	{field} + value[x] : Quantity, string
}
"#;
        let model = DiagramParser::new().parse(text).unwrap();
        let elements: Vec<&Element> = model.class_elements(&model.classes[0]).collect();

        let status = elements[1];
        assert_eq!(status.visibility, Visibility::Protected);
        assert_eq!(status.type_name.as_deref(), Some("code"));
        assert_eq!(status.fixed_value.as_deref(), Some("final"));
        assert_eq!(status.cardinality.to_string(), "1..1");
        let keys: Vec<&str> = status.constraints.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["ele-1", "obs-6"]);
        let binding = status.binding.as_ref().unwrap();
        assert_eq!(
            binding.value_set,
            "http://hl7.org/fhir/ValueSet/observation-status|4.0.1"
        );
        assert_eq!(binding.strength, BindingStrength::Required);

        assert_eq!(elements[2].type_codes, vec!["Reference"]);
        assert_eq!(elements[3].name, "focus");
        assert!(elements[3].is_removed());

        let value = elements[4];
        assert!(!value.is_choice_of_type_element);
        assert_eq!(value.type_codes, vec!["Quantity", "string"]);
        assert!(!value.cardinality.is_complete());
    }

    #[test]
    fn test_bracketless_attributes_are_variants_only_in_choice_classes() {
        let text = r#"class "Foo (Foo)" {
	{field} - Foo : Foo
	{field} + bar : string
	{field} + value[x] : boolean, string [0..1]
}

class "value[x]" << (C,#1892ba) Choice of Types >> {
	{field} + valueBoolean : boolean
	{field} + valueString : string
	{field} + id : string [0..1]
}

"Foo (Foo)" *-- "0..1" "value[x]" : **value[x]**
"#;
        let model = DiagramParser::new().parse(text).unwrap();

        let root: Vec<&Element> = model.class_elements(&model.classes[0]).collect();
        assert!(root[0].is_main);
        assert!(root.iter().all(|e| !e.is_choice_of_type_element));
        assert!(!root[1].cardinality.is_complete());

        let choice: Vec<&Element> = model.class_elements(&model.classes[1]).collect();
        assert!(choice[0].is_choice_of_type_element);
        assert!(choice[1].is_choice_of_type_element);
        assert!(!choice[2].is_choice_of_type_element);
        let header = model.classes[1].main_element.unwrap();
        assert!(model.arena[header].is_choice_of_type_header);
        assert_eq!(model.arena[header].name, "value[x]");
    }

    #[test]
    fn test_empty_relation_cardinality_is_unset() {
        let text = FOO_BAR.replace("\"0..1\" \"Bar (bar)\"", "\"\" \"Bar (bar)\"");
        let model = DiagramParser::new().parse(&text).unwrap();
        assert_eq!(model.relations[0].cardinality, Cardinality::default());
    }

    #[test]
    fn test_slice_groups_and_stereotypes() {
        let text = r#"class "Patient (Patient)" {
	{field} - Patient : Patient [0..*]
	{field} + identifier : Identifier [1..*]
}

class "Slices for identifier (Patient)" << (S,#FF7700) Slices >> {
	{field} + system : uri [0..1]
	--Slices--
	{field} + mrn : Identifier [0..1]
	--Slices for extension--
	{field} + race : Extension [0..1]
	----
	{field} + value : string [0..1]
}

"Patient (Patient)" *-- "1..*" "Slices for identifier (Patient)" : **identifier**
"#;
        let model = DiagramParser::new().parse(text).unwrap();
        let slices = &model.classes[1];
        assert_eq!(slices.custom_class_type, Some(CustomClassType::Slices));
        assert_eq!(slices.type_name, "Slices for identifier");

        let elements: Vec<&Element> = model.class_elements(slices).collect();
        assert!(!elements[0].has_slice_name);
        assert!(elements[1].has_slice_name);
        assert_eq!(elements[1].group, None);
        assert!(elements[2].has_slice_name);
        assert_eq!(elements[2].group.as_deref(), Some("Slices for extension"));
        assert!(!elements[3].has_slice_name);

        let header = slices.main_element.unwrap();
        assert!(model.arena[header].is_slice_header);
    }

    #[test]
    fn test_root_element_is_synthesized_when_missing() {
        let text = "class \"Foo (Foo)\" {\n\t{field} + bar : string [0..1]\n}\n";
        let model = DiagramParser::new().parse(text).unwrap();
        let root = model.element(model.classes[0].main_element.unwrap());
        assert!(root.is_main);
        assert_eq!(root.name, "Foo");
        assert_eq!(root.visibility, Visibility::Private);
        assert_eq!(names(&model, 0), vec!["Foo", "bar"]);
    }

    #[test]
    fn test_constraint_legend_fills_details() {
        let text = r#"class "Foo (Foo)" {
	{field} - Foo : Foo [0..*] <<foo-1>>
}

legend top right
= Constraints
|= Key |= Severity |= Description |
| foo-1 | error | Foo needs a bar ¦ or a baz |
end legend
"#;
        let model = DiagramParser::new().parse(text).unwrap();
        let constraint = &model.element(model.classes[0].main_element.unwrap()).constraints[0];
        assert_eq!(constraint.severity.as_deref(), Some("error"));
        assert_eq!(constraint.human, "Foo needs a bar | or a baz");

        let group = model.legend.group("Constraints").unwrap();
        assert_eq!(group.header, vec!["Key", "Severity", "Description"]);
    }

    #[test]
    fn test_differential_marker_sets_view() {
        let text = "skinparam classAttributeFontColor #808080\nclass \"Foo (Foo)\" {\n}\n";
        let model = DiagramParser::new().parse(text).unwrap();
        assert_eq!(model.view, DiagramView::Differential);
    }

    #[test]
    fn test_invalid_cardinality_is_an_error() {
        let text = "class \"Foo (Foo)\" {\n\t{field} + bar : string [1..x]\n}\n";
        let err = DiagramParser::new().parse(text).unwrap_err();
        assert!(matches!(
            err,
            FhirUmlError::InvalidCardinality { ref value, line: 2 } if value == "1..x"
        ));
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_unknown_relation_endpoint_is_an_error() {
        let text = FOO_BAR.replace("\"0..1\" \"Bar (bar)\"", "\"0..1\" \"Qux (bar)\"");
        let err = DiagramParser::new().parse(&text).unwrap_err();
        assert!(matches!(err, FhirUmlError::UnresolvedClass { ref title, .. } if title == "Qux (bar)"));
    }

    #[test]
    fn test_unknown_arrow_is_an_error() {
        let text = FOO_BAR.replace("*--", "<->");
        let err = DiagramParser::new().parse(&text).unwrap_err();
        assert!(matches!(err, FhirUmlError::UnknownArrow { ref arrow, line: 13 } if arrow == "<->"));
    }

    #[test]
    fn test_unterminated_class_is_an_error() {
        let text = "class \"Foo (Foo)\" {\n\t{field} + bar : string [0..1]\n";
        let err = DiagramParser::new().parse(text).unwrap_err();
        assert!(matches!(err, FhirUmlError::UnterminatedClass { line: 1, .. }));
    }
}
