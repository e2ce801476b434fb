//! PlantUML text writer
//!
//! Serializes a [`UmlModel`] to PlantUML class-diagram text. The output is a
//! pure function of the model and the configuration; the parser in
//! [`crate::parser`] reads it back.

use crate::config::{DiagramConfig, DiagramView};
use crate::element::{Element, ElementField};
use crate::uml::{Legend, UmlClass, UmlModel};
use std::fmt::Write;

const PREAMBLE: &[&str] = &[
    "hide empty members",
    "skinparam wrapwidth 500",
    "left to right direction",
    "skinparam classStereotypeFontColor black",
];

const DIFFERENTIAL_PREAMBLE: &str = "skinparam classAttributeFontColor #808080";

const LEGEND_PREAMBLE: &[&str] = &[
    "skinparam legendFontSize 10",
    "skinparam legendFontColor #333333",
    "skinparam legendBackgroundColor #F2F2F2",
    "skinparam legendBorderColor #999999",
];

/// Writes class diagrams as PlantUML text
pub struct PlantUmlWriter<'a> {
    config: &'a DiagramConfig,
}

impl<'a> PlantUmlWriter<'a> {
    pub fn new(config: &'a DiagramConfig) -> Self {
        Self { config }
    }

    pub fn write(&self, model: &UmlModel) -> String {
        let mut out = String::new();
        out.push_str("@startuml\n");
        for line in PREAMBLE {
            out.push_str(line);
            out.push('\n');
        }
        if model.view == DiagramView::Differential {
            out.push_str(DIFFERENTIAL_PREAMBLE);
            out.push('\n');
        }
        for line in LEGEND_PREAMBLE {
            out.push_str(line);
            out.push('\n');
        }

        for class in &model.classes {
            if self.is_hidden(class) {
                continue;
            }
            out.push('\n');
            self.write_class(&mut out, model, class);
        }

        let relations: Vec<String> = model
            .relations
            .iter()
            .filter(|relation| {
                !(self.config.hide_removed_objects && relation.cardinality.is_removed())
                    && !self.is_hidden(model.class(relation.from))
                    && !self.is_hidden(model.class(relation.to))
            })
            .map(|relation| {
                // partial bounds are left out, as on attribute lines
                let cardinality = if relation.cardinality.is_complete() {
                    relation.cardinality.to_string()
                } else {
                    String::new()
                };
                format!(
                    "\"{}\" {} \"{}\" \"{}\" : **{}**",
                    model.class(relation.from).title,
                    relation.kind.arrow(),
                    cardinality,
                    model.class(relation.to).title,
                    relation.label
                )
            })
            .collect();
        if !relations.is_empty() {
            out.push('\n');
            for relation in relations {
                out.push_str(&relation);
                out.push('\n');
            }
        }

        if !model.legend.is_empty() {
            out.push('\n');
            write_legend(&mut out, &model.legend);
        }

        out.push_str("@enduml\n");
        out
    }

    fn is_hidden(&self, class: &UmlClass) -> bool {
        self.config.hide_removed_objects && class.derived_from_removed
    }

    fn write_class(&self, out: &mut String, model: &UmlModel, class: &UmlClass) {
        let _ = write!(out, "{} \"{}\"", class.keyword(), class.title);
        if let Some(custom) = class.custom_class_type {
            let _ = write!(out, " {}", custom.stereotype());
        }
        out.push_str(" {\n");

        let mut current_group: Option<&str> = None;
        for element in model.class_elements(class) {
            if self.config.hide_removed_objects
                && element.is_removed()
                && !element.is_choice_of_type_element
            {
                continue;
            }

            let group = element.effective_group();
            if group != current_group {
                let _ = writeln!(out, "\t--{}--", group.unwrap_or(""));
                current_group = group;
            }

            let _ = writeln!(out, "\t{}", self.attribute_line(model.view, element));
            if self.config.show_bindings
                && let Some(binding) = &element.binding
            {
                let _ = writeln!(
                    out,
                    "\t{{field}} <size:10>**Binding**: {} ({})</size>",
                    binding.value_set, binding.strength
                );
            }
        }

        out.push_str("}\n");
    }

    fn attribute_line(&self, view: DiagramView, element: &Element) -> String {
        let emphasize = |text: String, fields: &[ElementField]| {
            let changed = view == DiagramView::Differential
                && fields
                    .iter()
                    .any(|f| element.differential_changed_fields.contains(f));
            if changed { format!("<b>{text}</b>") } else { text }
        };

        let name = if element.is_removed() {
            format!("<s>{}</s>", element.name)
        } else {
            element.name.clone()
        };

        let mut line = format!(
            "{{field}} {} {} : {}",
            element.visibility.symbol(),
            name,
            emphasize(element.display_type().to_string(), &[ElementField::Type])
        );

        if let Some(value) = &element.fixed_value {
            let value = value.replace(['\n', '\r'], " ").replace('*', "\u{2217}");
            let _ = write!(line, " = **{}**", emphasize(value, &[ElementField::FixedValue]));
        }

        if element.cardinality.is_complete() {
            let _ = write!(
                line,
                " [{}]",
                emphasize(
                    element.cardinality.to_string(),
                    &[ElementField::Min, ElementField::Max]
                )
            );
        }

        if self.config.show_constraints && !element.constraints.is_empty() {
            let keys: Vec<&str> = element.constraints.iter().map(|c| c.key.as_str()).collect();
            let _ = write!(
                line,
                " <<{}>>",
                emphasize(keys.join(", "), &[ElementField::Constraints])
            );
        }

        line
    }
}

fn legend_cell(text: &str) -> String {
    text.replace('|', "\u{00a6}").replace(['\n', '\r'], " ")
}

fn write_legend(out: &mut String, legend: &Legend) {
    out.push_str("legend top right\n");
    for group in &legend.groups {
        let _ = writeln!(out, "= {}", group.title);
        if !group.header.is_empty() {
            out.push('|');
            for cell in &group.header {
                let _ = write!(out, "= {} |", legend_cell(cell));
            }
            out.push('\n');
        }
        for row in &group.rows {
            out.push('|');
            for cell in row {
                let _ = write!(out, " {} |", legend_cell(cell));
            }
            out.push('\n');
        }
    }
    out.push_str("end legend\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementArena;
    use crate::models::{BindingStrength, ElementDefinition};
    use crate::table::TableBuilder;
    use crate::test_helpers::TestElementBuilder;
    use crate::uml::synthesize;

    fn render(definitions: &[ElementDefinition], config: &DiagramConfig) -> String {
        let mut arena = ElementArena::new();
        let table = TableBuilder::new(&mut arena).build(definitions);
        let model = synthesize(&table, arena, config);
        PlantUmlWriter::new(config).write(&model)
    }

    fn foo_bar_baz() -> Vec<ElementDefinition> {
        vec![
            TestElementBuilder::new("Foo").with_cardinality(0, "*").build(),
            TestElementBuilder::new("Foo.bar")
                .with_cardinality(0, "1")
                .with_type("Bar")
                .build(),
            TestElementBuilder::new("Foo.bar.baz")
                .with_cardinality(1, "1")
                .with_type("string")
                .build(),
        ]
    }

    #[test]
    fn test_render_classes_and_relations() {
        let output = render(&foo_bar_baz(), &DiagramConfig::default());
        insta::assert_snapshot!(output, @r#"
        @startuml
        hide empty members
        skinparam wrapwidth 500
        left to right direction
        skinparam classStereotypeFontColor black
        skinparam legendFontSize 10
        skinparam legendFontColor #333333
        skinparam legendBackgroundColor #F2F2F2
        skinparam legendBorderColor #999999

        class "Foo (Foo)" {
        	{field} - Foo : Foo [0..*]
        	{field} + bar : Bar [0..1]
        }

        class "Bar (bar)" {
        	{field} + baz : string [1..1]
        }

        "Foo (Foo)" *-- "0..1" "Bar (bar)" : **bar**
        @enduml
        "#);
    }

    #[test]
    fn test_partial_cardinality_is_left_out() {
        let mut definitions = foo_bar_baz();
        definitions[1] = TestElementBuilder::new("Foo.bar").with_type("Bar").build();
        definitions[2].max = None;

        let output = render(&definitions, &DiagramConfig::default());
        assert!(output.contains("\t{field} + bar : Bar\n"));
        assert!(output.contains("\t{field} + baz : string\n"));
        assert!(output.contains("\"Foo (Foo)\" *-- \"\" \"Bar (bar)\" : **bar**"));

        let model = crate::parser::DiagramParser::new().parse(&output).unwrap();
        assert_eq!(model.relations.len(), 1);
        assert!(!model.relations[0].cardinality.is_complete());
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let config = DiagramConfig::default();
        assert_eq!(render(&foo_bar_baz(), &config), render(&foo_bar_baz(), &config));
    }

    #[test]
    fn test_removed_elements_are_filtered_only_when_hiding() {
        let mut definitions = foo_bar_baz();
        definitions.push(
            TestElementBuilder::new("Foo.gone")
                .with_cardinality(0, "0")
                .with_type("string")
                .build(),
        );

        let hidden = render(&definitions, &DiagramConfig::default());
        assert!(!hidden.contains("gone"));

        let config = DiagramConfig {
            hide_removed_objects: false,
            ..Default::default()
        };
        let shown = render(&definitions, &config);
        assert!(shown.contains("{field} + <s>gone</s> : string [0..0]"));
    }

    #[test]
    fn test_fixed_values_bindings_and_constraints() {
        let definitions = vec![
            TestElementBuilder::new("Observation").build(),
            TestElementBuilder::new("Observation.status")
                .with_cardinality(1, "1")
                .with_type("code")
                .with_fixed("code", serde_json::json!("final"))
                .with_binding(
                    "http://hl7.org/fhir/ValueSet/observation-status|4.0.1",
                    BindingStrength::Required,
                )
                .with_constraint("ele-1", "error", "All FHIR elements must have a @value or children")
                .build(),
        ];
        let output = render(&definitions, &DiagramConfig::default());

        assert!(output.contains(
            "\t{field} # status : code = **final** [1..1] <<ele-1>>\n\
             \t{field} <size:10>**Binding**: http://hl7.org/fhir/ValueSet/observation-status|4.0.1 (required)</size>\n"
        ));
        assert!(output.contains(
            "legend top right\n\
             = Constraints\n\
             |= Key |= Severity |= Description |\n\
             | ele-1 | error | All FHIR elements must have a @value or children |\n\
             end legend\n"
        ));

        let config = DiagramConfig {
            show_bindings: false,
            show_constraints: false,
            ..Default::default()
        };
        let quiet = render(&definitions, &config);
        assert!(!quiet.contains("Binding"));
        assert!(!quiet.contains("<<ele-1>>"));
        assert!(!quiet.contains("legend top right"));
    }

    #[test]
    fn test_slice_group_markers() {
        let definitions = vec![
            TestElementBuilder::new("Patient").build(),
            TestElementBuilder::new("Patient.identifier")
                .with_cardinality(0, "*")
                .with_type("Identifier")
                .with_slicing("system")
                .build(),
            TestElementBuilder::new("Patient.identifier.system")
                .with_cardinality(0, "1")
                .with_type("uri")
                .build(),
            TestElementBuilder::new("Patient.identifier:mrn")
                .with_cardinality(0, "1")
                .with_type("Identifier")
                .with_slice_name("mrn")
                .build(),
        ];
        let output = render(&definitions, &DiagramConfig::default());

        assert!(output.contains(
            "class \"Slices for identifier (Patient)\" << (S,#FF7700) Slices >> {\n\
             \t{field} + system : uri [0..1]\n\
             \t--Slices--\n\
             \t{field} + mrn : Identifier [0..1]\n\
             }\n"
        ));
    }
}
