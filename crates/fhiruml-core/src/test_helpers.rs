//! Test data builders for element definitions and profiles

use crate::models::*;
use serde_json::Value;

/// Builder for creating test ElementDefinition instances
pub struct TestElementBuilder {
    element: ElementDefinition,
}

impl TestElementBuilder {
    /// Create a new builder with the given id; the path is the id without slice names
    pub fn new(id: &str) -> Self {
        let path = id
            .split('.')
            .map(|segment| segment.split(':').next().unwrap_or(segment))
            .collect::<Vec<_>>()
            .join(".");
        Self {
            element: ElementDefinition {
                id: id.to_string(),
                path,
                ..Default::default()
            },
        }
    }

    pub fn with_cardinality(mut self, min: u32, max: &str) -> Self {
        self.element.min = Some(min);
        self.element.max = Some(max.to_string());
        self
    }

    pub fn with_type(self, code: &str) -> Self {
        self.with_types(&[code])
    }

    pub fn with_types(mut self, codes: &[&str]) -> Self {
        self.element.type_ = Some(codes.iter().map(|code| TypeRef::code(*code)).collect());
        self
    }

    /// Reference type targeting core resources by name
    pub fn with_reference(mut self, targets: &[&str]) -> Self {
        self.element.type_ = Some(vec![TypeRef {
            code: "Reference".into(),
            target_profile: Some(
                targets
                    .iter()
                    .map(|t| format!("http://hl7.org/fhir/StructureDefinition/{t}"))
                    .collect(),
            ),
            ..Default::default()
        }]);
        self
    }

    pub fn with_slice_name(mut self, name: &str) -> Self {
        self.element.slice_name = Some(name.to_string());
        self
    }

    /// Slicing by value on the given discriminator path
    pub fn with_slicing(mut self, discriminator_path: &str) -> Self {
        self.element.slicing = Some(Slicing {
            discriminator: Some(vec![Discriminator {
                type_: DiscriminatorType::Value,
                path: discriminator_path.to_string(),
            }]),
            rules: Some(SlicingRules::Open),
            ..Default::default()
        });
        self
    }

    pub fn with_fixed(mut self, type_code: &str, value: Value) -> Self {
        self.element.set_fixed_value(type_code, value);
        self
    }

    pub fn with_binding(mut self, value_set: &str, strength: BindingStrength) -> Self {
        self.element.binding = Some(Binding {
            strength,
            value_set: Some(value_set.to_string()),
            description: None,
        });
        self
    }

    pub fn with_constraint(mut self, key: &str, severity: &str, human: &str) -> Self {
        self.element
            .constraint
            .get_or_insert_with(Vec::new)
            .push(Constraint {
                key: key.to_string(),
                severity: Some(severity.to_string()),
                human: human.to_string(),
                expression: None,
            });
        self
    }

    pub fn build(self) -> ElementDefinition {
        self.element
    }
}

/// Profile with the given snapshot and optional differential
pub fn structure_definition(
    name: &str,
    snapshot: Vec<ElementDefinition>,
    differential: Option<Vec<ElementDefinition>>,
) -> StructureDefinition {
    let mut sd = StructureDefinition::named(name);
    sd.url = Some(format!("http://example.org/StructureDefinition/{name}"));
    sd.snapshot = Some(ElementList { element: snapshot });
    sd.differential = differential.map(|element| ElementList { element });
    sd
}

/// Snapshot of a small Patient profile: a sliced identifier, a reference,
/// a choice element and a removed element
pub fn patient_snapshot() -> Vec<ElementDefinition> {
    vec![
        TestElementBuilder::new("Patient")
            .with_cardinality(0, "*")
            .build(),
        TestElementBuilder::new("Patient.identifier")
            .with_cardinality(1, "*")
            .with_type("Identifier")
            .with_slicing("system")
            .build(),
        TestElementBuilder::new("Patient.identifier.system")
            .with_cardinality(0, "1")
            .with_type("uri")
            .build(),
        TestElementBuilder::new("Patient.identifier.value")
            .with_cardinality(0, "1")
            .with_type("string")
            .build(),
        TestElementBuilder::new("Patient.identifier:mrn")
            .with_cardinality(0, "1")
            .with_type("Identifier")
            .with_slice_name("mrn")
            .build(),
        TestElementBuilder::new("Patient.identifier:mrn.system")
            .with_cardinality(1, "1")
            .with_type("uri")
            .with_fixed("uri", Value::from("http://hospital.example.org/mrn"))
            .build(),
        TestElementBuilder::new("Patient.identifier:mrn.value")
            .with_cardinality(0, "1")
            .with_type("string")
            .build(),
        TestElementBuilder::new("Patient.photo")
            .with_cardinality(0, "0")
            .with_type("Attachment")
            .build(),
        TestElementBuilder::new("Patient.generalPractitioner")
            .with_cardinality(0, "*")
            .with_reference(&["Practitioner", "Organization"])
            .build(),
        TestElementBuilder::new("Patient.deceased[x]")
            .with_cardinality(0, "1")
            .with_types(&["boolean", "dateTime"])
            .build(),
    ]
}
