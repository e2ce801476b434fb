//! End-to-end conversion from a profile to a class diagram

use crate::config::{DiagramConfig, DiagramView};
use crate::differential;
use crate::element::ElementArena;
use crate::error::FhirUmlError;
use crate::models::{ElementDefinition, StructureDefinition};
use crate::render::PlantUmlWriter;
use crate::result::Result;
use crate::slice_fold;
use crate::table::TableBuilder;
use crate::uml::{LegendGroup, UmlModel, synthesize};

/// Builds class diagrams from StructureDefinitions
///
/// Runs table building, differential reconciliation, optional slice folding
/// and class synthesis with one [`DiagramConfig`].
pub struct DiagramBuilder<'a> {
    config: &'a DiagramConfig,
}

impl<'a> DiagramBuilder<'a> {
    pub fn new(config: &'a DiagramConfig) -> Self {
        Self { config }
    }

    /// Build the model for a profile, with a `Profile` legend group
    pub fn build(&self, sd: &StructureDefinition) -> Result<UmlModel> {
        let differential = sd.differential.as_ref().map(|_| sd.differential_elements());
        let mut model = self.build_from_elements(sd.snapshot_elements(), differential)?;

        let mut profile = LegendGroup::new("Profile", &["Name", "URL", "Base"]);
        profile.push_row(vec![
            sd.display_name().unwrap_or_default().to_string(),
            sd.url.clone().unwrap_or_default(),
            sd.base_definition.clone().unwrap_or_default(),
        ]);
        model.legend.groups.insert(0, profile);

        tracing::info!(
            "Built {} view of {} with {} classes",
            self.config.view,
            sd.display_name().unwrap_or("profile"),
            model.classes.len()
        );
        Ok(model)
    }

    /// Build the model from raw element lists
    pub fn build_from_elements(
        &self,
        snapshot: &[ElementDefinition],
        differential: Option<&[ElementDefinition]>,
    ) -> Result<UmlModel> {
        let mut arena = ElementArena::new();

        let table = match self.config.view {
            DiagramView::Snapshot => {
                if snapshot.is_empty() {
                    return Err(FhirUmlError::NoElementDefinitions {
                        view: DiagramView::Snapshot.to_string(),
                    });
                }
                TableBuilder::new(&mut arena).build(snapshot)
            }
            DiagramView::Differential => {
                let differential = differential
                    .filter(|elements| !elements.is_empty())
                    .ok_or_else(|| FhirUmlError::NoElementDefinitions {
                        view: DiagramView::Differential.to_string(),
                    })?;
                let snapshot_table = TableBuilder::new(&mut arena).build(snapshot);
                let mut table = TableBuilder::new(&mut arena).build(differential);
                if snapshot.is_empty() {
                    tracing::warn!("Profile has no snapshot; drawing the differential as is");
                } else {
                    differential::reconcile(&snapshot_table, &mut table, &mut arena);
                }
                table
            }
        };

        let table = if self.config.reduce_slice_classes {
            slice_fold::fold_slices(&table, &mut arena)
        } else {
            table
        };

        Ok(synthesize(&table, arena, self.config))
    }

    /// Build and render a profile as PlantUML text
    pub fn render(&self, sd: &StructureDefinition) -> Result<String> {
        let model = self.build(sd)?;
        Ok(PlantUmlWriter::new(self.config).write(&model))
    }
}
