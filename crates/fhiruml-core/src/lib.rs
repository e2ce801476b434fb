//! fhiruml Core
//!
//! Converts FHIR StructureDefinitions into PlantUML class diagrams and reads
//! such diagrams back into element definitions.
//!
//! The forward direction builds element tables from a snapshot or a
//! differential, optionally folds slice-only groups, synthesizes classes and
//! relations and writes PlantUML text. The reverse direction parses that
//! text, rebuilds element ids from the class structure and emits
//! ElementDefinitions.

pub mod config;
pub mod differential;
pub mod element;
pub mod error;
pub mod fixed_value;
pub mod models;
pub mod parser;
pub mod path;
pub mod pipeline;
pub mod render;
pub mod result;
pub mod reverse;
pub mod slice_fold;
pub mod table;
pub mod uml;

#[doc(hidden)]
pub mod test_helpers;

// Re-export commonly used types
pub use config::{
    ConfigLoader, DiagramConfig, DiagramView, FhirUmlConfig, RenderEngineConfig,
};
pub use element::{
    Cardinality, CardinalityMax, Element, ElementArena, ElementField, ElementRef, Visibility,
};
pub use error::{ErrorKind, FhirUmlError};
pub use fixed_value::{FixedValueExpander, FixedValueIndex};
pub use models::{ElementDefinition, StructureDefinition};
pub use parser::DiagramParser;
pub use pipeline::DiagramBuilder;
pub use render::PlantUmlWriter;
pub use result::Result;
pub use reverse::{
    diagram_to_structure_definition, reconstruct_ids, to_element_definitions,
    to_structure_definition,
};
pub use table::{ElementTable, TableBuilder};
pub use uml::{
    ClassRef, CustomClassType, Legend, LegendGroup, Relation, RelationKind, UmlClass, UmlModel,
};

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fhiruml=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
