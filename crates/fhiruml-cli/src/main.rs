//! fhiruml CLI
//!
//! Command-line interface for converting FHIR profiles to PlantUML class
//! diagrams and back

mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use fhiruml_core::{DiagramConfig, DiagramView, init_tracing};
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "fhiruml")]
#[command(about = "fhiruml: FHIR StructureDefinition to PlantUML class diagram converter")]
#[command(version = fhiruml_core::VERSION)]
#[command(
    long_about = "fhiruml draws FHIR profiles as PlantUML class diagrams and reads such diagrams back into StructureDefinitions.\n\
\n\
Examples:\n  \
fhiruml uml -i profile.json -o profile.puml          # Snapshot diagram\n  \
fhiruml uml -i profile.json --view differential      # Differential diagram to stdout\n  \
fhiruml uml -i profile.json -o p.puml --image p.png  # Also render an image\n  \
fhiruml fhir -i profile.puml -o profile.json         # Diagram back to JSON"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        help = "Path to configuration file (.fhirumlrc.json/.fhirumlrc.toml/fhiruml.yaml)"
    )]
    config: Option<PathBuf>,

    /// Verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a StructureDefinition to a PlantUML class diagram
    Uml {
        /// StructureDefinition JSON file
        #[arg(short, long, help = "StructureDefinition JSON file")]
        input: PathBuf,

        /// Diagram text output file
        #[arg(short, long, help = "Output file for the diagram text (default: stdout)")]
        output: Option<PathBuf>,

        /// Image output file
        #[arg(long, help = "Render the diagram to an image; format from the extension")]
        image: Option<PathBuf>,

        #[command(flatten)]
        diagram: DiagramArgs,
    },

    /// Convert a PlantUML class diagram back to a StructureDefinition
    Fhir {
        /// Diagram text file
        #[arg(short, long, help = "PlantUML diagram file")]
        input: PathBuf,

        /// StructureDefinition output file
        #[arg(short, long, help = "Output file for the StructureDefinition (default: stdout)")]
        output: Option<PathBuf>,

        /// Profile name
        #[arg(long, help = "Name of the generated StructureDefinition")]
        name: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum View {
    /// Every element of the profile
    Snapshot,
    /// Only the elements the profile changes, with their ancestors
    Differential,
}

impl From<View> for DiagramView {
    fn from(view: View) -> Self {
        match view {
            View::Snapshot => DiagramView::Snapshot,
            View::Differential => DiagramView::Differential,
        }
    }
}

/// Diagram options; each overrides the configuration file when given
#[derive(Args, Debug)]
pub struct DiagramArgs {
    /// Element list to draw
    #[arg(long, value_enum, help = "Element list to draw (default: snapshot)")]
    view: Option<View>,

    #[arg(long, value_name = "BOOL", help = "Hide 0..0 elements and classes below them")]
    hide_removed_objects: Option<bool>,

    #[arg(long, value_name = "BOOL", help = "Show constraint keys and the constraint legend")]
    show_constraints: Option<bool>,

    #[arg(long, value_name = "BOOL", help = "Show value set bindings")]
    show_bindings: Option<bool>,

    #[arg(long, help = "Fold slice-only classes into their parent class")]
    reduce_slice_classes: bool,
}

impl DiagramArgs {
    /// Apply command-line overrides on top of `config`
    pub fn apply(&self, mut config: DiagramConfig) -> DiagramConfig {
        if let Some(view) = self.view {
            config.view = view.into();
        }
        if let Some(hide) = self.hide_removed_objects {
            config.hide_removed_objects = hide;
        }
        if let Some(show) = self.show_constraints {
            config.show_constraints = show;
        }
        if let Some(show) = self.show_bindings {
            config.show_bindings = show;
        }
        if self.reduce_slice_classes {
            config.reduce_slice_classes = true;
        }
        config
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => "fhiruml=error", // Only errors by default
        1 => "fhiruml=warn",  // Warnings on first -v
        2 => "fhiruml=info",  // Info on -vv
        3 => "fhiruml=debug", // Debug on -vvv
        _ => "fhiruml=trace", // Trace on -vvvv+
    };
    unsafe {
        std::env::set_var("RUST_LOG", log_level);
    }
    init_tracing();

    if let Err(e) = run_command(cli) {
        error!("fhiruml failed: {:#}", e);
        std::process::exit(1);
    }
}

fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Uml {
            input,
            output,
            image,
            diagram,
        } => commands::uml_command(
            &input,
            output.as_deref(),
            image.as_deref(),
            &diagram,
            cli.config.as_deref(),
        ),
        Commands::Fhir {
            input,
            output,
            name,
        } => commands::fhir_command(&input, output.as_deref(), name.as_deref()),
    }
}
