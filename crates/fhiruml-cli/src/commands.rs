//! CLI command implementations

use crate::DiagramArgs;
use anyhow::{Context, bail};
use fhiruml_core::{
    ConfigLoader, DiagramBuilder, RenderEngineConfig, StructureDefinition,
    diagram_to_structure_definition,
};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

/// Uml command implementation
pub fn uml_command(
    input: &Path,
    output: Option<&Path>,
    image: Option<&Path>,
    diagram: &DiagramArgs,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    let config = ConfigLoader::load(config_path, None)?;
    let diagram_config = diagram.apply(config.diagram_config());
    debug!("Diagram configuration: {:?}", diagram_config);

    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let sd: StructureDefinition = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a StructureDefinition", input.display()))?;

    let text = DiagramBuilder::new(&diagram_config).render(&sd)?;
    write_output(output, &text)?;

    if let Some(image) = image {
        render_image(&text, image, &config.render_config())?;
    }
    Ok(())
}

/// Pipe diagram text through the render engine and store its output
fn render_image(text: &str, image: &Path, engine: &RenderEngineConfig) -> anyhow::Result<()> {
    let format = image
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("png");
    debug!("Rendering {} image with {}", format, engine.command);

    let mut child = Command::new(&engine.command)
        .args(&engine.args)
        .arg(format!("-t{format}"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to start render engine '{}'", engine.command))?;

    let mut stdin = child
        .stdin
        .take()
        .context("Render engine stdin is not available")?;
    let input = text.to_string();
    let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

    let result = child
        .wait_with_output()
        .context("Render engine did not finish")?;
    writer
        .join()
        .map_err(|_| anyhow::anyhow!("Render engine input writer panicked"))?
        .context("Failed to send the diagram to the render engine")?;

    if !result.status.success() {
        bail!(
            "Render engine exited with {}: {}",
            result.status,
            String::from_utf8_lossy(&result.stderr).trim()
        );
    }

    fs::write(image, &result.stdout)
        .with_context(|| format!("Failed to write {}", image.display()))?;
    info!("Wrote {}", image.display());
    Ok(())
}

/// Fhir command implementation
pub fn fhir_command(input: &Path, output: Option<&Path>, name: Option<&str>) -> anyhow::Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let sd = diagram_to_structure_definition(&text, name)
        .with_context(|| format!("Failed to convert {}", input.display()))?;
    debug!("Reconstructed {} element definitions", sd.snapshot_elements().len());

    let mut json = serde_json::to_string_pretty(&sd)?;
    json.push('\n');
    write_output(output, &json)
}
