//! Canvas document assembly and output.
//!
//! The document is a markdown file:
//!
//! ```text
//! # <name>
//!
//! ## Inbound communication
//!
//! <lane diagrams>
//! ```
//!
//! The title is present only when configured; the inbound communication
//! section only when at least one fact was selected.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{default_settings_path, CanvasSettings};
use crate::error::CanvasError;
use crate::facts::{FactStore, JsonFactsFile};
use crate::graph::build_graph;
use crate::render::{default_lane_key, lanes_to_markdown, render};

/// Document written next to the facts file when no output is given.
pub const DEFAULT_OUTPUT_FILE: &str = "bounded_context_canvas.md";

const INBOUND_COMMUNICATION_HEADING: &str = "## Inbound communication";

/// Rendered canvas document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    pub text: String,
    /// Lane names in rendering order; empty when the flowchart was suppressed.
    pub lanes: Vec<String>,
}

/// Build the canvas document for a fact store.
pub fn generate_canvas(
    store: &FactStore,
    settings: &CanvasSettings,
) -> Result<Canvas, CanvasError> {
    let mut sections = Vec::new();
    let mut lanes = Vec::new();

    if let Some(name) = &settings.name {
        sections.push(format!("# {}", name));
    }

    if !settings.graph.is_empty() {
        let graph = build_graph(store, &settings.graph)?;
        if graph.roots().is_empty() {
            info!("no inbound communication to render");
        } else {
            let diagrams = render(&graph, default_lane_key)?;
            lanes = diagrams.iter().map(|d| d.lane.clone()).collect();
            sections.push(format!(
                "{}\n\n{}",
                INBOUND_COMMUNICATION_HEADING,
                lanes_to_markdown(&diagrams)
            ));
        }
    }

    let mut text = sections.join("\n\n");
    if !text.is_empty() {
        text.push('\n');
    }
    Ok(Canvas { text, lanes })
}

/// Write the document, replacing any previous file.
pub fn write_canvas(path: &Path, canvas: &Canvas) -> Result<(), CanvasError> {
    fs::write(path, &canvas.text)
        .map_err(|e| CanvasError::output(path.display().to_string(), e.to_string()))
}

/// Output path used when none is given: next to the facts file.
pub fn default_output_path(facts_path: &Path) -> PathBuf {
    facts_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(DEFAULT_OUTPUT_FILE)
}

/// Paths for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub facts: PathBuf,
    pub settings: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl GenerateRequest {
    pub fn new(facts: impl Into<PathBuf>) -> Self {
        GenerateRequest {
            facts: facts.into(),
            settings: None,
            output: None,
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.settings
            .clone()
            .unwrap_or_else(|| default_settings_path(&self.facts))
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.facts))
    }
}

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub output: PathBuf,
    pub facts: usize,
    pub lanes: Vec<String>,
}

/// Load settings and facts, render, and write the document.
///
/// Settings are compiled before the facts are read, so configuration errors
/// win over input errors.
pub fn generate(request: &GenerateRequest) -> Result<GenerateReport, CanvasError> {
    let settings = CanvasSettings::load(&request.settings_path())?;
    let store = FactStore::load(&JsonFactsFile::new(&request.facts))?;
    info!(facts = store.len(), path = %request.facts.display(), "facts loaded");

    let canvas = generate_canvas(&store, &settings)?;
    let output = request.output_path();
    write_canvas(&output, &canvas)?;
    info!(path = %output.display(), lanes = canvas.lanes.len(), "canvas written");

    Ok(GenerateReport {
        output,
        facts: store.len(),
        lanes: canvas.lanes,
    })
}
