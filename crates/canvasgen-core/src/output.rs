//! JSON responses for the CLI.
//!
//! Every command prints exactly one JSON object on stdout. Successful runs
//! carry `status: "ok"`, failures `status: "error"` with an [`ErrorInfo`].

use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::CanvasSettings;
use crate::document::GenerateReport;
use crate::error::{CanvasError, OutputErrorCode};

/// Version of the response format.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Responses
// ============================================================================

/// Response for `generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub status: String,
    pub schema_version: String,
    /// Path of the written document.
    pub output: String,
    /// Number of facts loaded.
    pub facts: usize,
    /// Rendered lanes, in document order.
    pub lanes: Vec<String>,
}

impl GenerateResponse {
    pub fn from_report(report: &GenerateReport) -> Self {
        GenerateResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            output: report.output.display().to_string(),
            facts: report.facts,
            lanes: report.lanes.clone(),
        }
    }
}

/// Response for `check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub status: String,
    pub schema_version: String,
    pub settings: String,
    /// Configured roles in chain order.
    pub roles: Vec<String>,
    pub collaborators: usize,
    pub policies: usize,
}

impl CheckResponse {
    pub fn new(path: &Path, settings: &CanvasSettings) -> Self {
        CheckResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            settings: path.display().to_string(),
            roles: settings
                .graph
                .roles
                .iter()
                .map(|r| r.role.as_str().to_string())
                .collect(),
            collaborators: settings.graph.collaborators.len(),
            policies: settings.graph.policies.len(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code, also the process exit code.
    pub code: u8,
    /// Stable error kind name.
    pub kind: String,
    pub message: String,
    /// Offending path, when the error is tied to a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorInfo {
    pub fn from_error(err: &CanvasError) -> Self {
        let code = OutputErrorCode::from(err);
        let path = match err {
            CanvasError::Config { path, .. }
            | CanvasError::FactsLoad { path, .. }
            | CanvasError::Output { path, .. } => Some(path.clone()),
            _ => None,
        };
        ErrorInfo {
            code: code.code(),
            kind: code.name().to_string(),
            message: err.to_string(),
            path,
        }
    }
}

/// Error response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    pub fn new(error: ErrorInfo) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error,
        }
    }

    pub fn from_error(err: &CanvasError) -> Self {
        Self::new(ErrorInfo::from_error(err))
    }
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}
