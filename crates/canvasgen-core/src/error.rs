//! Error types and error code constants for canvasgen.
//!
//! This module provides a unified error type (`CanvasError`) that bridges
//! domain-specific errors from the different subsystems (selector parsing,
//! settings loading, fact loading, rendering) into a common format suitable
//! for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid configuration (malformed selector, regex, link template or settings)
//! - `3`: Input errors (facts unreadable, empty input where facts were required)
//! - `4`: Output errors (failed to write the canvas document)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! Resolution misses (no handler, no collaborator) are never errors; they
//! only remove an edge from the rendered graph.

use std::fmt;

use thiserror::Error;

use crate::selector::SelectorError;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Malformed settings, selectors, patterns or link templates.
    InvalidConfiguration = 2,
    /// Facts could not be loaded, or a required role set was empty.
    InputError = 3,
    /// The canvas document could not be written.
    OutputError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Stable name used in JSON error envelopes.
    pub fn name(&self) -> &'static str {
        match self {
            OutputErrorCode::InvalidConfiguration => "InvalidConfiguration",
            OutputErrorCode::InputError => "InputError",
            OutputErrorCode::OutputError => "OutputError",
            OutputErrorCode::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for canvas generation.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// A selector, pattern or link template failed to compile.
    #[error(transparent)]
    Selector(#[from] SelectorError),

    /// A diagram was requested from a category with no members.
    #[error("cannot render {category}: no type facts to render")]
    EmptyInput { category: String },

    /// The settings file is missing or malformed.
    #[error("invalid settings '{path}': {message}")]
    Config { path: String, message: String },

    /// The facts input could not be read or decoded.
    #[error("cannot load type facts from '{path}': {message}")]
    FactsLoad { path: String, message: String },

    /// The canvas document could not be written.
    #[error("cannot write canvas to '{path}': {message}")]
    Output { path: String, message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    Internal { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&CanvasError> for OutputErrorCode {
    fn from(err: &CanvasError) -> Self {
        match err {
            CanvasError::Selector(_) => OutputErrorCode::InvalidConfiguration,
            CanvasError::Config { .. } => OutputErrorCode::InvalidConfiguration,
            CanvasError::EmptyInput { .. } => OutputErrorCode::InputError,
            CanvasError::FactsLoad { .. } => OutputErrorCode::InputError,
            CanvasError::Output { .. } => OutputErrorCode::OutputError,
            CanvasError::Internal { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<CanvasError> for OutputErrorCode {
    fn from(err: CanvasError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl CanvasError {
    /// Create an empty input error for the named category.
    pub fn empty_input(category: impl Into<String>) -> Self {
        CanvasError::EmptyInput {
            category: category.into(),
        }
    }

    /// Create a settings error.
    pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        CanvasError::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a facts loading error.
    pub fn facts_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        CanvasError::FactsLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an output error.
    pub fn output(path: impl Into<String>, message: impl Into<String>) -> Self {
        CanvasError::Output {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        CanvasError::Internal {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
