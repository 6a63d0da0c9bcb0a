//! Error taxonomy for layout encoding and structure reconstruction.

use std::io;
use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, LayoutError>;

/// Errors that abort processing of a whole document.
///
/// Unknown labels and an empty main area are deliberately absent: both
/// degrade gracefully instead of failing.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// A layout node lacks a required attribute (position, content, style reference)
    /// or references a style that does not exist.
    #[error("Malformed layout input in {context}: {detail}")]
    MalformedInput { context: String, detail: String },

    /// Labeler responses do not line up with the submitted feature vectors.
    #[error("Label alignment mismatch in {stage} stage: expected {expected} labels, got {actual} ({detail})")]
    AlignmentMismatch {
        stage: String,
        expected: usize,
        actual: usize,
        detail: String,
    },

    /// The external labeler could not be run or returned garbage.
    #[error("Labeler error: {0}")]
    Labeler(String),

    /// XML syntax error while reading an ALTO file.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// JSON error while reading a serialized layout.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl LayoutError {
    pub fn malformed(context: impl Into<String>, detail: impl Into<String>) -> Self {
        LayoutError::MalformedInput {
            context: context.into(),
            detail: detail.into(),
        }
    }

    pub fn misaligned(
        stage: impl Into<String>,
        expected: usize,
        actual: usize,
        detail: impl Into<String>,
    ) -> Self {
        LayoutError::AlignmentMismatch {
            stage: stage.into(),
            expected,
            actual,
            detail: detail.into(),
        }
    }
}
