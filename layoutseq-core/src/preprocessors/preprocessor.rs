// Preprocessor abstraction for layout input
//
// This module defines the boundary between layout decoding (ALTO XML, JSON)
// and feature encoding. Everything after this point works with a
// LayoutDocument and is format-agnostic.

use crate::error::Result;
use crate::types::LayoutDocument;
use std::path::Path;

/// Preprocessor trait - converts a serialized layout into a LayoutDocument
///
/// Implementations validate required attributes and the style table while
/// reading, so a returned document always satisfies the layout invariants.
pub trait Preprocessor {
    /// Parse serialized layout text
    fn parse(&self, content: &str) -> Result<LayoutDocument>;

    /// Convenience method: process from file path
    fn process_file(&self, input: &Path) -> Result<LayoutDocument> {
        let content = std::fs::read_to_string(input)?;
        self.parse(&content)
    }

    /// Get preprocessor name for debugging/logging
    fn name(&self) -> &str;

    /// Check if preprocessor supports the given file type
    fn supports_file_type(&self, path: &Path) -> bool;
}

pub(crate) fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}
