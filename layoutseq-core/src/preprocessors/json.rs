use super::preprocessor::{has_extension, Preprocessor};
use crate::error::Result;
use crate::types::LayoutDocument;
use std::path::Path;

/// Reads a LayoutDocument previously written with `LayoutDocument::to_json`.
#[derive(Debug, Default)]
pub struct JsonPreprocessor;

impl JsonPreprocessor {
    pub fn new() -> Self {
        Self
    }
}

impl Preprocessor for JsonPreprocessor {
    fn parse(&self, content: &str) -> Result<LayoutDocument> {
        LayoutDocument::from_json(content)
    }

    fn name(&self) -> &str {
        "json"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        has_extension(path, &["json"])
    }
}
