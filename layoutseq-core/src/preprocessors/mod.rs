//! Layout Preprocessors
//!
//! This module provides the reading layer that turns serialized page layouts
//! into a LayoutDocument, the input of feature encoding.
//!
//! ## Architecture
//!
//! ```text
//! ALTO XML (pdfalto) / JSON
//!     ↓
//! [Format-specific Preprocessor]
//!     ↓
//! LayoutDocument (validated)
//!     ↓
//! [Area estimation + feature encoding]
//! ```

pub mod alto;
pub mod json;
pub mod preprocessor;

pub use alto::AltoPreprocessor;
pub use json::JsonPreprocessor;
pub use preprocessor::Preprocessor;

use std::path::Path;

/// Pick a preprocessor from the file extension.
pub fn preprocessor_for(path: &Path) -> Option<Box<dyn Preprocessor>> {
    let candidates: Vec<Box<dyn Preprocessor>> = vec![
        Box::new(AltoPreprocessor::new()),
        Box::new(JsonPreprocessor::new()),
    ];
    candidates
        .into_iter()
        .find(|preprocessor| preprocessor.supports_file_type(path))
}
