// Layoutseq Core Library
//
// Encodes page layouts into CRF feature vectors and rebuilds structured
// markup from the labels a sequence labeler assigns to them.

pub mod area;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod grouping;
pub mod preprocessors;
pub mod processor;
pub mod storage;
pub mod structure;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types and functions for easy use
pub use types::*;
pub use area::AreaEstimator;
pub use classifier::{LabeledToken, ReplayLabeler, SequenceLabeler, WapitiLabeler};
pub use config::PipelineConfig;
pub use error::{LayoutError, Result};
pub use features::{FeatureKind, FulltextEncoder, SegmentEncoder};
pub use grouping::{BlockGroups, BlockGrouper};
pub use preprocessors::{preprocessor_for, AltoPreprocessor, JsonPreprocessor, Preprocessor};
pub use processor::{DocumentProcessor, PipelineStages, ProcessOptions, ProcessingOutput};
pub use storage::{FileStorage, LabelStorage, NoOpStorage};
pub use structure::{Reconstruction, StructureReconstructor};
