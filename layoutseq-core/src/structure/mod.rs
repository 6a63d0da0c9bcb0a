//! Rebuild nested markup from a flat sequence of labeled tokens.

pub mod machine;
pub mod tags;
pub mod tree;

pub use machine::{Action, ReconstructionMachine};
pub use tags::{TagSpec, Vocabulary};
pub use tree::{to_markup, Element, StructureNode, TreeBuilder};

use crate::classifier::LabeledToken;
use crate::config::StructureConfig;
use crate::error::Result;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reconstruction {
    pub tree: Vec<StructureNode>,
    pub markup: String,
}

pub struct StructureReconstructor {
    vocabulary: Vocabulary,
    close_open_tags_at_end: bool,
}

impl StructureReconstructor {
    pub fn new(config: &StructureConfig) -> Result<Self> {
        Ok(Self {
            vocabulary: Vocabulary::from_config(config)?,
            close_open_tags_at_end: config.close_open_tags_at_end,
        })
    }

    pub fn reconstruct(&self, tokens: &[LabeledToken]) -> Reconstruction {
        let mut machine = ReconstructionMachine::new(&self.vocabulary);
        let mut builder = TreeBuilder::new(&self.vocabulary);

        for action in machine.start() {
            builder.apply(action);
        }
        for token in tokens {
            for action in machine.step(token) {
                builder.apply(action);
            }
        }
        if self.close_open_tags_at_end {
            for action in machine.finish() {
                builder.apply(action);
            }
        } else {
            debug!(
                "Leaving {} elements open at end of input",
                machine.open_labels().len()
            );
        }

        let tree = builder.finish();
        let markup = to_markup(&tree);
        Reconstruction { tree, markup }
    }
}
