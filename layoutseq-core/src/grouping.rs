//! Assign whole blocks to segment categories from per-line labels.

use crate::config::GroupingConfig;
use crate::error::{LayoutError, Result};
use crate::features::SegmentRecord;
use crate::types::{BlockRef, LayoutDocument};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A block whose lines did not agree on a single label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisputedBlock {
    pub block: BlockRef,
    pub block_id: String,
    /// Distinct labels seen on the block's lines; empty when no line was labeled
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockGroups {
    pub categories: BTreeMap<String, Vec<BlockRef>>,
    pub disputed: Vec<DisputedBlock>,
}

impl BlockGroups {
    pub fn blocks(&self, category: &str) -> &[BlockRef] {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Remove the span-start prefix from a label.
pub fn strip_span_prefix(label: &str) -> (&str, bool) {
    let label = label.trim();
    match label.strip_prefix("I-") {
        Some(rest) => (rest, true),
        None => (label, false),
    }
}

pub struct BlockGrouper<'a> {
    config: &'a GroupingConfig,
}

impl<'a> BlockGrouper<'a> {
    pub fn new(config: &'a GroupingConfig) -> Self {
        Self { config }
    }

    /// Group blocks by the one label all their segment lines agree on.
    ///
    /// `labels` must hold exactly one label per segment record, in record order.
    pub fn group(
        &self,
        doc: &LayoutDocument,
        records: &[SegmentRecord],
        labels: &[String],
    ) -> Result<BlockGroups> {
        if labels.len() != records.len() {
            return Err(LayoutError::misaligned(
                "segment",
                records.len(),
                labels.len(),
                "one label per segment line is required for grouping",
            ));
        }

        let mut groups = BlockGroups::default();
        let mut cursor = 0;

        for (block_ref, _, block) in doc.blocks() {
            let mut seen = BTreeSet::new();
            while cursor < records.len() && records[cursor].meta.block == block_ref {
                let (label, _) = strip_span_prefix(&labels[cursor]);
                seen.insert(label.to_string());
                cursor += 1;
            }

            if seen.len() == 1 {
                if let Some(label) = seen.into_iter().next() {
                    debug!("Block {} → {}", block.id, label);
                    groups.categories.entry(label).or_default().push(block_ref);
                }
                continue;
            }

            let labels: Vec<String> = seen.into_iter().collect();
            if !labels.is_empty() {
                match &self.config.disputed_label {
                    Some(fallback) => {
                        debug!(
                            "Block {} has labels {:?}, assigning to {}",
                            block.id, labels, fallback
                        );
                        groups
                            .categories
                            .entry(fallback.clone())
                            .or_default()
                            .push(block_ref);
                    }
                    None => warn!(
                        "Block {} has conflicting labels {:?}; leaving it out",
                        block.id, labels
                    ),
                }
            }
            groups.disputed.push(DisputedBlock {
                block: block_ref,
                block_id: block.id.clone(),
                labels,
            });
        }

        if cursor != records.len() {
            return Err(LayoutError::misaligned(
                "segment",
                records.len(),
                cursor,
                "segment records are not in document block order",
            ));
        }

        Ok(groups)
    }

    pub fn body_blocks<'g>(&self, groups: &'g BlockGroups) -> &'g [BlockRef] {
        groups.blocks(&self.config.body_label)
    }
}
