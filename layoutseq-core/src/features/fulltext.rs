//! Fulltext stream: one feature vector per sub-token of the body blocks.

use super::record::{FeatureKind, FeatureRecord, FeatureValue};
use super::text::{bucket_f32, capital, digital, flag, prefixes, punct, suffixes, tokenize};
use super::tracker::{AlignmentTracker, FontTracker};
use super::{mark_boundaries, BLOCK_MARKERS, LINE_MARKERS};
use crate::config::FulltextConfig;
use crate::error::{LayoutError, Result};
use crate::types::{BlockRef, LayoutDocument, LayoutToken, Page, TextBlock};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulltextMeta {
    pub line_id: String,
    pub token_id: Option<String>,
    pub block: BlockRef,
    pub page_number: u32,
}

pub type FulltextRecord = FeatureRecord<FulltextMeta>;

pub struct FulltextEncoder<'a> {
    config: &'a FulltextConfig,
}

impl<'a> FulltextEncoder<'a> {
    pub fn new(config: &'a FulltextConfig) -> Self {
        Self { config }
    }

    /// Encode the given blocks in order, each with fresh tracker state.
    pub fn encode(&self, doc: &LayoutDocument, blocks: &[BlockRef]) -> Result<Vec<FulltextRecord>> {
        let mut records = Vec::new();
        for &block_ref in blocks {
            let (page, block) = doc.block(block_ref).ok_or_else(|| {
                LayoutError::malformed(
                    "body blocks",
                    format!(
                        "no block {} on page index {}",
                        block_ref.block_index, block_ref.page_index
                    ),
                )
            })?;
            records.extend(self.encode_block(doc, page, block_ref, block)?);
        }
        Ok(records)
    }

    fn encode_block(
        &self,
        doc: &LayoutDocument,
        page: &Page,
        block_ref: BlockRef,
        block: &TextBlock,
    ) -> Result<Vec<FulltextRecord>> {
        let mut fonts = FontTracker::new();
        let mut alignment = AlignmentTracker::new();
        let mut block_records = Vec::new();

        for line in &block.lines {
            let first = match line.first_token() {
                Some(token) => token,
                None => continue,
            };
            let char_count = first.content.chars().count().max(1);
            let align_status = alignment.observe(line.bbox.x, first.bbox.width / char_count as f32);

            let mut line_records = Vec::new();
            for token in line.tokens() {
                if self.is_forbidden(page, token) {
                    debug!(
                        "Skipping token {:?} inside a forbidden zone on page {}",
                        token.content, page.number
                    );
                    continue;
                }

                let style = doc.style_of(token)?;
                let font = fonts.observe(style);
                let vertical =
                    bucket_f32(token.bbox.y, page.height, self.config.position_buckets);

                for text in tokenize(&token.content) {
                    let values: Vec<FeatureValue> = vec![
                        text.as_str().into(),
                        text.to_lowercase().into(),
                        prefixes(&text, 4).into(),
                        suffixes(&text, 4).into(),
                        BLOCK_MARKERS.start.into(),
                        LINE_MARKERS.start.into(),
                        align_status.into(),
                        font.font_type.into(),
                        font.font_size_type.into(),
                        flag(style.bold).into(),
                        flag(style.italic).into(),
                        capital(&text).into(),
                        digital(&text).into(),
                        flag(text.chars().count() == 1).into(),
                        punct(&text).into(),
                        "0".into(),
                        vertical.into(),
                        "0".into(),
                        "UNKNOWN".into(),
                        "0".into(),
                        flag(style.superscript).into(),
                    ];
                    line_records.push(FeatureRecord::new(
                        FeatureKind::Fulltext,
                        values,
                        FulltextMeta {
                            line_id: line.id.clone(),
                            token_id: token.id.clone(),
                            block: block_ref,
                            page_number: page.number,
                        },
                    ));
                }
            }

            mark_boundaries(&mut line_records, &LINE_MARKERS, 2);
            block_records.extend(line_records);
        }

        mark_boundaries(&mut block_records, &BLOCK_MARKERS, 2);
        Ok(block_records)
    }

    fn is_forbidden(&self, page: &Page, token: &LayoutToken) -> bool {
        self.config
            .forbidden_zones
            .iter()
            .any(|zone| zone.applies_to(page.number) && zone.bbox().intersects(&token.bbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForbiddenZone;
    use crate::features::record::vectorize_all;
    use crate::testing::{block, doc, line_at, page, styles};

    fn body_doc() -> LayoutDocument {
        doc(
            vec![page(
                1,
                vec![
                    block(
                        "b0",
                        (72.0, 60.0, 400.0, 12.0),
                        vec![line_at("h1", 72.0, 60.0, &[("1", "font1"), ("Introduction", "font1")])],
                    ),
                    block(
                        "b1",
                        (72.0, 396.0, 400.0, 40.0),
                        vec![
                            line_at("l1", 72.0, 396.0, &[("Deep", "font0"), ("co-", "font0")]),
                            line_at("l2", 90.0, 410.0, &[("operation", "font0"), ("(see", "font0"), ("[1]).", "font2")]),
                            line_at("l3", 72.0, 424.0, &[("end", "font0")]),
                        ],
                    ),
                ],
            )],
            styles(),
        )
    }

    fn encode(doc: &LayoutDocument, config: &FulltextConfig, blocks: &[BlockRef]) -> Vec<FulltextRecord> {
        FulltextEncoder::new(config).encode(doc, blocks).unwrap()
    }

    fn body() -> Vec<BlockRef> {
        vec![BlockRef {
            page_index: 0,
            block_index: 1,
        }]
    }

    fn column<'a>(records: &'a [FulltextRecord], slot: &str) -> Vec<&'a str> {
        records.iter().map(|r| r.scalar(slot).unwrap()).collect()
    }

    #[test]
    fn test_sub_tokens_keep_punctuation() {
        let records = encode(&body_doc(), &FulltextConfig::default(), &body());
        let tokens = column(&records, "token_text");
        assert_eq!(
            tokens,
            vec!["Deep", "co", "-", "operation", "(", "see", "[1]", ")", ".", "end"]
        );
        assert!(records
            .iter()
            .all(|r| r.vectorize().split(' ').count() == 27));
    }

    #[test]
    fn test_line_and_block_boundaries() {
        let records = encode(&body_doc(), &FulltextConfig::default(), &body());
        assert_eq!(
            column(&records, "line_info"),
            vec![
                "LINESTART", "LINEIN", "LINEEND", "LINESTART", "LINEIN", "LINEIN", "LINEIN",
                "LINEIN", "LINEEND", "LINESTART"
            ]
        );
        let blocks = column(&records, "block_info");
        assert_eq!(blocks[0], "BLOCKSTART");
        assert!(blocks[1..9].iter().all(|b| *b == "BLOCKIN"));
        assert_eq!(blocks[9], "BLOCKEND");
    }

    #[test]
    fn test_hyphen_at_line_end_sits_in_column_eleven() {
        let records = encode(&body_doc(), &FulltextConfig::default(), &body());
        let vectors = vectorize_all(&records);
        let columns: Vec<&str> = vectors[2].split(' ').collect();
        assert_eq!(columns[0], "-");
        assert_eq!(columns[11], "LINEEND");
    }

    #[test]
    fn test_alignment_font_and_position() {
        let records = encode(&body_doc(), &FulltextConfig::default(), &body());
        assert_eq!(records[0].scalar("align_status"), Some("ALIGNEDLEFT"));
        assert_eq!(records[3].scalar("align_status"), Some("LINEINDENT"));
        assert_eq!(records[9].scalar("align_status"), Some("ALIGNEDLEFT"));

        assert_eq!(records[0].scalar("font_type"), Some("NEWFONT"));
        assert_eq!(records[0].scalar("font_size_type"), Some("HIGHERFONT"));
        assert_eq!(records[1].scalar("font_type"), Some("SAMEFONT"));
        // sub-tokens of "[1])." share the superscript style
        for record in &records[6..9] {
            assert_eq!(record.scalar("superscript"), Some("1"));
            assert_eq!(record.scalar("font_size_type"), Some("LOWERFONT"));
        }

        // 396 / 792 of the page height
        assert_eq!(records[0].scalar("relative_page_position_characters"), Some("6"));
        assert_eq!(records[2].scalar("punct_info"), Some("HYPHEN"));
        assert_eq!(records[4].scalar("punct_info"), Some("OPENBRACKET"));
        assert_eq!(records[0].scalar("calloutType"), Some("UNKNOWN"));
    }

    #[test]
    fn test_each_block_starts_with_fresh_trackers() {
        let blocks = vec![
            BlockRef {
                page_index: 0,
                block_index: 0,
            },
            BlockRef {
                page_index: 0,
                block_index: 1,
            },
        ];
        let records = encode(&body_doc(), &FulltextConfig::default(), &blocks);
        // "1", "Introduction" in font1, then the body block restarts from an empty state
        assert_eq!(records[2].scalar("token_text"), Some("Deep"));
        assert_eq!(records[2].scalar("font_type"), Some("NEWFONT"));
        assert_eq!(records[2].scalar("font_size_type"), Some("HIGHERFONT"));
        assert_eq!(records[2].scalar("block_info"), Some("BLOCKSTART"));
        assert_eq!(records[1].scalar("block_info"), Some("BLOCKEND"));
    }

    #[test]
    fn test_forbidden_zone_skips_tokens() {
        let config = FulltextConfig {
            forbidden_zones: vec![ForbiddenZone {
                page: Some(1),
                x: 0.0,
                y: 420.0,
                width: 612.0,
                height: 20.0,
            }],
            ..FulltextConfig::default()
        };
        let records = encode(&body_doc(), &config, &body());
        assert!(records.iter().all(|r| r.meta.line_id != "l3"));
        assert_eq!(records.last().unwrap().scalar("block_info"), Some("BLOCKEND"));
    }

    #[test]
    fn test_unknown_block_reference() {
        let config = FulltextConfig::default();
        let err = FulltextEncoder::new(&config)
            .encode(
                &body_doc(),
                &[BlockRef {
                    page_index: 3,
                    block_index: 0,
                }],
            )
            .unwrap_err();
        assert!(matches!(err, LayoutError::MalformedInput { .. }));
    }
}
