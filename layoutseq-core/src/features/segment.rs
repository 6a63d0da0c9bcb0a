//! Segment stream: one feature vector per labelable line.

use super::record::{FeatureKind, FeatureRecord, FeatureValue};
use super::text::{
    bucket, capital, digital, flag, is_common_word, is_email, is_http, is_month, is_year,
    normalize_punctuation, prefixes, punct_profile, squash_whitespace,
};
use super::tracker::FontTracker;
use super::{mark_boundaries, BLOCK_MARKERS, PAGE_MARKERS};
use crate::config::SegmentConfig;
use crate::error::{LayoutError, Result};
use crate::types::{BlockRef, LayoutDocument, MainAreas, TextLine};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub line_id: String,
    pub block: BlockRef,
    pub page_number: u32,
    pub full_line: String,
    /// Character count of `full_line` before bucketing
    pub raw_line_len: usize,
}

pub type SegmentRecord = FeatureRecord<SegmentMeta>;

/// Position of the current block within the document and its page, in tokens.
#[derive(Debug, Clone, Copy)]
struct Position {
    doc_pos: usize,
    doc_total: usize,
    page_pos: usize,
    page_total: usize,
}

pub struct SegmentEncoder<'a> {
    config: &'a SegmentConfig,
}

impl<'a> SegmentEncoder<'a> {
    pub fn new(config: &'a SegmentConfig) -> Self {
        Self { config }
    }

    pub fn encode(&self, doc: &LayoutDocument, areas: &MainAreas) -> Result<Vec<SegmentRecord>> {
        let mut records = Vec::new();
        let mut fonts = FontTracker::new();
        let doc_total = doc.token_count();
        let mut doc_pos = 0;

        for (page_index, page) in doc.pages.iter().enumerate() {
            let page_total = page.token_count();
            let mut page_pos = 0;
            let mut page_records = Vec::new();

            for (block_index, block) in page.blocks().enumerate() {
                let in_main_area = areas.contains_block(page, &block.bbox);
                let block_ref = BlockRef {
                    page_index,
                    block_index,
                };
                let position = Position {
                    doc_pos,
                    doc_total,
                    page_pos,
                    page_total,
                };

                let mut block_records = Vec::new();
                for line in block.lines.iter().filter(|line| line.is_labelable()) {
                    block_records.push(self.encode_line(
                        doc,
                        line,
                        block_ref,
                        page.number,
                        position,
                        in_main_area,
                        &mut fonts,
                    )?);
                }

                rebucket_line_lengths(&mut block_records, self.config.line_length_buckets);
                mark_boundaries(&mut block_records, &BLOCK_MARKERS, 2);
                page_records.extend(block_records);

                let block_tokens = block.token_count();
                doc_pos += block_tokens;
                page_pos += block_tokens;
            }

            mark_boundaries(&mut page_records, &PAGE_MARKERS, 1);
            debug!(
                "Page {}: {} segment records",
                page.number,
                page_records.len()
            );
            records.extend(page_records);
        }

        Ok(records)
    }

    #[allow(clippy::too_many_arguments)]
    fn encode_line(
        &self,
        doc: &LayoutDocument,
        line: &TextLine,
        block: BlockRef,
        page_number: u32,
        position: Position,
        in_main_area: bool,
        fonts: &mut FontTracker,
    ) -> Result<SegmentRecord> {
        let first = line
            .first_token()
            .ok_or_else(|| LayoutError::malformed(format!("TextLine {}", line.id), "no token"))?;
        let style = doc.style_of(first)?;

        let raw_first = squash_whitespace(first.content.trim());
        let token_text = normalize_punctuation(&raw_first);
        let second_text = line
            .second_token_text()
            .map(|text| squash_whitespace(text.trim()))
            .filter(|text| !text.is_empty())
            .unwrap_or(raw_first);

        let font = fonts.observe(style);
        let full_line = line.full_text();
        let raw_line_len = full_line.chars().count();
        let profile = punct_profile(&full_line);
        let (profile, profile_len) = if profile.is_empty() {
            ("no".to_string(), "0".to_string())
        } else {
            let len = profile.chars().count().to_string();
            (profile, len)
        };
        let buckets = self.config.position_buckets;

        let values: Vec<FeatureValue> = vec![
            token_text.as_str().into(),
            second_text.into(),
            token_text.to_lowercase().into(),
            prefixes(&token_text, 4).into(),
            BLOCK_MARKERS.start.into(),
            PAGE_MARKERS.start.into(),
            font.font_type.into(),
            font.font_size_type.into(),
            flag(style.bold).into(),
            flag(style.italic).into(),
            capital(&token_text).into(),
            digital(&token_text).into(),
            flag(token_text.chars().count() == 1).into(),
            "0".into(),
            flag(is_common_word(&token_text)).into(),
            "0".into(),
            flag(is_year(&token_text)).into(),
            flag(is_month(&token_text)).into(),
            flag(is_email(&token_text)).into(),
            flag(is_http(&token_text)).into(),
            bucket(position.doc_pos, position.doc_total, buckets).into(),
            bucket(position.page_pos, position.page_total, buckets).into(),
            profile.into(),
            profile_len.into(),
            raw_line_len.into(),
            "0".into(),
            "0".into(),
            "0".into(),
            "0".into(),
            flag(in_main_area).into(),
        ];

        Ok(FeatureRecord::new(
            FeatureKind::Segment,
            values,
            SegmentMeta {
                line_id: line.id.clone(),
                block,
                page_number,
                full_line,
                raw_line_len,
            },
        ))
    }
}

/// Replace each record's line length with `floor(len * buckets / max_len)` over its block.
///
/// Works from the raw length kept in the metadata, so applying it twice changes nothing.
pub fn rebucket_line_lengths(records: &mut [SegmentRecord], buckets: usize) {
    let max_len = records
        .iter()
        .map(|record| record.meta.raw_line_len)
        .max()
        .unwrap_or(0)
        .max(1);
    for record in records.iter_mut() {
        let value = bucket(record.meta.raw_line_len, max_len, buckets);
        record.set("line_len", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{block, doc, line, page, styles};
    use crate::types::AreaRect;

    fn encode(doc: &LayoutDocument, areas: &MainAreas) -> Vec<SegmentRecord> {
        let config = SegmentConfig::default();
        SegmentEncoder::new(&config).encode(doc, areas).unwrap()
    }

    fn column<'a>(records: &'a [SegmentRecord], slot: &str) -> Vec<&'a str> {
        records
            .iter()
            .map(|record| record.scalar(slot).unwrap())
            .collect()
    }

    fn two_page_doc() -> LayoutDocument {
        doc(
            vec![
                page(
                    1,
                    vec![
                        block(
                            "b1",
                            (72.0, 80.0, 400.0, 40.0),
                            vec![
                                line("l1", &[("Deep", "font1"), ("Learning", "font1")]),
                                line("l2", &[("for", "font1"), ("Parsing", "font1")]),
                            ],
                        ),
                        block(
                            "b2",
                            (72.0, 140.0, 400.0, 60.0),
                            vec![
                                line("l3", &[("We", "font0"), ("study", "font0"), ("layout.", "font0")]),
                                line("l4", &[(" ", "font0"), ("ignored", "font0")]),
                                line("l5", &[("Results", "font0")]),
                            ],
                        ),
                    ],
                ),
                page(
                    2,
                    vec![block(
                        "b3",
                        (72.0, 80.0, 400.0, 20.0),
                        vec![line("l6", &[("2", "font0")])],
                    )],
                ),
            ],
            styles(),
        )
    }

    #[test]
    fn test_one_record_per_nonempty_line_in_order() {
        let records = encode(&two_page_doc(), &MainAreas::default());
        let ids: Vec<&str> = records.iter().map(|r| r.meta.line_id.as_str()).collect();
        assert_eq!(ids, vec!["l1", "l2", "l3", "l5", "l6"]);
        assert!(records.iter().all(|r| r.vectorize().split(' ').count() == 33));
    }

    #[test]
    fn test_page_and_block_boundaries() {
        let records = encode(&two_page_doc(), &MainAreas::default());
        assert_eq!(
            column(&records, "page_info"),
            vec!["PAGESTART", "PAGEIN", "PAGEIN", "PAGEEND", "PAGEEND"]
        );
        assert_eq!(
            column(&records, "block_info"),
            vec!["BLOCKSTART", "BLOCKEND", "BLOCKSTART", "BLOCKEND", "BLOCKSTART"]
        );
    }

    #[test]
    fn test_font_and_position_features() {
        let records = encode(&two_page_doc(), &MainAreas::default());
        assert_eq!(
            column(&records, "font_type"),
            vec!["NEWFONT", "SAMEFONT", "NEWFONT", "SAMEFONT", "SAMEFONT"]
        );
        assert_eq!(
            column(&records, "font_size_type"),
            vec!["HIGHERFONT", "SAMEFONTSIZE", "LOWERFONT", "SAMEFONTSIZE", "SAMEFONTSIZE"]
        );
        assert_eq!(records[0].scalar("font_bold"), Some("1"));
        // 11 tokens overall, 10 on the first page; the second block starts after 4
        assert_eq!(
            column(&records, "relative_document_position"),
            vec!["0", "0", "4", "4", "10"]
        );
        assert_eq!(
            column(&records, "relative_page_position_characters"),
            vec!["0", "0", "4", "4", "0"]
        );
    }

    #[test]
    fn test_lexical_features() {
        let records = encode(&two_page_doc(), &MainAreas::default());
        let first = &records[0];
        assert_eq!(first.scalar("token_text"), Some("Deep"));
        assert_eq!(first.scalar("2nd_token_text"), Some("Learning"));
        assert_eq!(first.scalar("lower_token"), Some("deep"));
        assert_eq!(first.scalar("is_captal"), Some("INITCAP"));
        assert_eq!(first.scalar("punct_profile"), Some("no"));
        assert_eq!(first.scalar("punct_profile_len"), Some("0"));

        let third = &records[2];
        assert_eq!(third.scalar("punct_profile"), Some("."));
        assert_eq!(third.scalar("punct_profile_len"), Some("1"));
        assert_eq!(third.scalar("common_name"), Some("1"));

        let last = &records[4];
        assert_eq!(last.scalar("2nd_token_text"), Some("2"));
        assert_eq!(last.scalar("is_digital"), Some("ALLDIGIT"));
        assert_eq!(last.scalar("single_char"), Some("1"));
    }

    #[test]
    fn test_line_length_buckets_and_idempotence() {
        let mut records = encode(&two_page_doc(), &MainAreas::default());
        // "We study layout." is the longest line of its block
        assert_eq!(records[2].scalar("line_len"), Some("10"));
        assert_eq!(records[3].scalar("line_len"), Some("4"));

        let before: Vec<String> = records.iter().map(SegmentRecord::vectorize).collect();
        rebucket_line_lengths(&mut records[2..4], 10);
        rebucket_line_lengths(&mut records[2..4], 10);
        let after: Vec<String> = records.iter().map(SegmentRecord::vectorize).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_in_main_area_uses_page_parity() {
        let areas = MainAreas {
            odd: Some(AreaRect {
                x: 70,
                y: 70,
                width: 410,
                height: 100,
            }),
            even: None,
        };
        let records = encode(&two_page_doc(), &areas);
        assert_eq!(
            column(&records, "in_main_area"),
            vec!["1", "1", "0", "0", "1"]
        );
    }

    #[test]
    fn test_unknown_style_is_malformed() {
        let mut doc = two_page_doc();
        doc.styles.styles.remove("font1");
        let config = SegmentConfig::default();
        let err = SegmentEncoder::new(&config)
            .encode(&doc, &MainAreas::default())
            .unwrap_err();
        assert!(err.to_string().contains("font1"));
    }
}
