use serde::{Deserialize, Serialize};
use std::fmt;

pub const SEGMENT_SLOTS: [&str; 30] = [
    "token_text",
    "2nd_token_text",
    "lower_token",
    "token_prefix",
    "block_info",
    "page_info",
    "font_type",
    "font_size_type",
    "font_bold",
    "font_italics",
    "is_captal",
    "is_digital",
    "single_char",
    "proper_name",
    "common_name",
    "first_name",
    "year",
    "mounth",
    "email",
    "http",
    "relative_document_position",
    "relative_page_position_characters",
    "punct_profile",
    "punct_profile_len",
    "line_len",
    "bitmap_around",
    "vector_around",
    "repetitive_pattern",
    "first_repetitive_pattern",
    "in_main_area",
];

pub const FULLTEXT_SLOTS: [&str; 21] = [
    "token_text",
    "lower_token",
    "token_prefix",
    "token_suffix",
    "block_info",
    "line_info",
    "align_status",
    "font_type",
    "font_size_type",
    "font_bold",
    "font_italics",
    "is_captal",
    "is_digital",
    "single_char",
    "punct_info",
    "relative_document_position",
    "relative_page_position_characters",
    "bitmap_around",
    "calloutType",
    "calloutKnown",
    "superscript",
];

/// The two feature streams, each with its own fixed schema and model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Segment,
    Fulltext,
}

impl FeatureKind {
    pub fn slots(&self) -> &'static [&'static str] {
        match self {
            FeatureKind::Segment => &SEGMENT_SLOTS,
            FeatureKind::Fulltext => &FULLTEXT_SLOTS,
        }
    }

    pub fn slot_index(&self, slot: &str) -> Option<usize> {
        self.slots().iter().position(|name| *name == slot)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Segment => "segment",
            FeatureKind::Fulltext => "fulltext",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Scalar(String),
    Sequence(Vec<String>),
}

impl FeatureValue {
    fn extend_into<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FeatureValue::Scalar(value) => out.push(value),
            FeatureValue::Sequence(values) => out.extend(values.iter().map(String::as_str)),
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            FeatureValue::Scalar(value) => Some(value),
            FeatureValue::Sequence(_) => None,
        }
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Scalar(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Scalar(value)
    }
}

impl From<usize> for FeatureValue {
    fn from(value: usize) -> Self {
        FeatureValue::Scalar(value.to_string())
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Scalar(value.to_string())
    }
}

impl From<Vec<String>> for FeatureValue {
    fn from(values: Vec<String>) -> Self {
        FeatureValue::Sequence(values)
    }
}

/// One fixed-schema feature row plus non-vectorized metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord<M> {
    pub kind: FeatureKind,
    values: Vec<FeatureValue>,
    pub meta: M,
}

impl<M> FeatureRecord<M> {
    /// Build a record from values given in schema order.
    pub fn new(kind: FeatureKind, values: Vec<FeatureValue>, meta: M) -> Self {
        debug_assert_eq!(values.len(), kind.slots().len());
        Self { kind, values, meta }
    }

    pub fn get(&self, slot: &str) -> Option<&FeatureValue> {
        self.kind.slot_index(slot).and_then(|i| self.values.get(i))
    }

    pub fn scalar(&self, slot: &str) -> Option<&str> {
        self.get(slot).and_then(FeatureValue::as_scalar)
    }

    pub fn set(&mut self, slot: &str, value: impl Into<FeatureValue>) {
        match self.kind.slot_index(slot) {
            Some(i) => self.values[i] = value.into(),
            None => debug_assert!(false, "unknown {} slot {}", self.kind, slot),
        }
    }

    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    /// Space-joined flattening of every slot in schema order.
    pub fn vectorize(&self) -> String {
        let mut parts = Vec::with_capacity(self.values.len() + 6);
        for value in &self.values {
            value.extend_into(&mut parts);
        }
        parts.join(" ")
    }
}

/// Vector lines for a whole stream, ready for the labeler.
pub fn vectorize_all<M>(records: &[FeatureRecord<M>]) -> Vec<String> {
    records.iter().map(FeatureRecord::vectorize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fulltext_values(token: &str) -> Vec<FeatureValue> {
        FULLTEXT_SLOTS
            .iter()
            .map(|slot| match *slot {
                "token_text" => FeatureValue::from(token),
                "token_prefix" | "token_suffix" => {
                    FeatureValue::from(vec!["a".to_string(), "b".to_string()])
                }
                _ => FeatureValue::from("0"),
            })
            .collect()
    }

    #[test]
    fn test_vectorize_flattens_sequences_in_schema_order() {
        let record = FeatureRecord::new(FeatureKind::Fulltext, fulltext_values("word"), ());
        let vector = record.vectorize();
        let columns: Vec<&str> = vector.split(' ').collect();
        assert_eq!(columns.len(), 21 - 2 + 4);
        assert_eq!(&columns[..6], &["word", "0", "a", "b", "a", "b"]);
    }

    #[test]
    fn test_set_replaces_named_slot() {
        let mut record = FeatureRecord::new(FeatureKind::Fulltext, fulltext_values("x"), ());
        record.set("line_info", "LINEEND");
        assert_eq!(record.scalar("line_info"), Some("LINEEND"));
        assert_eq!(record.scalar("token_prefix"), None);
    }

    #[test]
    fn test_schema_sizes() {
        assert_eq!(FeatureKind::Segment.slots().len(), 30);
        assert_eq!(FeatureKind::Fulltext.slots().len(), 21);
        assert_eq!(FeatureKind::Segment.slot_index("in_main_area"), Some(29));
    }
}
