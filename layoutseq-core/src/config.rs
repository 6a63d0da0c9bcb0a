use crate::structure::tags::{default_vocabulary, TagSpec};
use crate::types::BoundingBox;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_position_buckets() -> usize {
    12
}

fn default_line_length_buckets() -> usize {
    10
}

fn default_body_label() -> String {
    "<body>".to_string()
}

fn default_root_label() -> String {
    "<division>".to_string()
}

fn default_dropped_labels() -> Vec<String> {
    ["<figure>", "<figure_marker>", "<table>", "<table_marker>"]
        .iter()
        .map(|label| label.to_string())
        .collect()
}

fn default_min_side() -> f32 {
    20.0
}

fn default_min_area() -> f32 {
    3000.0
}

fn default_wapiti_path() -> String {
    "wapiti".to_string()
}

/// Top-level configuration for the whole layout → structure pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub area: AreaConfig,
    #[serde(default)]
    pub segment: SegmentConfig,
    #[serde(default)]
    pub fulltext: FulltextConfig,
    #[serde(default)]
    pub grouping: GroupingConfig,
    #[serde(default)]
    pub structure: StructureConfig,
    #[serde(default)]
    pub models: ModelConfig,
}

/// Noise thresholds for main-area estimation. A block matching any criterion is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaConfig {
    /// Discard blocks whose left edge sits exactly at 0
    #[serde(default = "default_true")]
    pub discard_zero_left: bool,
    #[serde(default = "default_min_side")]
    pub min_width: f32,
    #[serde(default = "default_min_side")]
    pub min_height: f32,
    /// Minimum width * height
    #[serde(default = "default_min_area")]
    pub min_area: f32,
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            discard_zero_left: true,
            min_width: default_min_side(),
            min_height: default_min_side(),
            min_area: default_min_area(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// Buckets for relative document/page position
    #[serde(default = "default_position_buckets")]
    pub position_buckets: usize,
    /// Buckets for the per-block line length feature
    #[serde(default = "default_line_length_buckets")]
    pub line_length_buckets: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            position_buckets: default_position_buckets(),
            line_length_buckets: default_line_length_buckets(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulltextConfig {
    /// Buckets for the vertical position on the page
    #[serde(default = "default_position_buckets")]
    pub position_buckets: usize,
    /// Tokens intersecting any of these zones are left out of the fulltext stream
    #[serde(default)]
    pub forbidden_zones: Vec<ForbiddenZone>,
}

impl Default for FulltextConfig {
    fn default() -> Self {
        Self {
            position_buckets: default_position_buckets(),
            forbidden_zones: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForbiddenZone {
    /// Restrict the zone to one page number (1-based); all pages when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ForbiddenZone {
    pub fn applies_to(&self, page_number: u32) -> bool {
        self.page.map(|page| page == page_number).unwrap_or(true)
    }

    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Segment category whose blocks feed the fulltext pass
    #[serde(default = "default_body_label")]
    pub body_label: String,
    /// Category that receives blocks whose lines disagree; disputed blocks are dropped when unset
    #[serde(default)]
    pub disputed_label: Option<String>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            body_label: default_body_label(),
            disputed_label: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureConfig {
    /// Label of the outermost container, which must be present in `vocabulary`
    #[serde(default = "default_root_label")]
    pub root_label: String,
    /// Label → markup element and nesting priority
    #[serde(default = "default_vocabulary")]
    pub vocabulary: BTreeMap<String, TagSpec>,
    /// Labels whose tokens are removed from the output
    #[serde(default = "default_dropped_labels")]
    pub dropped_labels: Vec<String>,
    /// Close every still-open element at end of input
    #[serde(default = "default_true")]
    pub close_open_tags_at_end: bool,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            root_label: default_root_label(),
            vocabulary: default_vocabulary(),
            dropped_labels: default_dropped_labels(),
            close_open_tags_at_end: true,
        }
    }
}

/// Location of the external labeler and its models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_wapiti_path")]
    pub wapiti_path: String,
    #[serde(default)]
    pub segment_model: Option<PathBuf>,
    #[serde(default)]
    pub fulltext_model: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            wapiti_path: default_wapiti_path(),
            segment_model: None,
            fulltext_model: None,
        }
    }
}

impl PipelineConfig {
    /// Load config from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                log::warn!("Failed to load config from {}, using defaults: {}", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
