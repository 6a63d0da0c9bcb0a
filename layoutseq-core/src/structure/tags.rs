use crate::config::StructureConfig;
use crate::error::{LayoutError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Markup produced for one label.
///
/// Higher priorities enclose lower ones: a label whose priority is below the
/// current element's nests inside it, anything else closes its way outward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSpec {
    pub element: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    pub priority: u32,
    /// A span start of this label opens a new division
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub starts_division: bool,
    /// Leading section numbers move into an `n` attribute
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub numbered: bool,
}

impl TagSpec {
    pub fn new(element: &str, priority: u32) -> Self {
        Self {
            element: element.to_string(),
            attributes: BTreeMap::new(),
            priority,
            starts_division: false,
            numbered: false,
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }
}

pub fn default_vocabulary() -> BTreeMap<String, TagSpec> {
    let mut vocabulary = BTreeMap::new();
    vocabulary.insert("<division>".to_string(), TagSpec::new("div", 100));
    vocabulary.insert(
        "<section>".to_string(),
        TagSpec {
            starts_division: true,
            numbered: true,
            ..TagSpec::new("head", 8)
        },
    );
    vocabulary.insert("<paragraph>".to_string(), TagSpec::new("p", 10));
    vocabulary.insert(
        "<citation_marker>".to_string(),
        TagSpec::new("ref", 4).with_attribute("type", "bibr"),
    );
    vocabulary.insert("<equation>".to_string(), TagSpec::new("formula", 6));
    vocabulary.insert(
        "<equation_marker>".to_string(),
        TagSpec::new("ref", 4).with_attribute("type", "formula"),
    );
    vocabulary.insert("<equation_label>".to_string(), TagSpec::new("label", 2));
    vocabulary
}

/// Validated label vocabulary used by the reconstruction state machine.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    root_label: String,
    tags: BTreeMap<String, TagSpec>,
    dropped: HashSet<String>,
}

impl Vocabulary {
    pub fn from_config(config: &StructureConfig) -> Result<Self> {
        if !config.vocabulary.contains_key(&config.root_label) {
            return Err(LayoutError::malformed(
                "structure vocabulary",
                format!("root label '{}' has no tag", config.root_label),
            ));
        }
        Ok(Self {
            root_label: config.root_label.clone(),
            tags: config.vocabulary.clone(),
            dropped: config.dropped_labels.iter().cloned().collect(),
        })
    }

    pub fn root_label(&self) -> &str {
        &self.root_label
    }

    pub fn get(&self, label: &str) -> Option<&TagSpec> {
        self.tags.get(label)
    }

    pub fn priority(&self, label: &str) -> u32 {
        self.tags.get(label).map(|spec| spec.priority).unwrap_or(0)
    }

    pub fn is_dropped(&self, label: &str) -> bool {
        self.dropped.contains(label)
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            root_label: "<division>".to_string(),
            tags: default_vocabulary(),
            dropped: StructureConfig::default().dropped_labels.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_root_is_rejected() {
        let config = StructureConfig {
            root_label: "<part>".to_string(),
            ..StructureConfig::default()
        };
        assert!(Vocabulary::from_config(&config).is_err());
    }

    #[test]
    fn test_default_vocabulary() {
        let vocabulary = Vocabulary::default();
        assert_eq!(vocabulary.root_label(), "<division>");
        assert!(vocabulary.priority("<division>") > vocabulary.priority("<paragraph>"));
        assert!(vocabulary.priority("<paragraph>") > vocabulary.priority("<section>"));
        assert!(vocabulary.is_dropped("<figure_marker>"));
        assert!(vocabulary.get("<section>").unwrap().starts_division);
        assert_eq!(
            vocabulary.get("<citation_marker>").unwrap().attributes.get("type"),
            Some(&"bibr".to_string())
        );
    }
}
