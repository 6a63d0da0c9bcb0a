use crate::features::FeatureKind;
use crate::types::LayoutDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version constants for cache invalidation
pub mod versions {
    pub const LAYOUTSEQ_VERSION: &str = "0.1.0";
    /// Bump whenever a feature slot changes meaning or order
    pub const FEATURE_VERSION: &str = "1.0.0";
}

/// Label cache key (model + submitted vectors → raw labeler responses)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LabelCacheKey {
    pub kind: FeatureKind,
    pub model_identity: String,
    pub vectors_hash: String,
    pub feature_version: String,
}

impl LabelCacheKey {
    pub fn new(kind: FeatureKind, model_identity: String, vectors_hash: String) -> Self {
        Self {
            kind,
            model_identity,
            vectors_hash,
            feature_version: versions::FEATURE_VERSION.to_string(),
        }
    }

    /// Compute cache key hash for storage
    pub fn to_cache_hash(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_str());
        hasher.update(&self.model_identity);
        hasher.update(&self.vectors_hash);
        hasher.update(&self.feature_version);
        format!("{:x}", hasher.finalize())
    }
}

/// Cached labeler responses with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelCacheValue {
    pub responses: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub labeling_time_ms: u64,
    pub cache_version: String,
}

impl LabelCacheValue {
    pub fn new(responses: Vec<String>, labeling_time_ms: u64) -> Self {
        Self {
            responses,
            created_at: Utc::now(),
            labeling_time_ms,
            cache_version: versions::LAYOUTSEQ_VERSION.to_string(),
        }
    }
}

/// Cached parsed layout (serialized input → LayoutDocument)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutCacheValue {
    pub document: LayoutDocument,
    pub created_at: DateTime<Utc>,
    pub cache_version: String,
}

impl LayoutCacheValue {
    pub fn new(document: LayoutDocument) -> Self {
        Self {
            document,
            created_at: Utc::now(),
            cache_version: versions::LAYOUTSEQ_VERSION.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hash_depends_on_model_and_kind() {
        let a = LabelCacheKey::new(FeatureKind::Segment, "wapiti:seg".into(), "abc".into());
        let b = LabelCacheKey::new(FeatureKind::Segment, "wapiti:seg2".into(), "abc".into());
        let c = LabelCacheKey::new(FeatureKind::Fulltext, "wapiti:seg".into(), "abc".into());
        assert_eq!(a.to_cache_hash(), a.clone().to_cache_hash());
        assert_ne!(a.to_cache_hash(), b.to_cache_hash());
        assert_ne!(a.to_cache_hash(), c.to_cache_hash());
        assert_eq!(a.to_cache_hash().len(), 64);
    }
}
