use crate::cache::{LabelCacheKey, LabelCacheValue, LayoutCacheValue};
use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Storage abstraction for caching layout parsing and labeling results
pub trait LabelStorage {
    // Level 1: parsed layouts (input bytes → LayoutDocument)
    fn get_layout(&self, input_hash: &str) -> Result<Option<LayoutCacheValue>>;
    fn store_layout(&self, input_hash: &str, value: &LayoutCacheValue) -> Result<()>;

    // Level 2: labeler responses (model + vectors → responses)
    fn get_labels(&self, key: &LabelCacheKey) -> Result<Option<LabelCacheValue>>;
    fn store_labels(&self, key: &LabelCacheKey, value: &LabelCacheValue) -> Result<()>;
}

/// File-based storage implementation using local cache directory
pub struct FileStorage {
    cache_dir: PathBuf,
}

impl FileStorage {
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        // Ensure cache directory exists
        fs::create_dir_all(cache_dir.join("layouts"))?;
        fs::create_dir_all(cache_dir.join("labels"))?;

        Ok(Self { cache_dir })
    }

    fn layout_path(&self, hash: &str) -> PathBuf {
        self.cache_dir.join("layouts").join(format!("{hash}.json"))
    }

    fn labels_path(&self, key: &LabelCacheKey) -> PathBuf {
        self.cache_dir
            .join("labels")
            .join(format!("{}.json", key.to_cache_hash()))
    }
}

impl LabelStorage for FileStorage {
    fn get_layout(&self, input_hash: &str) -> Result<Option<LayoutCacheValue>> {
        let path = self.layout_path(input_hash);
        if path.exists() {
            let json_str = fs::read_to_string(path)?;
            let value: LayoutCacheValue = serde_json::from_str(&json_str)
                .map_err(|e| anyhow!("Failed to deserialize cached layout: {}", e))?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    fn store_layout(&self, input_hash: &str, value: &LayoutCacheValue) -> Result<()> {
        let json_str = serde_json::to_string(value)
            .map_err(|e| anyhow!("Failed to serialize layout: {}", e))?;
        fs::write(self.layout_path(input_hash), json_str)?;
        Ok(())
    }

    fn get_labels(&self, key: &LabelCacheKey) -> Result<Option<LabelCacheValue>> {
        let path = self.labels_path(key);
        if path.exists() {
            let json_str = fs::read_to_string(path)?;
            let value: LabelCacheValue = serde_json::from_str(&json_str)
                .map_err(|e| anyhow!("Failed to deserialize cached labels: {}", e))?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    fn store_labels(&self, key: &LabelCacheKey, value: &LabelCacheValue) -> Result<()> {
        let json_str = serde_json::to_string_pretty(value)
            .map_err(|e| anyhow!("Failed to serialize labels: {}", e))?;
        fs::write(self.labels_path(key), json_str)?;
        Ok(())
    }
}

/// Hash of the raw layout input (for the level 1 key)
pub fn calculate_input_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.len().to_le_bytes());
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// Hash of the submitted vector lines (for the level 2 key)
pub fn calculate_vectors_hash(vectors: &[String]) -> String {
    let mut hasher = Sha256::new();
    for vector in vectors {
        hasher.update(vector.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// No-op storage implementation that disables all caching
pub struct NoOpStorage;

impl Default for NoOpStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl NoOpStorage {
    pub fn new() -> Self {
        Self
    }
}

impl LabelStorage for NoOpStorage {
    fn get_layout(&self, _input_hash: &str) -> Result<Option<LayoutCacheValue>> {
        Ok(None) // Always cache miss
    }

    fn store_layout(&self, _input_hash: &str, _value: &LayoutCacheValue) -> Result<()> {
        Ok(())
    }

    fn get_labels(&self, _key: &LabelCacheKey) -> Result<Option<LabelCacheValue>> {
        Ok(None) // Always cache miss
    }

    fn store_labels(&self, _key: &LabelCacheKey, _value: &LabelCacheValue) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureKind;
    use crate::testing::{block, doc, line, page, styles};

    #[test]
    fn test_vectors_hash_is_order_sensitive() {
        let a = vec!["x 1".to_string(), "y 2".to_string()];
        let b = vec!["y 2".to_string(), "x 1".to_string()];
        assert_eq!(calculate_vectors_hash(&a), calculate_vectors_hash(&a));
        assert_ne!(calculate_vectors_hash(&a), calculate_vectors_hash(&b));
        // line boundaries matter
        let joined = vec!["x 1y 2".to_string()];
        assert_ne!(calculate_vectors_hash(&a), calculate_vectors_hash(&joined));
    }

    #[test]
    fn test_file_storage_label_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        let key = LabelCacheKey::new(
            FeatureKind::Segment,
            "replay:segment:memory".to_string(),
            calculate_vectors_hash(&["a b".to_string()]),
        );

        assert!(storage.get_labels(&key).unwrap().is_none());
        storage
            .store_labels(&key, &LabelCacheValue::new(vec!["a b\t<body>".to_string()], 12))
            .unwrap();
        let cached = storage.get_labels(&key).unwrap().unwrap();
        assert_eq!(cached.responses, vec!["a b\t<body>"]);
        assert_eq!(cached.labeling_time_ms, 12);
    }

    #[test]
    fn test_file_storage_layout_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        let layout = doc(
            vec![page(1, vec![block("b1", (72.0, 80.0, 400.0, 40.0), vec![line("l1", &[("Hi", "font0")])])])],
            styles(),
        );
        let hash = calculate_input_hash(b"<alto/>");
        storage.store_layout(&hash, &LayoutCacheValue::new(layout.clone())).unwrap();
        let cached = storage.get_layout(&hash).unwrap().unwrap();
        assert_eq!(cached.document, layout);
    }

    #[test]
    fn test_noop_storage_always_misses() {
        let storage = NoOpStorage::new();
        let key = LabelCacheKey::new(FeatureKind::Fulltext, "m".into(), "h".into());
        storage
            .store_labels(&key, &LabelCacheValue::new(vec![], 0))
            .unwrap();
        assert!(storage.get_labels(&key).unwrap().is_none());
        assert!(storage.get_layout("h").unwrap().is_none());
    }
}
