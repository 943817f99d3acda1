use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};

use anyhow::Context as _;

use crate::error::{SketchError, SketchResult};

/// Storage key holding every recorded series.
pub const RECORD_STORAGE_KEY: &str = "sketchRecordStorage";

/// Recorded values per variable name, in frame order.
pub type SeriesMap = BTreeMap<String, Vec<serde_json::Value>>;

/// String key/value persistence with browser local-storage semantics.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> SketchResult<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> SketchResult<()>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    items: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> SketchResult<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> SketchResult<()> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> SketchResult<PathBuf> {
        if key.is_empty()
            || key
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.'))
            || key.starts_with('.')
        {
            return Err(SketchError::storage(format!("invalid storage key '{key}'")));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> SketchResult<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SketchError::storage(format!(
                "failed to read '{}': {e}",
                path.display()
            ))),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> SketchResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.root).with_context(|| {
            format!("failed to create storage directory '{}'", self.root.display())
        })?;
        std::fs::write(&path, value)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        Ok(())
    }
}

/// Load the recorded series map, if one was saved.
pub fn load_series(store: &dyn KeyValueStore) -> SketchResult<Option<SeriesMap>> {
    let Some(raw) = store.get_item(RECORD_STORAGE_KEY)? else {
        return Ok(None);
    };
    let map = serde_json::from_str(&raw)
        .map_err(|e| SketchError::serde(format!("stored series under '{RECORD_STORAGE_KEY}': {e}")))?;
    Ok(Some(map))
}

/// Replace the recorded series map.
pub fn save_series(store: &mut dyn KeyValueStore, series: &SeriesMap) -> SketchResult<()> {
    let raw = serde_json::to_string(series)?;
    store.set_item(RECORD_STORAGE_KEY, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = PathBuf::from("target").join("storage_unit").join(name);
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn memory_store_round_trips_series() {
        let mut store = MemoryStore::new();
        assert!(load_series(&store).unwrap().is_none());

        let mut series = SeriesMap::new();
        series.insert("mouseX".to_string(), vec![1.into(), 2.into()]);
        save_series(&mut store, &series).unwrap();

        assert_eq!(load_series(&store).unwrap(), Some(series));
        assert!(store.get_item(RECORD_STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn corrupt_payload_is_a_serde_error() {
        let mut store = MemoryStore::new();
        store.set_item(RECORD_STORAGE_KEY, "{not json").unwrap();
        assert!(matches!(load_series(&store), Err(SketchError::Serde(_))));
    }

    #[test]
    fn file_store_missing_key_is_none() {
        let store = FileStore::new(temp_dir("missing"));
        assert!(store.get_item(RECORD_STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = temp_dir("persist");
        let mut a = FileStore::new(&dir);
        a.set_item("k", "[1,2,3]").unwrap();

        let b = FileStore::new(&dir);
        assert_eq!(b.get_item("k").unwrap().as_deref(), Some("[1,2,3]"));
        assert!(dir.join("k.json").exists());
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let mut store = FileStore::new(temp_dir("keys"));
        assert!(store.set_item("../escape", "x").is_err());
        assert!(store.get_item("").is_err());
    }
}
