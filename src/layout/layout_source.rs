use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

use log::debug;

use crate::{FamilyKey, LayoutRecord, error::LayoutError};

/// Where layout records come from.
pub trait LayoutSource: Send {
    fn keys(&self) -> Result<BTreeSet<FamilyKey>, LayoutError>;

    fn load(&self, key: &FamilyKey) -> Result<LayoutRecord, LayoutError>;
}

/// A directory of `<family>.json` files.
#[derive(Debug, Clone)]
pub struct JsonLayoutSource {
    root: PathBuf,
}

impl JsonLayoutSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        JsonLayoutSource { root: root.into() }
    }

    fn path_of(&self, key: &FamilyKey) -> PathBuf {
        self.root.join(format!("{}.json", key.as_str()))
    }
}

impl LayoutSource for JsonLayoutSource {
    fn keys(&self) -> Result<BTreeSet<FamilyKey>, LayoutError> {
        let entries = fs::read_dir(&self.root).map_err(|source| LayoutError::FailedReadingPath {
            path: self.root.to_string_lossy().to_string(),
            source,
        })?;

        let mut keys = BTreeSet::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.insert(FamilyKey::new(stem));
            }
        }
        debug!("found {} layout files in {:?}", keys.len(), self.root);
        Ok(keys)
    }

    fn load(&self, key: &FamilyKey) -> Result<LayoutRecord, LayoutError> {
        let path = self.path_of(key);
        let text = fs::read_to_string(&path).map_err(|source| LayoutError::FailedReadingPath {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        let record: LayoutRecord =
            serde_json::from_str(&text).map_err(|source| LayoutError::Malformed {
                key: key.clone(),
                source,
            })?;
        Ok(record.normalized())
    }
}

/// Layout records held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLayoutSource {
    records: BTreeMap<FamilyKey, LayoutRecord>,
}

impl MemoryLayoutSource {
    pub fn new() -> Self {
        MemoryLayoutSource::default()
    }

    pub fn with_record(mut self, key: &str, record: LayoutRecord) -> Self {
        self.records.insert(FamilyKey::new(key), record);
        self
    }
}

impl LayoutSource for MemoryLayoutSource {
    fn keys(&self) -> Result<BTreeSet<FamilyKey>, LayoutError> {
        Ok(self.records.keys().cloned().collect())
    }

    fn load(&self, key: &FamilyKey) -> Result<LayoutRecord, LayoutError> {
        self.records
            .get(key)
            .cloned()
            .map(LayoutRecord::normalized)
            .ok_or_else(|| LayoutError::UnknownFamily(key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BodyPart, LayoutRegistry};
    use common_stdx::Point;
    use tempfile::tempdir;

    #[test]
    fn lists_only_json_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("Valravn.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "not a layout").unwrap();
        fs::create_dir(dir.path().join("wolf")).unwrap();

        let keys = JsonLayoutSource::new(dir.path()).keys().unwrap();
        assert_eq!(keys, BTreeSet::from([FamilyKey::new("valravn")]));
    }

    #[test]
    fn loads_and_normalizes_a_record() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("bird.json"),
            r#"{ "scale": 2.0, "coords": { "Head": [10, 20] } }"#,
        )
        .unwrap();

        let record = JsonLayoutSource::new(dir.path())
            .load(&FamilyKey::new("bird"))
            .unwrap();
        assert_eq!(record.scale, 2.0);
        assert_eq!(record.coord(&BodyPart::new("head")), Some(Point::new(10, 20)));
    }

    #[test]
    fn malformed_json_falls_back_to_default() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("default.json"), r#"{ "panel_width": 9 }"#).unwrap();
        fs::write(dir.path().join("wolf.json"), "{ coords: oops").unwrap();

        let source = JsonLayoutSource::new(dir.path());
        let err = source.load(&FamilyKey::new("wolf")).unwrap_err();
        assert!(matches!(err, LayoutError::Malformed { .. }));

        let mut registry = LayoutRegistry::new(Box::new(source), FamilyKey::new("default"));
        assert!(!registry.contains(&FamilyKey::new("wolf")));
        assert_eq!(registry.get(&FamilyKey::new("wolf")).panel_width, 9);
    }

    #[test]
    fn missing_directory_is_a_read_error() {
        let dir = tempdir().unwrap();
        let source = JsonLayoutSource::new(dir.path().join("nope"));
        assert!(matches!(
            source.keys(),
            Err(LayoutError::FailedReadingPath { .. })
        ));
    }
}
