pub mod record;
pub use record::{BUILTIN_DEFAULT_LAYOUT, DisplayOverrides, DisplaySettings, LayoutRecord};

pub mod layout_source;
pub use layout_source::{JsonLayoutSource, LayoutSource, MemoryLayoutSource};

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use log::{info, warn};

use crate::{FamilyKey, error::LayoutError};

/// Lazily loaded, read-only view of per-family layout records.
///
/// Records are handed out as `Arc` snapshots. `reload` swaps the whole registry
/// in one step; snapshots taken before stay valid but are no longer returned.
pub struct LayoutRegistry {
    source: Box<dyn LayoutSource>,
    default_key: FamilyKey,
    known: BTreeSet<FamilyKey>,
    records: HashMap<FamilyKey, Arc<LayoutRecord>>,
    revision: u64,
}

impl std::fmt::Debug for LayoutRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutRegistry")
            .field("default_key", &self.default_key)
            .field("known", &self.known)
            .field("loaded", &self.records.len())
            .field("revision", &self.revision)
            .finish()
    }
}

impl LayoutRegistry {
    pub fn new(source: Box<dyn LayoutSource>, default_key: FamilyKey) -> Self {
        let known = match source.keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!("could not list layouts, only the built-in default is available: {e}");
                BTreeSet::new()
            }
        };
        info!("Creating a new LayoutRegistry with {} known families", known.len());
        LayoutRegistry {
            source,
            default_key,
            known,
            records: HashMap::new(),
            revision: 0,
        }
    }

    pub fn default_key(&self) -> &FamilyKey {
        &self.default_key
    }

    /// Resolution predicate: a usable layout exists for `key`. Loads the
    /// record on first query, so a listed but unparsable layout is never
    /// reported as known.
    pub fn contains(&mut self, key: &FamilyKey) -> bool {
        self.load(key).is_some()
    }

    /// Keys listed by the source that have not failed to load yet.
    pub fn listed(&self) -> &BTreeSet<FamilyKey> {
        &self.known
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Record for `key`, falling back to the default family's record.
    pub fn get(&mut self, key: &FamilyKey) -> Arc<LayoutRecord> {
        if let Some(record) = self.load(key) {
            return record;
        }
        self.default_record()
    }

    pub fn default_record(&mut self) -> Arc<LayoutRecord> {
        let key = self.default_key.clone();
        match self.load(&key) {
            Some(record) => record,
            None => {
                let record = Arc::new(BUILTIN_DEFAULT_LAYOUT.clone());
                self.records.insert(key, record.clone());
                record
            }
        }
    }

    fn load(&mut self, key: &FamilyKey) -> Option<Arc<LayoutRecord>> {
        if let Some(record) = self.records.get(key) {
            return Some(record.clone());
        }
        if !self.known.contains(key) {
            return None;
        }
        match self.source.load(key) {
            Ok(record) => {
                let record = Arc::new(record);
                self.records.insert(key.clone(), record.clone());
                Some(record)
            }
            Err(e) => {
                warn!("layout for `{key}` unusable, treating it as unknown: {e}");
                self.known.remove(key);
                None
            }
        }
    }

    /// Re-list the source and drop every loaded record. On failure the
    /// previous registry stays in place.
    pub fn reload(&mut self) -> Result<(), LayoutError> {
        let known = self.source.keys()?;
        self.known = known;
        self.records = HashMap::new();
        self.revision += 1;
        info!(
            "layout registry reloaded (revision {}, {} families)",
            self.revision,
            self.known.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> LayoutRegistry {
        let source = MemoryLayoutSource::new()
            .with_record(
                "default",
                LayoutRecord {
                    panel_width: 11,
                    ..LayoutRecord::default()
                },
            )
            .with_record(
                "valravn",
                LayoutRecord {
                    scale: 2.0,
                    ..LayoutRecord::default()
                },
            );
        LayoutRegistry::new(Box::new(source), FamilyKey::new("default"))
    }

    #[test]
    fn known_family_is_returned() {
        let mut reg = registry();
        assert!(reg.contains(&FamilyKey::new("valravn")));
        assert_eq!(reg.get(&FamilyKey::new("valravn")).scale, 2.0);
    }

    #[test]
    fn unknown_family_gets_default_record() {
        let mut reg = registry();
        assert!(!reg.contains(&FamilyKey::new("kobold")));
        assert_eq!(reg.get(&FamilyKey::new("kobold")).panel_width, 11);
    }

    #[test]
    fn missing_default_uses_builtin() {
        let mut reg = LayoutRegistry::new(
            Box::new(MemoryLayoutSource::new()),
            FamilyKey::new("default"),
        );
        assert_eq!(*reg.get(&FamilyKey::new("x")), *BUILTIN_DEFAULT_LAYOUT);
    }

    #[test]
    fn records_are_shared_snapshots() {
        let mut reg = registry();
        let a = reg.get(&FamilyKey::new("valravn"));
        let b = reg.get(&FamilyKey::new("valravn"));
        assert!(Arc::ptr_eq(&a, &b));

        reg.reload().unwrap();
        let c = reg.get(&FamilyKey::new("valravn"));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(*a, *c);
        assert_eq!(reg.revision(), 1);
    }

    struct ListsBrokenLayout;

    impl LayoutSource for ListsBrokenLayout {
        fn keys(&self) -> Result<BTreeSet<FamilyKey>, LayoutError> {
            Ok(BTreeSet::from([FamilyKey::new("default"), FamilyKey::new("broken")]))
        }

        fn load(&self, key: &FamilyKey) -> Result<LayoutRecord, LayoutError> {
            if key.as_str() == "broken" {
                return Err(LayoutError::UnknownFamily(key.clone()));
            }
            Ok(LayoutRecord::default())
        }
    }

    #[test]
    fn unloadable_layout_is_never_known() {
        let mut reg = LayoutRegistry::new(Box::new(ListsBrokenLayout), FamilyKey::new("default"));
        let broken = FamilyKey::new("broken");
        assert!(reg.listed().contains(&broken));
        assert!(!reg.contains(&broken));
        assert!(!reg.contains(&broken));
        assert!(!reg.listed().contains(&broken));
        assert!(reg.contains(&FamilyKey::new("default")));
    }
}
