pub mod image_resource;
pub use image_resource::{FamilyImageSet, ImageResource};

pub mod asset_source;
pub use asset_source::{AssetSource, FileAssetSource, MemoryAssetSource};

use std::collections::{BTreeSet, HashMap};

use log::{debug, info, warn};

use crate::{FamilyKey, error::ResourceLoadError};

pub const DEFAULT_CACHE_CAPACITY: usize = 15;

/// Non-owning reference into the cache. A handle whose slot was evicted or
/// reused resolves to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    slot: usize,
    generation: u32,
}

#[derive(Debug)]
struct CacheEntry {
    key: FamilyKey,
    images: FamilyImageSet,
    last_used: u64,
    subscribers: usize,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    entry: Option<CacheEntry>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub evictions: usize,
    pub load_failures: usize,
}

/// Bounded LRU cache of decoded family image sets.
///
/// Entries with live subscriptions are pinned and never evicted. When every
/// entry is pinned the cache grows past `capacity`; `settle` shrinks it back
/// once subscriptions are dropped.
pub struct ResourceCache {
    source: Box<dyn AssetSource>,
    known: BTreeSet<FamilyKey>,
    slots: Vec<Slot>,
    free_slots: Vec<usize>,
    index: HashMap<FamilyKey, usize>,
    capacity: usize,
    clock: u64,
    stats: CacheStats,
}

impl std::fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.index.len())
            .field("known", &self.known.len())
            .field("capacity", &self.capacity)
            .field("stats", &self.stats)
            .finish()
    }
}

impl ResourceCache {
    pub fn new(source: Box<dyn AssetSource>, capacity: usize) -> Self {
        info!("Creating a new ResourceCache with capacity {capacity}");
        let known = list_families(&*source);
        ResourceCache {
            source,
            known,
            slots: Vec::new(),
            free_slots: Vec::new(),
            index: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
            stats: CacheStats::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// True when the family is cached or the asset source listed it.
    /// Answers from memory.
    pub fn contains(&self, key: &FamilyKey) -> bool {
        self.index.contains_key(key) || self.known.contains(key)
    }

    pub fn is_cached(&self, key: &FamilyKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn subscribers(&self, key: &FamilyKey) -> usize {
        self.index
            .get(key)
            .and_then(|&slot| self.slots[slot].entry.as_ref())
            .map(|e| e.subscribers)
            .unwrap_or(0)
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Return a handle to the image set of `key`, decoding it on a miss.
    pub fn get_or_load(&mut self, key: &FamilyKey) -> Result<ResourceHandle, ResourceLoadError> {
        let now = self.tick();
        if let Some(&slot) = self.index.get(key) {
            let generation = self.slots[slot].generation;
            if let Some(entry) = self.slots[slot].entry.as_mut() {
                entry.last_used = now;
                self.stats.hits += 1;
                return Ok(ResourceHandle { slot, generation });
            }
        }

        self.stats.misses += 1;
        let images = match self.source.load(key) {
            Ok(images) => images,
            Err(e) => {
                self.stats.load_failures += 1;
                return Err(e);
            }
        };

        let handle = self.insert(key.clone(), images, now);
        if self.index.len() > self.capacity {
            self.evict_excluding(Some(handle.slot));
        }
        Ok(handle)
    }

    fn insert(&mut self, key: FamilyKey, images: FamilyImageSet, now: u64) -> ResourceHandle {
        let slot = match self.free_slots.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Slot::default());
                self.slots.len() - 1
            }
        };
        debug!("caching image set `{key}` in slot {slot}");
        self.slots[slot].entry = Some(CacheEntry {
            key: key.clone(),
            images,
            last_used: now,
            subscribers: 0,
        });
        self.index.insert(key, slot);
        ResourceHandle {
            slot,
            generation: self.slots[slot].generation,
        }
    }

    pub fn get(&self, handle: ResourceHandle) -> Option<&FamilyImageSet> {
        let slot = self.slots.get(handle.slot)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_ref().map(|e| &e.images)
    }

    /// Pin the entry behind `handle` once. Returns false for a stale handle.
    pub fn subscribe(&mut self, handle: ResourceHandle) -> bool {
        let now = self.tick();
        match self.entry_mut(handle) {
            Some(entry) => {
                entry.subscribers += 1;
                entry.last_used = now;
                true
            }
            None => false,
        }
    }

    pub fn unsubscribe(&mut self, handle: ResourceHandle) {
        match self.entry_mut(handle) {
            Some(entry) if entry.subscribers > 0 => entry.subscribers -= 1,
            Some(entry) => warn!("unbalanced unsubscribe for image set `{}`", entry.key),
            None => debug!("unsubscribe of stale handle {handle:?}"),
        }
    }

    fn entry_mut(&mut self, handle: ResourceHandle) -> Option<&mut CacheEntry> {
        let slot = self.slots.get_mut(handle.slot)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.entry.as_mut()
    }

    /// Evict the least recently used entry that no panel subscribes to.
    pub fn evict_least_recently_used(&mut self) -> Option<FamilyKey> {
        self.evict_excluding(None)
    }

    fn evict_excluding(&mut self, keep: Option<usize>) -> Option<FamilyKey> {
        let victim = self
            .slots
            .iter()
            .enumerate()
            .filter(|(idx, _)| Some(*idx) != keep)
            .filter_map(|(idx, slot)| slot.entry.as_ref().map(|e| (idx, e)))
            .filter(|(_, e)| e.subscribers == 0)
            .min_by_key(|(_, e)| e.last_used)
            .map(|(idx, _)| idx);

        match victim {
            Some(slot) => Some(self.remove_slot(slot)),
            None => {
                debug!(
                    "all {} cached image sets are pinned, running over capacity {}",
                    self.index.len(),
                    self.capacity
                );
                None
            }
        }
    }

    fn remove_slot(&mut self, slot: usize) -> FamilyKey {
        let s = &mut self.slots[slot];
        s.generation = s.generation.wrapping_add(1);
        let key = s
            .entry
            .take()
            .map(|e| e.key)
            .unwrap_or_else(|| FamilyKey::new(""));
        self.index.remove(&key);
        self.free_slots.push(slot);
        self.stats.evictions += 1;
        debug!("evicted image set `{key}` from slot {slot}");
        key
    }

    /// Shrink back to capacity after transient over-capacity growth.
    pub fn settle(&mut self) -> usize {
        let mut evicted = 0;
        while self.index.len() > self.capacity {
            if self.evict_least_recently_used().is_none() {
                break;
            }
            evicted += 1;
        }
        evicted
    }

    /// Drop every entry and list the source again. Outstanding handles become
    /// stale.
    pub fn clear(&mut self) {
        let occupied: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.entry.is_some())
            .map(|(idx, _)| idx)
            .collect();
        for slot in occupied {
            self.remove_slot(slot);
        }
        self.known = list_families(&*self.source);
        info!("resource cache cleared, {} families available", self.known.len());
    }
}

fn list_families(source: &dyn AssetSource) -> BTreeSet<FamilyKey> {
    match source.keys() {
        Ok(keys) => keys,
        Err(e) => {
            warn!("could not list image families, only loaded ones are known: {e}");
            BTreeSet::new()
        }
    }
}
