use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;

use ascii_assets::AsciiVideo;
use log::debug;

use crate::{
    FamilyKey,
    error::ResourceLoadError,
    resource_cache::{FamilyImageSet, ImageResource},
};

pub const SILHOUETTE_FILE: &str = "silhouette.ascv";
pub const MARKER_FILES: [&str; 3] = ["rank1.ascv", "rank2.ascv", "rank3.ascv"];

/// Where decoded image sets come from.
pub trait AssetSource: Send {
    /// Every family this source can load. The cache lists them when it is
    /// built or cleared and answers the resolution predicate from that list.
    fn keys(&self) -> Result<BTreeSet<FamilyKey>, ResourceLoadError>;

    fn load(&mut self, key: &FamilyKey) -> Result<FamilyImageSet, ResourceLoadError>;
}

/// Reads `<root>/<family>/{silhouette,rank1,rank2,rank3}.ascv`.
#[derive(Debug, Clone)]
pub struct FileAssetSource {
    root: PathBuf,
}

impl FileAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileAssetSource { root: root.into() }
    }

    fn family_dir(&self, key: &FamilyKey) -> PathBuf {
        self.root.join(key.as_str())
    }

    fn has_silhouette(&self, key: &FamilyKey) -> bool {
        self.family_dir(key).join(SILHOUETTE_FILE).is_file()
    }

    fn read_image(&self, key: &FamilyKey, file: &str) -> Result<ImageResource, ResourceLoadError> {
        let path = self.family_dir(key).join(file);
        let path = path.to_string_lossy().to_string();
        debug!("decoding {path}");
        let video =
            AsciiVideo::read_from_file(path.as_str()).map_err(|e| ResourceLoadError::Decode {
                key: key.clone(),
                path: path.clone(),
                reason: e.to_string(),
            })?;
        ImageResource::from_video(video, key, &path)
    }
}

impl AssetSource for FileAssetSource {
    fn keys(&self) -> Result<BTreeSet<FamilyKey>, ResourceLoadError> {
        let entries = fs::read_dir(&self.root).map_err(|source| {
            ResourceLoadError::FailedReadingPath {
                path: self.root.to_string_lossy().to_string(),
                source,
            }
        })?;

        let mut keys = BTreeSet::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                let key = FamilyKey::new(name);
                if self.has_silhouette(&key) {
                    keys.insert(key);
                }
            }
        }
        debug!("found {} image families in {:?}", keys.len(), self.root);
        Ok(keys)
    }

    fn load(&mut self, key: &FamilyKey) -> Result<FamilyImageSet, ResourceLoadError> {
        if !self.has_silhouette(key) {
            return Err(ResourceLoadError::MissingFamily(key.clone()));
        }
        let silhouette = self.read_image(key, SILHOUETTE_FILE)?;
        let markers = [
            self.read_image(key, MARKER_FILES[0])?,
            self.read_image(key, MARKER_FILES[1])?,
            self.read_image(key, MARKER_FILES[2])?,
        ];
        Ok(FamilyImageSet {
            silhouette,
            markers,
        })
    }
}

/// Image sets held in memory, keyed by family.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
    sets: HashMap<FamilyKey, FamilyImageSet>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        MemoryAssetSource::default()
    }

    pub fn insert(&mut self, key: FamilyKey, set: FamilyImageSet) {
        self.sets.insert(key, set);
    }

    pub fn with_set(mut self, key: &str, set: FamilyImageSet) -> Self {
        self.insert(FamilyKey::new(key), set);
        self
    }
}

impl AssetSource for MemoryAssetSource {
    fn keys(&self) -> Result<BTreeSet<FamilyKey>, ResourceLoadError> {
        Ok(self.sets.keys().cloned().collect())
    }

    fn load(&mut self, key: &FamilyKey) -> Result<FamilyImageSet, ResourceLoadError> {
        self.sets
            .get(key)
            .cloned()
            .ok_or_else(|| ResourceLoadError::MissingFamily(key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ascii_assets::{AsciiSprite, TerminalChar};
    use std::path::Path;
    use tempfile::tempdir;

    fn write_video(path: &Path, frames: usize) {
        let sprite = AsciiSprite {
            pixels: vec![
                TerminalChar {
                    chr: '#',
                    fg_color: None,
                    bg_color: None,
                };
                4
            ],
            width: 2,
            height: 2,
        };
        let video = AsciiVideo {
            width: 2,
            height: 2,
            frames: vec![sprite; frames],
        };
        let path = path.to_string_lossy().to_string();
        video.write_to_file(path.as_str()).unwrap();
    }

    fn write_family(root: &Path, family: &str, files: &[&str]) {
        let dir = root.join(family);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            write_video(&dir.join(file), 1);
        }
    }

    const ALL_FILES: [&str; 4] = [
        SILHOUETTE_FILE,
        MARKER_FILES[0],
        MARKER_FILES[1],
        MARKER_FILES[2],
    ];

    #[test]
    fn lists_families_with_a_silhouette() {
        let dir = tempdir().unwrap();
        write_family(dir.path(), "wolf", &ALL_FILES);
        write_family(dir.path(), "empty", &[]);
        fs::write(dir.path().join("readme.txt"), "families live here").unwrap();

        let keys = FileAssetSource::new(dir.path()).keys().unwrap();
        assert_eq!(keys, BTreeSet::from([FamilyKey::new("wolf")]));
    }

    #[test]
    fn loads_a_complete_family() {
        let dir = tempdir().unwrap();
        write_family(dir.path(), "wolf", &ALL_FILES);

        let set = FileAssetSource::new(dir.path())
            .load(&FamilyKey::new("wolf"))
            .unwrap();
        assert_eq!(set.silhouette.size(), (2, 2));
        assert_eq!(set.silhouette.pixel(1, 1).map(|c| c.chr), Some('#'));
    }

    #[test]
    fn missing_marker_is_a_decode_error() {
        let dir = tempdir().unwrap();
        write_family(
            dir.path(),
            "wolf",
            &[SILHOUETTE_FILE, MARKER_FILES[0], MARKER_FILES[2]],
        );

        let err = FileAssetSource::new(dir.path())
            .load(&FamilyKey::new("wolf"))
            .unwrap_err();
        match err {
            ResourceLoadError::Decode { path, .. } => assert!(path.ends_with(MARKER_FILES[1])),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn family_without_silhouette_is_missing() {
        let dir = tempdir().unwrap();
        let err = FileAssetSource::new(dir.path())
            .load(&FamilyKey::new("ghost"))
            .unwrap_err();
        assert!(matches!(err, ResourceLoadError::MissingFamily(_)));
    }

    #[test]
    fn video_without_frames_is_empty() {
        let video = AsciiVideo {
            width: 2,
            height: 2,
            frames: Vec::new(),
        };
        let err = ImageResource::from_video(video, &FamilyKey::new("wolf"), "silhouette.ascv")
            .unwrap_err();
        assert!(matches!(err, ResourceLoadError::EmptyImage { .. }));
    }
}
