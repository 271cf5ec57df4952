#![allow(dead_code)]

use ascii_assets::{AsciiSprite, TerminalChar};
use ltoverlay::{
    BodyPart, DisplayOverrides, EntitySnapshot, FamilyImageSet, ImageResource, LayoutRecord,
    MemoryAssetSource, MemoryLayoutSource, OverlayConfig, OverlayEngine, RecordingSurface,
};

fn sprite(chr: char, width: usize, height: usize) -> AsciiSprite {
    AsciiSprite {
        pixels: vec![
            TerminalChar {
                chr,
                fg_color: None,
                bg_color: None,
            };
            width * height
        ],
        width: width as _,
        height: height as _,
    }
}

pub fn image(chr: char, width: usize, height: usize) -> ImageResource {
    ImageResource::new(sprite(chr, width, height), 1.0)
}

pub fn image_set(chr: char) -> FamilyImageSet {
    FamilyImageSet {
        silhouette: image(chr, 6, 6),
        markers: [image('1', 1, 1), image('2', 1, 1), image('3', 1, 1)],
    }
}

/// Like `image_set`, with a silhouette authored at `native_scale`.
pub fn scaled_image_set(chr: char, native_scale: f32) -> FamilyImageSet {
    FamilyImageSet {
        silhouette: ImageResource::new(sprite(chr, 6, 6), native_scale),
        ..image_set(chr)
    }
}

pub fn layout(coords: &[(&str, (i32, i32))]) -> LayoutRecord {
    LayoutRecord {
        panel_width: 6,
        panel_height: 6,
        coords: coords
            .iter()
            .map(|(part, xy)| (BodyPart::new(part), *xy))
            .collect(),
        ..LayoutRecord::default()
    }
}

/// `default`, `wolf` and `bird` have layouts and images. `ghost` only has a
/// layout.
pub fn layouts() -> MemoryLayoutSource {
    MemoryLayoutSource::new()
        .with_record("default", layout(&[("head", (3, 1)), ("chest", (3, 3))]))
        .with_record("wolf", layout(&[("head", (1, 1)), ("chest", (3, 3))]))
        .with_record(
            "bird",
            LayoutRecord {
                scale: 2.0,
                display: DisplayOverrides {
                    show_status: Some(false),
                    ..DisplayOverrides::default()
                },
                ..layout(&[("head", (10, 20))])
            },
        )
        .with_record("ghost", layout(&[("head", (2, 2))]))
}

pub fn assets() -> MemoryAssetSource {
    MemoryAssetSource::new()
        .with_set("default", image_set('.'))
        .with_set("wolf", image_set('#'))
        .with_set("bird", image_set('^'))
}

pub fn config(max_shown: usize) -> OverlayConfig {
    OverlayConfig {
        max_shown,
        ..OverlayConfig::default()
    }
}

pub fn engine(max_shown: usize) -> OverlayEngine<RecordingSurface> {
    OverlayEngine::new(
        config(max_shown),
        Box::new(layouts()),
        Box::new(assets()),
        RecordingSurface::new(),
    )
}

pub fn wolf(id: u64) -> EntitySnapshot {
    EntitySnapshot::new(id, &format!("Wolf {id}"), "grey wolf", "wolf").with_health(1.0)
}

pub fn valravn(id: u64, health: f32) -> EntitySnapshot {
    EntitySnapshot::new(id, "Valravn", "valravn", "bird").with_health(health)
}

pub fn ghost(id: u64) -> EntitySnapshot {
    EntitySnapshot::new(id, "Ghost", "ghost", "spirit").with_health(1.0)
}
