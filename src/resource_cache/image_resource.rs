use ascii_assets::{AsciiSprite, AsciiVideo, TerminalChar};

use crate::{FamilyKey, WoundRank, error::ResourceLoadError};

/// A decoded image plus the scale it was authored at. A silhouette drawn at
/// native scale 0.5 has its pixel grid at half the layout's base coordinates.
#[derive(Clone, Debug)]
pub struct ImageResource {
    sprite: AsciiSprite,
    native_scale: f32,
}

impl ImageResource {
    pub fn new(sprite: AsciiSprite, native_scale: f32) -> Self {
        ImageResource {
            sprite,
            native_scale,
        }
    }

    /// Take the first frame of a decoded video.
    pub fn from_video(
        video: AsciiVideo,
        key: &FamilyKey,
        path: &str,
    ) -> Result<Self, ResourceLoadError> {
        let sprite =
            video
                .frames
                .into_iter()
                .next()
                .ok_or_else(|| ResourceLoadError::EmptyImage {
                    key: key.clone(),
                    path: path.to_string(),
                })?;
        Ok(ImageResource::new(sprite, 1.0))
    }

    /// (width, height) in cells
    pub fn size(&self) -> (u16, u16) {
        (self.sprite.width as u16, self.sprite.height as u16)
    }

    pub fn native_scale(&self) -> f32 {
        self.native_scale
    }

    /// Cell at `(x, y)`, `None` when outside the image.
    pub fn pixel(&self, x: u16, y: u16) -> Option<&TerminalChar> {
        let (w, h) = self.size();
        if x >= w || y >= h {
            return None;
        }
        self.sprite.pixels.get(y as usize * w as usize + x as usize)
    }
}

/// Everything a panel of one family draws: the silhouette and one marker per rank.
#[derive(Clone, Debug)]
pub struct FamilyImageSet {
    pub silhouette: ImageResource,
    pub markers: [ImageResource; 3],
}

impl FamilyImageSet {
    pub fn marker(&self, rank: WoundRank) -> &ImageResource {
        &self.markers[rank.index()]
    }
}
