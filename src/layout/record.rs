use std::collections::BTreeMap;

use common_stdx::Point;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::BodyPart;

/// Built-in record used when no layout exists for the default family.
pub static BUILTIN_DEFAULT_LAYOUT: Lazy<LayoutRecord> = Lazy::new(LayoutRecord::default);

/// Per-family display parameters. Coordinates are recorded at scale 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutRecord {
    #[serde(default = "default_panel_width")]
    pub panel_width: u16,
    #[serde(default = "default_panel_height")]
    pub panel_height: u16,
    #[serde(default = "default_marker_size")]
    pub marker_size: u16,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub coords: BTreeMap<BodyPart, (i32, i32)>,
    #[serde(default)]
    pub display: DisplayOverrides,
}

fn default_panel_width() -> u16 {
    20
}

fn default_panel_height() -> u16 {
    10
}

fn default_marker_size() -> u16 {
    1
}

fn default_scale() -> f32 {
    1.0
}

impl Default for LayoutRecord {
    fn default() -> Self {
        LayoutRecord {
            panel_width: default_panel_width(),
            panel_height: default_panel_height(),
            marker_size: default_marker_size(),
            scale: default_scale(),
            coords: BTreeMap::new(),
            display: DisplayOverrides::default(),
        }
    }
}

impl LayoutRecord {
    /// Base coordinate of `part` at scale 1.0.
    pub fn coord(&self, part: &BodyPart) -> Option<Point<i32>> {
        self.coords.get(part).map(|&(x, y)| Point::new(x, y))
    }

    /// Re-key coordinates through `BodyPart::new` and clamp nonsensical sizes.
    pub fn normalized(mut self) -> Self {
        self.coords = self
            .coords
            .into_iter()
            .map(|(part, xy)| (BodyPart::new(part.as_str()), xy))
            .collect();
        if !self.scale.is_finite() || self.scale <= 0.0 {
            self.scale = default_scale();
        }
        self.panel_width = self.panel_width.max(1);
        self.panel_height = self.panel_height.max(1);
        self
    }

    pub fn display_settings(&self, defaults: &DisplaySettings) -> DisplaySettings {
        self.display.apply(defaults)
    }
}

/// Optional per-family overrides of the global display settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayOverrides {
    #[serde(default)]
    pub show_name: Option<bool>,
    #[serde(default)]
    pub show_health: Option<bool>,
    #[serde(default)]
    pub show_status: Option<bool>,
    #[serde(default)]
    pub health_bar_width: Option<u16>,
    #[serde(default)]
    pub status_glyphs: Option<BTreeMap<String, String>>,
}

impl DisplayOverrides {
    pub fn apply(&self, defaults: &DisplaySettings) -> DisplaySettings {
        let mut status_glyphs = defaults.status_glyphs.clone();
        if let Some(extra) = &self.status_glyphs {
            status_glyphs.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        DisplaySettings {
            show_name: self.show_name.unwrap_or(defaults.show_name),
            show_health: self.show_health.unwrap_or(defaults.show_health),
            show_status: self.show_status.unwrap_or(defaults.show_status),
            health_bar_width: self.health_bar_width.unwrap_or(defaults.health_bar_width),
            status_glyphs,
        }
    }
}

/// Effective name / health bar / status display configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    #[serde(default = "default_true")]
    pub show_name: bool,
    #[serde(default = "default_true")]
    pub show_health: bool,
    #[serde(default = "default_true")]
    pub show_status: bool,
    #[serde(default = "default_health_bar_width")]
    pub health_bar_width: u16,
    #[serde(default)]
    pub status_glyphs: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_health_bar_width() -> u16 {
    16
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            show_name: true,
            show_health: true,
            show_status: true,
            health_bar_width: default_health_bar_width(),
            status_glyphs: BTreeMap::new(),
        }
    }
}

impl DisplaySettings {
    /// Glyph for a status key. Unmapped keys show their first three characters.
    pub fn glyph_for(&self, status: &str) -> String {
        match self.status_glyphs.get(status) {
            Some(glyph) => glyph.clone(),
            None => status.chars().take(3).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_record_with_defaults() {
        let record: LayoutRecord =
            serde_json::from_str(r#"{ "scale": 2.0, "coords": { "Head": [10, 20] } }"#).unwrap();
        let record = record.normalized();
        assert_eq!(record.panel_width, 20);
        assert_eq!(record.coord(&BodyPart::new("head")), Some(Point::new(10, 20)));
        assert_eq!(record.coord(&BodyPart::new("tail")), None);
    }

    #[test]
    fn invalid_scale_falls_back_to_one() {
        let record = LayoutRecord {
            scale: -3.0,
            ..LayoutRecord::default()
        }
        .normalized();
        assert_eq!(record.scale, 1.0);
    }

    #[test]
    fn overrides_fall_back_to_global_defaults() {
        let mut defaults = DisplaySettings::default();
        defaults
            .status_glyphs
            .insert("stunned".to_string(), "STN".to_string());
        let overrides = DisplayOverrides {
            show_name: Some(false),
            status_glyphs: Some(BTreeMap::from([("prone".to_string(), "PR".to_string())])),
            ..DisplayOverrides::default()
        };
        let settings = overrides.apply(&defaults);
        assert!(!settings.show_name);
        assert!(settings.show_health);
        assert_eq!(settings.glyph_for("stunned"), "STN");
        assert_eq!(settings.glyph_for("prone"), "PR");
        assert_eq!(settings.glyph_for("bleeding"), "ble");
    }
}
