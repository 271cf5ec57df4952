use std::fs;
use std::path::Path;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_CACHE_CAPACITY, DEFAULT_HEALTH_EPSILON, DisplaySettings, EntityId, FamilyKey,
    error::ConfigError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Milliseconds between two passes. Default: 250.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Panels shown at once. Default: 5.
    #[serde(default = "default_max_shown")]
    pub max_shown: usize,
    /// Unpinned image sets kept decoded. Default: 15.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_family")]
    pub default_family: String,
    /// Smallest health change that redraws the bar. Default: 0.02.
    #[serde(default = "default_health_epsilon")]
    pub health_epsilon: f32,
    #[serde(default = "default_asset_root")]
    pub asset_root: String,
    #[serde(default = "default_layout_root")]
    pub layout_root: String,
    /// `{id}` is replaced by the clicked entity's id.
    #[serde(default = "default_target_command")]
    pub target_command: String,
    #[serde(default)]
    pub display: DisplaySettings,
}

fn default_interval_ms() -> u64 {
    250
}

fn default_max_shown() -> usize {
    5
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_family() -> String {
    "default".to_string()
}

fn default_health_epsilon() -> f32 {
    DEFAULT_HEALTH_EPSILON
}

fn default_asset_root() -> String {
    "assets/families".to_string()
}

fn default_layout_root() -> String {
    "assets/layouts".to_string()
}

fn default_target_command() -> String {
    "target #{id}".to_string()
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig {
            interval_ms: default_interval_ms(),
            max_shown: default_max_shown(),
            cache_capacity: default_cache_capacity(),
            default_family: default_family(),
            health_epsilon: default_health_epsilon(),
            asset_root: default_asset_root(),
            layout_root: default_layout_root(),
            target_command: default_target_command(),
            display: DisplaySettings::default(),
        }
    }
}

impl OverlayConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::FailedReadingPath {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        let config: OverlayConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Malformed {
                path: path.to_string_lossy().to_string(),
                source,
            })?;
        config.validate()?;
        info!("loaded overlay config from {path:?}");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "interval_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.cache_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.health_epsilon.is_finite() || self.health_epsilon < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "health_epsilon",
                reason: format!("{} is not a non-negative number", self.health_epsilon),
            });
        }
        if FamilyKey::new(&self.default_family).is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "default_family",
                reason: "must not be blank".to_string(),
            });
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn default_family_key(&self) -> FamilyKey {
        FamilyKey::new(&self.default_family)
    }

    pub fn target_command_for(&self, entity: EntityId) -> String {
        self.target_command.replace("{id}", &entity.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let config: OverlayConfig = serde_json::from_str(r#"{ "max_shown": 3 }"#).unwrap();
        assert_eq!(config.max_shown, 3);
        assert_eq!(config.interval_ms, 250);
        assert_eq!(config.cache_capacity, 15);
        assert_eq!(config.default_family, "default");
        assert!((config.health_epsilon - 0.02).abs() < f32::EPSILON);
        assert!(config.display.show_health);
    }

    #[test]
    fn target_command_substitutes_id() {
        let config = OverlayConfig::default();
        assert_eq!(config.target_command_for(4711), "target #4711");
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = OverlayConfig {
            interval_ms: 0,
            ..OverlayConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn blank_default_family_is_rejected() {
        let config = OverlayConfig {
            default_family: "   ".to_string(),
            ..OverlayConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = OverlayConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::FailedReadingPath { .. }));
    }
}
