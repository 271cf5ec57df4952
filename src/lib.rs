pub mod entity;
pub use entity::{
    BodyPart, EntityFeed, EntityId, EntitySnapshot, WoundRank, select_visible,
};

pub mod family;
pub use family::{FamilyKey, Resolution, resolve, resolve_entity};

pub mod resource_cache;
pub use resource_cache::{
    AssetSource, CacheStats, DEFAULT_CACHE_CAPACITY, FamilyImageSet, FileAssetSource,
    ImageResource, MemoryAssetSource, ResourceCache, ResourceHandle,
};

pub mod layout;
pub use layout::{
    BUILTIN_DEFAULT_LAYOUT, DisplayOverrides, DisplaySettings, JsonLayoutSource, LayoutRecord,
    LayoutRegistry, LayoutSource, MemoryLayoutSource,
};

pub mod placement;
pub use placement::{MarkerPlacement, place_marker};

pub mod differ;
pub use differ::{DEFAULT_HEALTH_EPSILON, PanelMutation, RenderedState, diff};

pub mod pool;
pub use pool::{Acquired, Panel, PanelId, PanelPool, PanelShell, PlacedMarker, PoolStats};

pub mod surface;
#[cfg(feature = "terminal_surface")]
pub use surface::TerminalSurface;
pub use surface::{ImageLayer, PanelSurface, RecordingSurface, SharedCallLog, SurfaceCall};

pub mod engine;
pub use engine::{ChannelCommandSink, CommandSink, EngineStats, OverlayEngine, PassReport};

pub mod scheduler;
pub use scheduler::{OverlayCommand, OverlayHandle, drain_missed_ticks, start_overlay};

pub mod config;
pub use config::OverlayConfig;

pub mod term_utils;
pub use term_utils::{init_terminal, restore_terminal};

pub mod error;
pub use error::AppError;
