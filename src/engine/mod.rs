pub mod command_sink;
pub use command_sink::{ChannelCommandSink, CommandSink};

use std::collections::HashMap;

use common_stdx::Point;
use log::{debug, error, info, warn};

use crate::{
    Acquired, AssetSource, CacheStats, DisplaySettings, EntityId, EntitySnapshot, FamilyKey,
    FileAssetSource, ImageLayer, JsonLayoutSource, LayoutRecord, LayoutRegistry, LayoutSource,
    OverlayConfig, Panel, PanelId, PanelMutation, PanelPool, PanelShell, PanelSurface,
    PlacedMarker, PoolStats, RenderedState, ResourceCache, ResourceHandle, diff,
    error::SurfaceError, place_marker, resolve_entity, select_visible,
};

/// What one pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub pass: u64,
    pub visible: usize,
    /// Display mutations sent to the surface.
    pub mutations: usize,
    pub created: usize,
    pub reused: usize,
    pub rebuilt: usize,
    pub released: usize,
    pub destroyed: usize,
    pub skipped_markers: usize,
    pub load_failures: usize,
    pub surface_errors: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineStats {
    pub passes: u64,
    pub max_shown: usize,
    pub panels: usize,
    pub idle_panels: usize,
    pub pool: PoolStats,
    pub cache: CacheStats,
    pub cached_families: usize,
    pub layout_revision: u64,
    pub last_pass: PassReport,
}

/// Owns every piece of overlay state and turns entity snapshots into surface
/// calls, one pass at a time.
pub struct OverlayEngine<S: PanelSurface> {
    config: OverlayConfig,
    default_family: FamilyKey,
    layouts: LayoutRegistry,
    cache: ResourceCache,
    pool: PanelPool,
    surface: S,
    commands: Option<Box<dyn CommandSink>>,
    pass: u64,
    pending_trim_to: Option<usize>,
    reload_requested: bool,
    last_pass: PassReport,
}

impl<S: PanelSurface> std::fmt::Debug for OverlayEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayEngine")
            .field("pass", &self.pass)
            .field("layouts", &self.layouts)
            .field("cache", &self.cache)
            .field("pool", &self.pool)
            .field("surface", &self.surface)
            .finish()
    }
}

impl<S: PanelSurface> OverlayEngine<S> {
    pub fn new(
        config: OverlayConfig,
        layouts: Box<dyn LayoutSource>,
        assets: Box<dyn AssetSource>,
        surface: S,
    ) -> Self {
        let default_family = config.default_family_key();
        info!(
            "Creating a new OverlayEngine (max_shown {}, default family `{default_family}`)",
            config.max_shown
        );
        OverlayEngine {
            layouts: LayoutRegistry::new(layouts, default_family.clone()),
            cache: ResourceCache::new(assets, config.cache_capacity),
            pool: PanelPool::new(config.max_shown),
            default_family,
            surface,
            commands: None,
            pass: 0,
            pending_trim_to: None,
            reload_requested: false,
            last_pass: PassReport::default(),
            config,
        }
    }

    /// Engine reading layouts and images from the directories named in `config`.
    pub fn from_config(config: OverlayConfig, surface: S) -> Self {
        let layouts = Box::new(JsonLayoutSource::new(&config.layout_root));
        let assets = Box::new(FileAssetSource::new(&config.asset_root));
        OverlayEngine::new(config, layouts, assets, surface)
    }

    pub fn with_command_sink(mut self, sink: Box<dyn CommandSink>) -> Self {
        self.commands = Some(sink);
        self
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn pool(&self) -> &PanelPool {
        &self.pool
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn layouts(&self) -> &LayoutRegistry {
        &self.layouts
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            passes: self.pass,
            max_shown: self.pool.max_shown(),
            panels: self.pool.len(),
            idle_panels: self.pool.idle_len(),
            pool: self.pool.stats(),
            cache: self.cache.stats(),
            cached_families: self.cache.len(),
            layout_revision: self.layouts.revision(),
            last_pass: self.last_pass.clone(),
        }
    }

    /// Rebuild everything on the next pass: panels are torn down, the image
    /// cache is emptied and layouts are re-read.
    pub fn request_reload(&mut self) {
        info!("reload requested, applying on the next pass");
        self.reload_requested = true;
    }

    /// A lowered limit trims idle panels down to `max_shown` on the next pass.
    pub fn set_max_shown(&mut self, max_shown: usize) {
        self.pending_trim_to = if self.pool.set_max_shown(max_shown) {
            Some(max_shown)
        } else {
            None
        };
    }

    /// Emit the target command for the entity shown on `panel`. Returns false
    /// when the panel is idle or unknown, or no sink is attached.
    pub fn click(&self, panel: PanelId) -> bool {
        let Some(entity) = self.pool.get(panel).and_then(Panel::entity) else {
            debug!("click on idle or unknown panel {panel} ignored");
            return false;
        };
        let Some(sink) = &self.commands else {
            warn!("panel {panel} clicked but no command sink is attached");
            return false;
        };
        let command = self.config.target_command_for(entity);
        info!("panel {panel} clicked, sending `{command}`");
        sink.send_command(command);
        true
    }

    pub fn click_slot(&self, slot: usize) -> bool {
        match self.pool.panel_in_slot(slot) {
            Some(panel) => self.click(panel),
            None => {
                debug!("click on empty slot {slot} ignored");
                false
            }
        }
    }

    fn resolve(&mut self, entity: &EntitySnapshot) -> FamilyKey {
        let layouts = &mut self.layouts;
        let cache = &self.cache;
        let resolution = resolve_entity(entity, &self.default_family, |key| {
            layouts.contains(key) || cache.contains(key)
        });
        debug!("entity {} resolved to {resolution:?}", entity.id);
        resolution.into_key()
    }

    /// One full update: select, resolve, release, acquire, diff and apply,
    /// trim, settle, flush. Never fails; problems are logged and counted.
    pub fn run_pass(&mut self, snapshots: Vec<EntitySnapshot>) -> PassReport {
        self.pass += 1;
        let mut report = PassReport {
            pass: self.pass,
            ..PassReport::default()
        };

        if self.reload_requested {
            self.tear_down(&mut report);
        }

        let visible = select_visible(snapshots, self.pool.max_shown());
        report.visible = visible.len();
        let resolved: Vec<(EntitySnapshot, FamilyKey)> = visible
            .into_iter()
            .map(|entity| {
                let family = self.resolve(&entity);
                (entity, family)
            })
            .collect();

        // release first so arriving entities can take over the freed panels
        let vanished: Vec<PanelId> = {
            let wanted: HashMap<EntityId, &FamilyKey> =
                resolved.iter().map(|(e, f)| (e.id, f)).collect();
            self.pool
                .in_use()
                .into_iter()
                .filter(|&id| {
                    !self.pool.get(id).is_some_and(|panel| {
                        panel
                            .entity()
                            .and_then(|entity| wanted.get(&entity))
                            .is_some_and(|family| *family == panel.family())
                    })
                })
                .collect()
        };
        for id in vanished {
            self.release_panel(id, &mut report);
        }

        for (entity, family) in &resolved {
            let layout = self.layouts.get(family);
            let id = match self.pool.panel_for(entity.id) {
                Some(id) => id,
                None => match self.bring_up(entity.id, family, &layout, &mut report) {
                    Some(id) => id,
                    None => continue,
                },
            };
            self.render(id, entity, &layout, &mut report);
        }

        let keep = self
            .pending_trim_to
            .take()
            .unwrap_or_else(|| self.pool.capacity());
        for id in self.pool.trim_idle(keep) {
            report.destroyed += 1;
            note_surface(&mut report, id, self.surface.destroy_shell(id));
        }

        let settled = self.cache.settle();
        if settled > 0 {
            debug!("cache settled, {settled} image sets evicted");
        }

        if let Err(e) = self.surface.flush() {
            report.surface_errors += 1;
            warn!("surface flush failed: {e}");
        }

        if report.mutations > 0 || report.created > 0 || report.destroyed > 0 {
            info!(
                "pass {}: {} visible, {} mutations, {} created, {} reused, {} rebuilt, {} released, {} destroyed",
                report.pass,
                report.visible,
                report.mutations,
                report.created,
                report.reused,
                report.rebuilt,
                report.released,
                report.destroyed
            );
        } else {
            debug!("pass {}: nothing changed", report.pass);
        }
        self.last_pass = report.clone();
        report
    }

    fn release_panel(&mut self, id: PanelId, report: &mut PassReport) {
        for handle in self.pool.release(id, self.pass) {
            self.cache.unsubscribe(handle);
        }
        report.released += 1;
        note_surface(report, id, self.surface.hide_shell(id));
    }

    fn bring_up(
        &mut self,
        entity: EntityId,
        family: &FamilyKey,
        layout: &LayoutRecord,
        report: &mut PassReport,
    ) -> Option<PanelId> {
        let shell = PanelShell::for_layout(family.clone(), layout);
        let acquired = self.pool.acquire(shell.clone());
        let id = acquired.id();
        match acquired {
            Acquired::Created(_) => {
                report.created += 1;
                note_surface(report, id, self.surface.create_shell(id, &shell));
            }
            Acquired::Reused(_) => report.reused += 1,
            Acquired::Rebuilt { previous, .. } => {
                report.rebuilt += 1;
                debug!(
                    "rebuilding shell of panel {id} from `{}` to `{family}`",
                    previous.family
                );
                note_surface(report, id, self.surface.destroy_shell(id));
                note_surface(report, id, self.surface.create_shell(id, &shell));
            }
        }

        let slot = self.pool.assign(id, entity)?;
        note_surface(report, id, self.surface.show_shell(id, slot));
        self.attach_silhouette(id, family, report);
        Some(id)
    }

    /// Handle to `family`'s images, or to the default family's when those
    /// cannot be loaded.
    fn load_images(
        &mut self,
        family: &FamilyKey,
        report: &mut PassReport,
    ) -> Option<ResourceHandle> {
        let err = match self.cache.get_or_load(family) {
            Ok(handle) => return Some(handle),
            Err(e) => e,
        };
        report.load_failures += 1;
        if family == &self.default_family {
            error!("images of the default family are unusable, drawing without images: {err}");
            return None;
        }
        warn!("{err}, falling back to `{}`", self.default_family);
        match self.cache.get_or_load(&self.default_family) {
            Ok(handle) => Some(handle),
            Err(e) => {
                report.load_failures += 1;
                error!("fallback images unusable too, drawing without images: {e}");
                None
            }
        }
    }

    fn attach_silhouette(&mut self, id: PanelId, family: &FamilyKey, report: &mut PassReport) {
        let Some(handle) = self.load_images(family, report) else {
            return;
        };
        let Some(panel) = self.pool.get_mut(id) else {
            return;
        };
        if !self.cache.subscribe(handle) {
            return;
        }
        panel.silhouette = Some(handle);
        if let Some(images) = self.cache.get(handle) {
            let result = self.surface.draw_image(
                id,
                ImageLayer::Silhouette,
                Point::new(0, 0),
                &images.silhouette,
            );
            note_surface(report, id, result);
        }
    }

    fn render(
        &mut self,
        id: PanelId,
        entity: &EntitySnapshot,
        layout: &LayoutRecord,
        report: &mut PassReport,
    ) {
        let epsilon = self.config.health_epsilon;
        let Some(panel) = self.pool.get_mut(id) else {
            return;
        };

        let next = RenderedState::from(entity);
        let mutations = diff(panel.rendered.as_ref(), &next, epsilon);
        if mutations.is_empty() {
            return;
        }
        let display = layout.display_settings(&self.config.display);
        let mut state = panel.rendered.take().unwrap_or_else(|| next.clone());

        for mutation in &mutations {
            state.apply(mutation);
            if !is_displayed(&display, mutation) {
                continue;
            }
            let result = match mutation {
                PanelMutation::SetName(name) => self.surface.set_name(id, name),
                PanelMutation::SetBorder(on) => self.surface.set_border(id, *on),
                PanelMutation::SetHealth(health) => {
                    self.surface.set_health(id, *health, display.health_bar_width)
                }
                PanelMutation::RemoveMarker(part) => match panel.markers.remove(part) {
                    Some(marker) => {
                        self.cache.unsubscribe(marker.handle);
                        self.surface.clear_image(id, &ImageLayer::Marker(part.clone()))
                    }
                    None => continue,
                },
                PanelMutation::AddMarker(part, rank) => {
                    let Some(base) = layout.coord(part) else {
                        debug!(
                            "layout of `{}` has no coordinate for `{part}`, marker skipped",
                            panel.family()
                        );
                        report.skipped_markers += 1;
                        continue;
                    };
                    let Some(handle) = panel.silhouette else {
                        continue;
                    };
                    if !self.cache.subscribe(handle) {
                        continue;
                    }
                    let Some(images) = self.cache.get(handle) else {
                        continue;
                    };
                    let scale = layout.scale * images.silhouette.native_scale();
                    let size = (layout.marker_size, layout.marker_size);
                    let placement = place_marker(base, scale, size);
                    panel.markers.insert(
                        part.clone(),
                        PlacedMarker {
                            rank: *rank,
                            top_left: placement.top_left,
                            handle,
                        },
                    );
                    self.surface.draw_image(
                        id,
                        ImageLayer::Marker(part.clone()),
                        placement.top_left,
                        images.marker(*rank),
                    )
                }
                PanelMutation::RemoveStatus(key) => self.surface.remove_status(id, key),
                PanelMutation::AddStatus(key) => {
                    self.surface.add_status(id, key, &display.glyph_for(key))
                }
            };
            report.mutations += 1;
            note_surface(report, id, result);
        }

        panel.rendered = Some(state);
    }

    fn tear_down(&mut self, report: &mut PassReport) {
        self.reload_requested = false;
        self.pending_trim_to = None;
        info!("reloading, tearing down {} panels", self.pool.len());
        for panel in self.pool.drain() {
            for handle in panel.subscriptions() {
                self.cache.unsubscribe(handle);
            }
            report.destroyed += 1;
            note_surface(report, panel.id(), self.surface.destroy_shell(panel.id()));
        }
        self.cache.clear();
        if let Err(e) = self.layouts.reload() {
            error!("layout reload failed, keeping the previous layouts: {e}");
        }
    }
}

fn is_displayed(display: &DisplaySettings, mutation: &PanelMutation) -> bool {
    match mutation {
        PanelMutation::SetName(_) => display.show_name,
        PanelMutation::SetHealth(_) => display.show_health,
        PanelMutation::AddStatus(_) | PanelMutation::RemoveStatus(_) => display.show_status,
        PanelMutation::SetBorder(_)
        | PanelMutation::AddMarker(..)
        | PanelMutation::RemoveMarker(_) => true,
    }
}

fn note_surface(report: &mut PassReport, panel: PanelId, result: Result<(), SurfaceError>) {
    if let Err(e) = result {
        report.surface_errors += 1;
        warn!("surface call for panel {panel} failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_fields_are_not_sent() {
        let display = DisplaySettings {
            show_name: false,
            show_status: false,
            ..DisplaySettings::default()
        };
        assert!(!is_displayed(&display, &PanelMutation::SetName("x".into())));
        assert!(!is_displayed(&display, &PanelMutation::AddStatus("stun".into())));
        assert!(is_displayed(&display, &PanelMutation::SetHealth(0.5)));
        assert!(is_displayed(&display, &PanelMutation::SetBorder(true)));
    }

    #[test]
    fn surface_errors_are_counted() {
        let mut report = PassReport::default();
        note_surface(&mut report, 3, Err(SurfaceError::UnknownPanel(3)));
        note_surface(&mut report, 3, Ok(()));
        assert_eq!(report.surface_errors, 1);
    }
}
