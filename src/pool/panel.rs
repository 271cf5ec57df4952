use std::collections::BTreeMap;

use common_stdx::Point;

use crate::{
    BodyPart, EntityId, FamilyKey, LayoutRecord, RenderedState, ResourceHandle, WoundRank,
};

pub type PanelId = usize;

/// Geometry a panel's widget tree is built for. Two panels with equal shells
/// are interchangeable without rebuilding.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelShell {
    pub family: FamilyKey,
    pub width: u16,
    pub height: u16,
    pub marker_size: u16,
}

impl PanelShell {
    pub fn for_layout(family: FamilyKey, layout: &LayoutRecord) -> Self {
        PanelShell {
            family,
            width: layout.panel_width,
            height: layout.panel_height,
            marker_size: layout.marker_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedMarker {
    pub rank: WoundRank,
    pub top_left: Point<i32>,
    pub handle: ResourceHandle,
}

#[derive(Debug)]
pub struct Panel {
    id: PanelId,
    shell: PanelShell,
    entity: Option<EntityId>,
    slot: Option<usize>,
    idle_since: Option<u64>,
    pub(crate) rendered: Option<RenderedState>,
    pub(crate) silhouette: Option<ResourceHandle>,
    pub(crate) markers: BTreeMap<BodyPart, PlacedMarker>,
}

impl Panel {
    pub(crate) fn new(id: PanelId, shell: PanelShell) -> Self {
        Panel {
            id,
            shell,
            entity: None,
            slot: None,
            idle_since: None,
            rendered: None,
            silhouette: None,
            markers: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn family(&self) -> &FamilyKey {
        &self.shell.family
    }

    pub fn shell(&self) -> &PanelShell {
        &self.shell
    }

    pub fn entity(&self) -> Option<EntityId> {
        self.entity
    }

    pub fn slot(&self) -> Option<usize> {
        self.slot
    }

    pub fn is_idle(&self) -> bool {
        self.entity.is_none()
    }

    pub fn idle_since(&self) -> Option<u64> {
        self.idle_since
    }

    pub fn rendered(&self) -> Option<&RenderedState> {
        self.rendered.as_ref()
    }

    pub fn markers(&self) -> &BTreeMap<BodyPart, PlacedMarker> {
        &self.markers
    }

    pub fn silhouette(&self) -> Option<ResourceHandle> {
        self.silhouette
    }

    /// Every cache subscription this panel holds, one per displayed image.
    pub fn subscriptions(&self) -> Vec<ResourceHandle> {
        self.silhouette
            .iter()
            .copied()
            .chain(self.markers.values().map(|m| m.handle))
            .collect()
    }

    pub(crate) fn assign(&mut self, entity: EntityId, slot: usize) {
        self.entity = Some(entity);
        self.slot = Some(slot);
        self.idle_since = None;
    }

    /// Unassign and hand back the subscriptions so the cache can unpin them.
    pub(crate) fn detach(&mut self, pass: u64) -> Vec<ResourceHandle> {
        let handles = self.subscriptions();
        self.entity = None;
        self.slot = None;
        self.idle_since = Some(pass);
        self.rendered = None;
        self.silhouette = None;
        self.markers.clear();
        handles
    }

    pub(crate) fn rebuild(&mut self, shell: PanelShell) {
        self.shell = shell;
        self.rendered = None;
    }
}
