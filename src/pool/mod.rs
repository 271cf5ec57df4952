pub mod panel;
pub use panel::{Panel, PanelId, PanelShell, PlacedMarker};

use std::collections::{BTreeSet, HashMap, VecDeque};

use log::{debug, info, warn};

use crate::{EntityId, FamilyKey, ResourceHandle};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub created: usize,
    pub reused: usize,
    pub rebuilt: usize,
    pub released: usize,
    pub destroyed: usize,
}

/// How `acquire` satisfied a request. The caller mirrors this on the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Acquired {
    /// An idle panel whose shell already fits.
    Reused(PanelId),
    /// A brand new panel; its shell must be created.
    Created(PanelId),
    /// An idle panel whose shell was built for `previous` and must be rebuilt.
    Rebuilt { id: PanelId, previous: PanelShell },
}

impl Acquired {
    pub fn id(&self) -> PanelId {
        match self {
            Acquired::Reused(id) | Acquired::Created(id) => *id,
            Acquired::Rebuilt { id, .. } => *id,
        }
    }
}

/// Reusable panels keyed by family.
///
/// Hard capacity is `max_shown * 2 + 1` panels overall and `max_shown + 1` per
/// family. Released panels go to a FIFO idle queue; trimming destroys the
/// panel that has been idle the longest first.
#[derive(Debug)]
pub struct PanelPool {
    panels: HashMap<PanelId, Panel>,
    by_family: HashMap<FamilyKey, Vec<PanelId>>,
    assigned: HashMap<EntityId, PanelId>,
    idle: VecDeque<PanelId>,
    next_id: PanelId,
    max_shown: usize,
    stats: PoolStats,
}

impl PanelPool {
    pub fn new(max_shown: usize) -> Self {
        info!("Creating a new PanelPool for {max_shown} visible entities");
        PanelPool {
            panels: HashMap::new(),
            by_family: HashMap::new(),
            assigned: HashMap::new(),
            idle: VecDeque::new(),
            next_id: 0,
            max_shown,
            stats: PoolStats::default(),
        }
    }

    pub fn max_shown(&self) -> usize {
        self.max_shown
    }

    pub fn capacity(&self) -> usize {
        self.max_shown * 2 + 1
    }

    pub fn family_share(&self) -> usize {
        self.max_shown + 1
    }

    /// Returns true when the limit was lowered.
    pub fn set_max_shown(&mut self, max_shown: usize) -> bool {
        let lowered = max_shown < self.max_shown;
        info!("max_shown changed from {} to {}", self.max_shown, max_shown);
        self.max_shown = max_shown;
        lowered
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn idle_len(&self) -> usize {
        self.idle.len()
    }

    pub fn in_use_len(&self) -> usize {
        self.assigned.len()
    }

    pub fn family_len(&self, family: &FamilyKey) -> usize {
        self.by_family.get(family).map(Vec::len).unwrap_or(0)
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn get(&self, id: PanelId) -> Option<&Panel> {
        self.panels.get(&id)
    }

    pub fn get_mut(&mut self, id: PanelId) -> Option<&mut Panel> {
        self.panels.get_mut(&id)
    }

    pub fn panel_for(&self, entity: EntityId) -> Option<PanelId> {
        self.assigned.get(&entity).copied()
    }

    pub fn panel_in_slot(&self, slot: usize) -> Option<PanelId> {
        self.assigned
            .values()
            .copied()
            .find(|id| self.panels.get(id).and_then(Panel::slot) == Some(slot))
    }

    /// Ids of assigned panels ordered by id.
    pub fn in_use(&self) -> Vec<PanelId> {
        let mut ids: Vec<PanelId> = self.assigned.values().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Idle panel ids, longest idle first.
    pub fn idle(&self) -> impl Iterator<Item = PanelId> + '_ {
        self.idle.iter().copied()
    }

    /// Hand out a panel for `shell.family`: an idle one of the same family,
    /// else a new one while under capacity, else the oldest idle panel of any
    /// family rebuilt for this one.
    pub fn acquire(&mut self, shell: PanelShell) -> Acquired {
        let same_family = self.idle.iter().position(|id| {
            self.panels
                .get(id)
                .is_some_and(|p| p.family() == &shell.family)
        });
        if let Some(pos) = same_family
            && let Some(id) = self.idle.remove(pos)
            && let Some(panel) = self.panels.get_mut(&id)
        {
            if panel.shell() == &shell {
                self.stats.reused += 1;
                debug!("reusing idle panel {id} for `{}`", shell.family);
                return Acquired::Reused(id);
            }
            let previous = panel.shell().clone();
            panel.rebuild(shell);
            self.stats.rebuilt += 1;
            return Acquired::Rebuilt { id, previous };
        }

        if self.len() < self.capacity() && self.family_len(&shell.family) < self.family_share() {
            return Acquired::Created(self.create(shell));
        }

        if let Some(id) = self.idle.pop_front() {
            return Acquired::Rebuilt {
                id,
                previous: self.move_to_family(id, shell),
            };
        }

        warn!(
            "panel pool exhausted ({} panels, capacity {}), creating an overflow panel",
            self.len(),
            self.capacity()
        );
        Acquired::Created(self.create(shell))
    }

    fn create(&mut self, shell: PanelShell) -> PanelId {
        let id = self.next_id;
        self.next_id += 1;
        debug!("creating panel {id} for `{}`", shell.family);
        self.by_family
            .entry(shell.family.clone())
            .or_default()
            .push(id);
        self.panels.insert(id, Panel::new(id, shell));
        self.stats.created += 1;
        id
    }

    fn move_to_family(&mut self, id: PanelId, shell: PanelShell) -> PanelShell {
        let Some(panel) = self.panels.get_mut(&id) else {
            return shell;
        };
        let previous = panel.shell().clone();
        if let Some(ids) = self.by_family.get_mut(&previous.family) {
            ids.retain(|&other| other != id);
        }
        self.by_family
            .entry(shell.family.clone())
            .or_default()
            .push(id);
        debug!(
            "rebuilding idle panel {id} from `{}` to `{}`",
            previous.family, shell.family
        );
        panel.rebuild(shell);
        self.stats.rebuilt += 1;
        previous
    }

    /// Bind a freshly acquired panel to `entity` and give it the lowest free slot.
    pub fn assign(&mut self, id: PanelId, entity: EntityId) -> Option<usize> {
        let used: BTreeSet<usize> = self
            .assigned
            .values()
            .filter_map(|pid| self.panels.get(pid).and_then(Panel::slot))
            .collect();
        let slot = (0..).find(|s| !used.contains(s)).unwrap_or(used.len());

        let panel = self.panels.get_mut(&id)?;
        if let Some(previous) = panel.entity() {
            self.assigned.remove(&previous);
        }
        panel.assign(entity, slot);
        self.assigned.insert(entity, id);
        Some(slot)
    }

    /// Return a panel to the idle queue. The returned handles are the cache
    /// subscriptions the panel held; the caller must unsubscribe them.
    pub fn release(&mut self, id: PanelId, pass: u64) -> Vec<ResourceHandle> {
        let Some(panel) = self.panels.get_mut(&id) else {
            return Vec::new();
        };
        if panel.is_idle() {
            return Vec::new();
        }
        if let Some(entity) = panel.entity() {
            self.assigned.remove(&entity);
        }
        let handles = panel.detach(pass);
        self.idle.push_back(id);
        self.stats.released += 1;
        debug!("panel {id} released to idle");
        handles
    }

    /// Destroy idle panels, longest idle first, until at most `keep` panels
    /// remain, then enforce the per-family share the same way.
    pub fn trim_idle(&mut self, keep: usize) -> Vec<PanelId> {
        let mut destroyed = Vec::new();
        while self.len() > keep {
            let Some(id) = self.idle.pop_front() else {
                break;
            };
            self.destroy(id);
            destroyed.push(id);
        }

        let share = self.family_share();
        let over: Vec<FamilyKey> = self
            .by_family
            .iter()
            .filter(|(_, ids)| ids.len() > share)
            .map(|(family, _)| family.clone())
            .collect();
        for family in over {
            while self.family_len(&family) > share {
                let oldest = self.idle.iter().position(|id| {
                    self.panels
                        .get(id)
                        .is_some_and(|p| p.family() == &family)
                });
                let Some(pos) = oldest else { break };
                if let Some(id) = self.idle.remove(pos) {
                    self.destroy(id);
                    destroyed.push(id);
                }
            }
        }

        if !destroyed.is_empty() {
            info!("trimmed idle panels {destroyed:?}");
        }
        destroyed
    }

    fn destroy(&mut self, id: PanelId) {
        if let Some(panel) = self.panels.remove(&id) {
            if let Some(ids) = self.by_family.get_mut(panel.family()) {
                ids.retain(|&other| other != id);
                if ids.is_empty() {
                    self.by_family.remove(panel.family());
                }
            }
            self.stats.destroyed += 1;
        }
    }

    /// Remove every panel, assigned or idle.
    pub fn drain(&mut self) -> Vec<Panel> {
        let drained: Vec<Panel> = self.panels.drain().map(|(_, p)| p).collect();
        self.by_family.clear();
        self.assigned.clear();
        self.idle.clear();
        self.stats.destroyed += drained.len();
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(family: &str) -> PanelShell {
        PanelShell {
            family: FamilyKey::new(family),
            width: 20,
            height: 10,
            marker_size: 1,
        }
    }

    #[test]
    fn idle_panel_of_same_family_is_reused() {
        let mut pool = PanelPool::new(2);
        let a = pool.acquire(shell("valravn")).id();
        pool.assign(a, 1);
        pool.release(a, 1);
        assert_eq!(pool.acquire(shell("valravn")), Acquired::Reused(a));
        assert_eq!(pool.stats().created, 1);
    }

    #[test]
    fn other_family_creates_while_under_capacity() {
        let mut pool = PanelPool::new(2);
        let a = pool.acquire(shell("valravn")).id();
        pool.assign(a, 1);
        pool.release(a, 1);
        assert!(matches!(pool.acquire(shell("kobold")), Acquired::Created(_)));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn full_pool_rebuilds_oldest_idle_panel() {
        let mut pool = PanelPool::new(1);
        // capacity 3, family share 2
        let ids: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|f| pool.acquire(shell(f)).id())
            .collect();
        for (n, id) in ids.iter().enumerate() {
            pool.assign(*id, n as EntityId);
        }
        for id in &ids {
            pool.release(*id, 1);
        }
        let acquired = pool.acquire(shell("d"));
        assert_eq!(
            acquired,
            Acquired::Rebuilt {
                id: ids[0],
                previous: shell("a"),
            }
        );
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.family_len(&FamilyKey::new("d")), 1);
        assert_eq!(pool.family_len(&FamilyKey::new("a")), 0);
    }

    #[test]
    fn slots_are_compact() {
        let mut pool = PanelPool::new(3);
        let a = pool.acquire(shell("x")).id();
        let b = pool.acquire(shell("x")).id();
        assert_eq!(pool.assign(a, 1), Some(0));
        assert_eq!(pool.assign(b, 2), Some(1));
        pool.release(a, 1);
        let c = pool.acquire(shell("y")).id();
        assert_eq!(pool.assign(c, 3), Some(0));
        assert_eq!(pool.panel_in_slot(0), Some(c));
    }

    #[test]
    fn trim_destroys_longest_idle_first() {
        let mut pool = PanelPool::new(5);
        let ids: Vec<_> = (0..5).map(|_| pool.acquire(shell("valravn")).id()).collect();
        for (n, id) in ids.iter().enumerate() {
            pool.assign(*id, n as EntityId);
        }
        assert!(pool.set_max_shown(2));
        pool.release(ids[3], 10);
        pool.release(ids[1], 11);
        pool.release(ids[4], 12);
        assert_eq!(pool.idle_len(), 3);

        let destroyed = pool.trim_idle(2);
        assert_eq!(destroyed, vec![ids[3], ids[1], ids[4]]);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.in_use(), vec![ids[0], ids[2]]);
    }

    #[test]
    fn release_returns_held_subscriptions() {
        let mut pool = PanelPool::new(1);
        let id = pool.acquire(shell("x")).id();
        pool.assign(id, 7);
        assert!(pool.release(id, 1).is_empty());
        assert!(pool.get(id).is_some_and(Panel::is_idle));
        assert_eq!(pool.get(id).and_then(Panel::idle_since), Some(1));
        assert_eq!(pool.panel_for(7), None);
    }
}
