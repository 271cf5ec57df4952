use std::collections::{BTreeMap, BTreeSet};

use crate::{BodyPart, EntitySnapshot, WoundRank};

pub const DEFAULT_HEALTH_EPSILON: f32 = 0.02;

/// What a panel currently shows, compared field by field against the next tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedState {
    pub name: String,
    pub is_target: bool,
    pub health: f32,
    pub wounds: BTreeMap<BodyPart, WoundRank>,
    pub statuses: BTreeSet<String>,
}

impl From<&EntitySnapshot> for RenderedState {
    fn from(entity: &EntitySnapshot) -> Self {
        RenderedState {
            name: entity.name.clone(),
            is_target: entity.is_target,
            health: entity.health,
            wounds: entity.wounds.clone(),
            statuses: entity.statuses.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelMutation {
    SetName(String),
    SetBorder(bool),
    SetHealth(f32),
    RemoveMarker(BodyPart),
    AddMarker(BodyPart, WoundRank),
    RemoveStatus(String),
    AddStatus(String),
}

impl RenderedState {
    /// Fold a mutation into the remembered state.
    pub fn apply(&mut self, mutation: &PanelMutation) {
        match mutation {
            PanelMutation::SetName(name) => self.name = name.clone(),
            PanelMutation::SetBorder(on) => self.is_target = *on,
            PanelMutation::SetHealth(h) => self.health = *h,
            PanelMutation::RemoveMarker(part) => {
                self.wounds.remove(part);
            }
            PanelMutation::AddMarker(part, rank) => {
                self.wounds.insert(part.clone(), *rank);
            }
            PanelMutation::RemoveStatus(key) => {
                self.statuses.remove(key);
            }
            PanelMutation::AddStatus(key) => {
                self.statuses.insert(key.clone());
            }
        }
    }
}

/// Minimal set of mutations turning `previous` into `next`.
///
/// Without a previous state everything is drawn. Health only changes when it
/// moved at least `epsilon` away from the last rendered value. Wounds are
/// compared as `(part, rank)` pairs, so a rank change removes and re-adds that
/// one marker. Removals come before additions.
pub fn diff(
    previous: Option<&RenderedState>,
    next: &RenderedState,
    epsilon: f32,
) -> Vec<PanelMutation> {
    let Some(prev) = previous else {
        let mut out = vec![
            PanelMutation::SetName(next.name.clone()),
            PanelMutation::SetBorder(next.is_target),
            PanelMutation::SetHealth(next.health),
        ];
        out.extend(
            next.wounds
                .iter()
                .map(|(part, rank)| PanelMutation::AddMarker(part.clone(), *rank)),
        );
        out.extend(
            next.statuses
                .iter()
                .map(|s| PanelMutation::AddStatus(s.clone())),
        );
        return out;
    };

    let mut out = Vec::new();

    if prev.name != next.name {
        out.push(PanelMutation::SetName(next.name.clone()));
    }
    if prev.is_target != next.is_target {
        out.push(PanelMutation::SetBorder(next.is_target));
    }
    if (prev.health - next.health).abs() >= epsilon {
        out.push(PanelMutation::SetHealth(next.health));
    }

    for (part, rank) in &prev.wounds {
        if next.wounds.get(part) != Some(rank) {
            out.push(PanelMutation::RemoveMarker(part.clone()));
        }
    }
    for (part, rank) in &next.wounds {
        if prev.wounds.get(part) != Some(rank) {
            out.push(PanelMutation::AddMarker(part.clone(), *rank));
        }
    }

    for status in prev.statuses.difference(&next.statuses) {
        out.push(PanelMutation::RemoveStatus(status.clone()));
    }
    for status in next.statuses.difference(&prev.statuses) {
        out.push(PanelMutation::AddStatus(status.clone()));
    }

    out
}
