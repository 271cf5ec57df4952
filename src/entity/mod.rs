use std::collections::{BTreeMap, BTreeSet, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

pub type EntityId = u64;

/// Name of a body part as reported by the game, e.g. `"head"` or `"left_arm"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyPart(String);

impl BodyPart {
    pub fn new(name: &str) -> Self {
        BodyPart(name.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BodyPart {
    fn from(value: &str) -> Self {
        BodyPart::new(value)
    }
}

impl std::fmt::Display for BodyPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WoundRank {
    Rank1,
    Rank2,
    Rank3,
}

impl WoundRank {
    pub const ALL: [WoundRank; 3] = [WoundRank::Rank1, WoundRank::Rank2, WoundRank::Rank3];

    /// Maps a raw severity to a rank. Zero means "no wound", anything above 3
    /// is treated as the worst rank.
    pub fn from_severity(severity: u8) -> Option<WoundRank> {
        match severity {
            0 => None,
            1 => Some(WoundRank::Rank1),
            2 => Some(WoundRank::Rank2),
            _ => Some(WoundRank::Rank3),
        }
    }

    pub fn index(self) -> usize {
        match self {
            WoundRank::Rank1 => 0,
            WoundRank::Rank2 => 1,
            WoundRank::Rank3 => 2,
        }
    }
}

/// One tracked entity as reported by the feed for a single tick.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub name: String,
    pub noun: String,
    pub family: String,
    /// Remaining health in `[0, 1]`. Values outside that range are clamped by `sanitized`.
    pub health: f32,
    pub wounds: BTreeMap<BodyPart, WoundRank>,
    pub statuses: BTreeSet<String>,
    pub is_target: bool,
}

impl EntitySnapshot {
    pub fn new(id: EntityId, name: &str, noun: &str, family: &str) -> Self {
        EntitySnapshot {
            id,
            name: name.to_string(),
            noun: noun.to_string(),
            family: family.to_string(),
            health: 1.0,
            wounds: BTreeMap::new(),
            statuses: BTreeSet::new(),
            is_target: false,
        }
    }

    pub fn with_health(mut self, health: f32) -> Self {
        self.health = health;
        self
    }

    pub fn with_wound(mut self, part: &str, rank: WoundRank) -> Self {
        self.wounds.insert(BodyPart::new(part), rank);
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.statuses.insert(status.to_string());
        self
    }

    pub fn targeted(mut self) -> Self {
        self.is_target = true;
        self
    }

    /// Clamp out-of-range values instead of dropping the record.
    pub fn sanitized(mut self) -> Self {
        if self.health.is_nan() {
            warn!("entity {} reported a NaN health fraction", self.id);
            self.health = 0.0;
        } else if !(0.0..=1.0).contains(&self.health) {
            debug!(
                "clamping health {} of entity {} into [0, 1]",
                self.health, self.id
            );
            self.health = self.health.clamp(0.0, 1.0);
        }
        self
    }
}

/// The live game-data source, polled once per pass on the rendering thread.
pub trait EntityFeed: Send {
    fn snapshot(&mut self) -> Vec<EntitySnapshot>;
}

impl<F> EntityFeed for F
where
    F: FnMut() -> Vec<EntitySnapshot> + Send,
{
    fn snapshot(&mut self) -> Vec<EntitySnapshot> {
        self()
    }
}

/// Bound a tick's snapshot set to `max_shown` entries.
///
/// The first entity flagged as the current target is always kept; the rest are
/// taken in the order the feed reported them. Duplicate ids keep their first
/// occurrence. The returned list preserves feed order.
pub fn select_visible(snapshots: Vec<EntitySnapshot>, max_shown: usize) -> Vec<EntitySnapshot> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(snapshots.len());
    for snapshot in snapshots {
        if seen.insert(snapshot.id) {
            unique.push(snapshot.sanitized());
        } else {
            warn!("feed reported entity {} twice in one tick", snapshot.id);
        }
    }

    if unique.len() <= max_shown {
        return unique;
    }
    if max_shown == 0 {
        return Vec::new();
    }

    let target_idx = unique.iter().position(|s| s.is_target);
    let mut budget = match target_idx {
        Some(_) => max_shown - 1,
        None => max_shown,
    };

    unique
        .into_iter()
        .enumerate()
        .filter_map(|(idx, snapshot)| {
            if Some(idx) == target_idx {
                Some(snapshot)
            } else if budget > 0 {
                budget -= 1;
                Some(snapshot)
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: EntityId) -> EntitySnapshot {
        EntitySnapshot::new(id, &format!("e{id}"), "wolf", "canine")
    }

    #[test]
    fn out_of_range_health_is_clamped() {
        assert_eq!(entity(1).with_health(1.7).sanitized().health, 1.0);
        assert_eq!(entity(1).with_health(-0.2).sanitized().health, 0.0);
        assert_eq!(entity(1).with_health(f32::NAN).sanitized().health, 0.0);
        assert_eq!(entity(1).with_health(0.4).sanitized().health, 0.4);
    }

    #[test]
    fn severity_maps_to_rank() {
        assert_eq!(WoundRank::from_severity(0), None);
        assert_eq!(WoundRank::from_severity(2), Some(WoundRank::Rank2));
        assert_eq!(WoundRank::from_severity(9), Some(WoundRank::Rank3));
    }

    #[test]
    fn truncation_keeps_feed_order() {
        let visible = select_visible((1..=5).map(entity).collect(), 3);
        let ids: Vec<_> = visible.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn truncation_keeps_current_target() {
        let mut all: Vec<_> = (1..=5).map(entity).collect();
        all[4].is_target = true;
        let visible = select_visible(all, 3);
        let ids: Vec<_> = visible.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 5]);
    }

    #[test]
    fn duplicates_are_dropped() {
        let visible = select_visible(vec![entity(1), entity(1), entity(2)], 5);
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn zero_max_shown_shows_nothing() {
        assert!(select_visible(vec![entity(1).targeted()], 0).is_empty());
    }

    #[test]
    fn body_part_names_are_normalized() {
        assert_eq!(BodyPart::new(" Head "), BodyPart::new("head"));
    }
}
