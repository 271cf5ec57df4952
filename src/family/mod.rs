use serde::{Deserialize, Serialize};

use crate::EntitySnapshot;

/// Identifier that selects both an image set and a layout record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyKey(String);

impl FamilyKey {
    /// Normalizes the raw string: trimmed, ASCII lowercased, inner whitespace
    /// collapsed to `_`.
    pub fn new(raw: &str) -> Self {
        let key = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
            .to_ascii_lowercase();
        FamilyKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for FamilyKey {
    fn from(value: &str) -> Self {
        FamilyKey::new(value)
    }
}

impl std::fmt::Display for FamilyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of resolving an entity to a family key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    ByNoun(FamilyKey),
    ByFamily(FamilyKey),
    Default(FamilyKey),
}

impl Resolution {
    pub fn key(&self) -> &FamilyKey {
        match self {
            Resolution::ByNoun(k) | Resolution::ByFamily(k) | Resolution::Default(k) => k,
        }
    }

    pub fn into_key(self) -> FamilyKey {
        match self {
            Resolution::ByNoun(k) | Resolution::ByFamily(k) | Resolution::Default(k) => k,
        }
    }
}

/// Resolve `noun`, then `family`, then `default`. The first key accepted by
/// `known` wins. Performs no I/O.
pub fn resolve<P>(noun: &str, family: &str, default: &FamilyKey, mut known: P) -> Resolution
where
    P: FnMut(&FamilyKey) -> bool,
{
    let noun_key = FamilyKey::new(noun);
    if !noun_key.is_empty() && known(&noun_key) {
        return Resolution::ByNoun(noun_key);
    }

    let family_key = FamilyKey::new(family);
    if !family_key.is_empty() && known(&family_key) {
        return Resolution::ByFamily(family_key);
    }

    Resolution::Default(default.clone())
}

pub fn resolve_entity<P>(entity: &EntitySnapshot, default: &FamilyKey, known: P) -> Resolution
where
    P: FnMut(&FamilyKey) -> bool,
{
    resolve(&entity.noun, &entity.family, default, known)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn known(keys: &[&str]) -> BTreeSet<FamilyKey> {
        keys.iter().map(|k| FamilyKey::new(k)).collect()
    }

    #[test]
    fn noun_wins_over_family() {
        let keys = known(&["valravn", "corvid"]);
        let default = FamilyKey::new("default");
        let res = resolve("Valravn", "corvid", &default, |k| keys.contains(k));
        assert_eq!(res, Resolution::ByNoun(FamilyKey::new("valravn")));
    }

    #[test]
    fn family_used_when_noun_unknown() {
        let keys = known(&["corvid"]);
        let default = FamilyKey::new("default");
        let res = resolve("raven", "Corvid", &default, |k| keys.contains(k));
        assert_eq!(res, Resolution::ByFamily(FamilyKey::new("corvid")));
    }

    #[test]
    fn falls_back_to_default() {
        let keys = known(&[]);
        let default = FamilyKey::new("default");
        let res = resolve("raven", "", &default, |k| keys.contains(k));
        assert_eq!(res, Resolution::Default(default.clone()));
        assert_eq!(res.key(), &default);
    }

    #[test]
    fn resolution_is_deterministic() {
        let keys = known(&["ice_troll", "troll"]);
        let default = FamilyKey::new("default");
        let first = resolve(" Ice  Troll", "troll", &default, |k| keys.contains(k));
        let second = resolve(" Ice  Troll", "troll", &default, |k| keys.contains(k));
        assert_eq!(first, second);
        assert_eq!(first.into_key().as_str(), "ice_troll");
    }
}
