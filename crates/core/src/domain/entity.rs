use std::collections::BTreeMap;

use uuid::Uuid;

/// Per-conversation cache of friendly entity names to the canonical
/// identifiers the automation service requires.
///
/// Refreshes merge-overwrite: a name collision replaces the identifier, and
/// no refresh ever removes an entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityMapping {
    entries: BTreeMap<String, String>,
}

impl EntityMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, id: impl Into<String>) {
        self.entries.insert(name.into(), id.into());
    }

    pub fn merge(&mut self, other: &EntityMapping) {
        for (name, id) in &other.entries {
            self.entries.insert(name.clone(), id.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, String)> for EntityMapping {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

/// Canonical identifiers are structurally UUIDs; display names are not.
/// This is the marker that keeps substitution idempotent.
pub fn is_canonical_id(value: &str) -> bool {
    Uuid::parse_str(value.trim()).is_ok()
}
