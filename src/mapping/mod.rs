//! Injective partial mapping from source bone names to target bone names.

pub mod auto;
pub mod names;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::RetargetError;
use crate::skeleton::Skeleton;

pub use auto::{auto_map, compatibility, AutoMapReport, CompatibilityReport, MappingInfo};

/// Current version of the mapping document
pub const MAPPING_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingOrigin {
    Auto,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub target: String,
    pub origin: MappingOrigin,
}

/// Source bone name to target bone name.
///
/// No two entries share a target. Manual entries are never replaced by
/// automatic ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoneMapping {
    entries: IndexMap<String, MappingEntry>,
}

/// Portable form: `{ "version": 1, "mapping": { "<source>": { "target", "origin" } } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDocument {
    pub version: u32,
    pub mapping: IndexMap<String, MappingEntry>,
}

impl BoneMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Target bone mapped from `source`
    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries.get(source).map(|e| e.target.as_str())
    }

    pub fn entry(&self, source: &str) -> Option<&MappingEntry> {
        self.entries.get(source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MappingEntry)> + '_ {
        self.entries.iter().map(|(s, e)| (s.as_str(), e))
    }

    pub fn source_for_target(&self, target: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, e)| e.target == target)
            .map(|(s, _)| s.as_str())
    }

    /// Add a user override. An automatic entry already holding `target` is
    /// evicted; a manual one makes this fail.
    pub fn add_manual(&mut self, source: &str, target: &str) -> bool {
        if source.is_empty() || target.is_empty() {
            return false;
        }
        if let Some(holder) = self.source_for_target(target) {
            if holder != source {
                if self.entries[holder].origin == MappingOrigin::Manual {
                    return false;
                }
                let holder = holder.to_string();
                self.entries.shift_remove(&holder);
            }
        }
        self.entries.insert(
            source.to_string(),
            MappingEntry {
                target: target.to_string(),
                origin: MappingOrigin::Manual,
            },
        );
        true
    }

    /// Add a heuristic entry unless `source` is manual or `target` is taken.
    pub(crate) fn insert_auto(&mut self, source: &str, target: &str) -> bool {
        if self.entry(source).is_some_and(|e| e.origin == MappingOrigin::Manual) {
            return false;
        }
        if self
            .source_for_target(target)
            .is_some_and(|holder| holder != source)
        {
            return false;
        }
        self.entries.insert(
            source.to_string(),
            MappingEntry {
                target: target.to_string(),
                origin: MappingOrigin::Auto,
            },
        );
        true
    }

    pub fn remove(&mut self, source: &str) -> Option<MappingEntry> {
        self.entries.shift_remove(source)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drop every automatic entry, keeping user overrides.
    pub fn clear_auto(&mut self) {
        self.entries.retain(|_, e| e.origin == MappingOrigin::Manual);
    }

    /// Re-order entries to follow the source skeleton; unknown names go last.
    pub(crate) fn sort_by_source(&mut self, source: &Skeleton) {
        let rank = |name: &str| source.find_bone(name).map_or(usize::MAX, |id| id.index());
        self.entries.sort_by(|a, _, b, _| rank(a).cmp(&rank(b)));
    }

    /// Every entry must name a source bone and a target bone.
    pub fn validate(&self, source: &Skeleton, target: &Skeleton) -> Result<(), RetargetError> {
        for (src, entry) in &self.entries {
            if source.find_bone(src).is_none() {
                return Err(RetargetError::UnknownBone(src.clone()));
            }
            if target.find_bone(&entry.target).is_none() {
                return Err(RetargetError::UnknownBone(entry.target.clone()));
            }
        }
        Ok(())
    }

    pub fn check_injective(&self) -> Result<(), RetargetError> {
        check_injective(&self.entries)
    }

    pub fn to_document(&self) -> MappingDocument {
        MappingDocument {
            version: MAPPING_VERSION,
            mapping: self.entries.clone(),
        }
    }

    pub fn from_document(document: MappingDocument) -> Result<Self, RetargetError> {
        if document.version != MAPPING_VERSION {
            return Err(RetargetError::UnsupportedVersion(document.version));
        }
        check_injective(&document.mapping)?;
        Ok(Self {
            entries: document.mapping,
        })
    }

    /// Serialize to a plain JSON dictionary
    pub fn to_value(&self) -> Result<serde_json::Value, RetargetError> {
        Ok(serde_json::to_value(self.to_document())?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, RetargetError> {
        Self::from_document(serde_json::from_value(value)?)
    }

    pub fn to_json_string(&self) -> Result<String, RetargetError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    pub fn from_json(json: &str) -> Result<Self, RetargetError> {
        Self::from_document(serde_json::from_str(json)?)
    }
}

fn check_injective(entries: &IndexMap<String, MappingEntry>) -> Result<(), RetargetError> {
    let mut seen: IndexMap<&str, &str> = IndexMap::with_capacity(entries.len());
    for (source, entry) in entries {
        if let Some(first) = seen.insert(entry.target.as_str(), source.as_str()) {
            return Err(RetargetError::NonInjectiveMapping {
                target: entry.target.clone(),
                first: first.to_string(),
                second: source.clone(),
            });
        }
    }
    Ok(())
}
