use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::filter::color_filter::ColorFilter;

/// Target of color filter overrides (the render tree, or a test double).
pub trait ColorFilterTarget {
    /// Set (`Some`) or clear (`None`) the filter on every node matching `layer`/`content`.
    ///
    /// `None` for `layer` matches every node; `None` for `content` matches the whole layer.
    /// Returns how many nodes matched; zero is not an error.
    fn apply_color_filter(
        &mut self,
        layer: Option<&str>,
        content: Option<&str>,
        filter: Option<&ColorFilter>,
    ) -> usize;
}

/// Override key: both absent is global, layer only is whole-layer, both is one content item.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilterKey {
    /// Layer name, or `None` for every layer.
    pub layer: Option<String>,
    /// Content name inside the layer, or `None` for the whole layer.
    pub content: Option<String>,
}

impl FilterKey {
    /// Build a key from borrowed names.
    pub fn new(layer: Option<&str>, content: Option<&str>) -> Self {
        Self {
            layer: layer.map(str::to_owned),
            content: content.map(str::to_owned),
        }
    }

    fn specificity(&self) -> (bool, bool) {
        (self.content.is_some(), self.layer.is_some())
    }
}

/// One stored override record. Equality and hashing only consider the key.
#[derive(Clone, Debug)]
pub struct ColorFilterOverride {
    /// Which nodes the record targets.
    pub key: FilterKey,
    /// Filter to apply, or `None` for an explicit clear.
    pub filter: Option<ColorFilter>,
}

impl PartialEq for ColorFilterOverride {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ColorFilterOverride {}

impl Hash for ColorFilterOverride {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Override records owned by a player and replayed onto every rebuilt tree.
#[derive(Debug, Default)]
pub struct ColorFilterRegistry {
    records: BTreeMap<FilterKey, Option<ColorFilter>>,
}

impl ColorFilterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or remove a record, forwarding the change to `target` when one exists.
    ///
    /// A `None` filter for an existing key removes the record; otherwise the record for that key
    /// is inserted or replaced. When other records remain, `target` is rebuilt from the full
    /// record set so it always matches what [`Self::replay`] would produce.
    pub fn set(
        &mut self,
        layer: Option<&str>,
        content: Option<&str>,
        filter: Option<ColorFilter>,
        target: Option<&mut dyn ColorFilterTarget>,
    ) {
        let key = FilterKey::new(layer, content);
        if filter.is_none() && self.records.contains_key(&key) {
            self.records.remove(&key);
        } else {
            self.records.insert(key.clone(), filter.clone());
        }

        let Some(target) = target else {
            return;
        };
        let matched = target.apply_color_filter(layer, content, filter.as_ref());
        if matched == 0 {
            tracing::debug!(?layer, ?content, "color filter override matched no nodes");
        }
        if self.records.keys().any(|k| *k != key) {
            target.apply_color_filter(None, None, None);
            self.replay(target);
        }
    }

    /// Drop every record and issue a global clear to `target`.
    pub fn clear(&mut self, target: Option<&mut dyn ColorFilterTarget>) {
        self.records.clear();
        if let Some(target) = target {
            target.apply_color_filter(None, None, None);
        }
    }

    /// Apply every stored record to `target`, least specific first.
    ///
    /// Global records go first, then whole-layer records, then content records; a more specific
    /// record therefore always wins over a broader one regardless of assignment order.
    pub fn replay(&self, target: &mut dyn ColorFilterTarget) {
        for (key, filter) in self.ordered() {
            target.apply_color_filter(key.layer.as_deref(), key.content.as_deref(), filter.as_ref());
        }
    }

    fn ordered(&self) -> Vec<(&FilterKey, &Option<ColorFilter>)> {
        let mut records: Vec<_> = self.records.iter().collect();
        records.sort_by_key(|(key, _)| key.specificity());
        records
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record stored for a key, if any.
    pub fn get(&self, layer: Option<&str>, content: Option<&str>) -> Option<ColorFilterOverride> {
        let key = FilterKey::new(layer, content);
        self.records.get(&key).map(|filter| ColorFilterOverride {
            key,
            filter: filter.clone(),
        })
    }

    /// Snapshot of all records in replay order.
    pub fn snapshot(&self) -> Vec<ColorFilterOverride> {
        self.ordered()
            .into_iter()
            .map(|(key, filter)| ColorFilterOverride {
                key: key.clone(),
                filter: filter.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/registry.rs"]
mod tests;
