//! One forward map plus its exact reverse index.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

/// `entity -> volume` together with `volume -> {entity}`.
///
/// Both maps change together in every method. A volume key is present in
/// the reverse map only while at least one entity is bound to it.
#[derive(Debug, Clone)]
pub(crate) struct BindingIndex<K> {
    forward: HashMap<K, String>,
    reverse: HashMap<String, HashSet<K>>,
}

impl<K> Default for BindingIndex<K> {
    fn default() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash + Ord> BindingIndex<K> {
    /// Bind `entity` to `volume_id`, moving it off any previous volume.
    ///
    /// Returns the volume the entity was moved from, if different.
    pub fn bind(&mut self, entity: K, volume_id: &str) -> Option<String> {
        let previous = self.forward.insert(entity, volume_id.to_string());
        let moved_from = match previous {
            Some(old) if old != volume_id => {
                self.detach(entity, &old);
                Some(old)
            }
            _ => None,
        };
        self.reverse
            .entry(volume_id.to_string())
            .or_default()
            .insert(entity);
        moved_from
    }

    /// Remove the binding of `entity`, returning the volume it was bound to.
    pub fn unbind(&mut self, entity: K) -> Option<String> {
        let volume_id = self.forward.remove(&entity)?;
        self.detach(entity, &volume_id);
        Some(volume_id)
    }

    fn detach(&mut self, entity: K, volume_id: &str) {
        if let Some(entities) = self.reverse.get_mut(volume_id) {
            entities.remove(&entity);
            if entities.is_empty() {
                self.reverse.remove(volume_id);
            }
        }
    }

    pub fn volume_of(&self, entity: K) -> Option<&str> {
        self.forward.get(&entity).map(String::as_str)
    }

    pub fn has_volume(&self, volume_id: &str) -> bool {
        self.reverse.contains_key(volume_id)
    }

    /// Entities bound to `volume_id`, sorted.
    pub fn entities_of(&self, volume_id: &str) -> Vec<K> {
        let mut entities: Vec<K> = self
            .reverse
            .get(volume_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        entities.sort_unstable();
        entities
    }

    pub fn forward_sorted(&self) -> BTreeMap<K, String> {
        self.forward
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }

    pub fn reverse_sorted(&self) -> BTreeMap<String, BTreeSet<K>> {
        self.reverse
            .iter()
            .map(|(volume_id, set)| (volume_id.clone(), set.iter().copied().collect()))
            .collect()
    }
}
