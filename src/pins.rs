// Pinned chart registry, scoped per instance and per system.
// Mutated from one owner (the API layer); readers take the same lock briefly.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use crate::models::{PinSnapshot, PinnedItem, ResolvedPinnedItem};

struct Inner {
    active_instance: String,
    by_instance: BTreeMap<String, BTreeSet<ResolvedPinnedItem>>,
}

pub struct PinRegistry {
    inner: Mutex<Inner>,
}

impl PinRegistry {
    pub fn new(active_instance: impl Into<String>) -> Self {
        Self::from_snapshot(active_instance, PinSnapshot::new())
    }

    /// Restore persisted state. Duplicate entries collapse.
    pub fn from_snapshot(active_instance: impl Into<String>, snapshot: PinSnapshot) -> Self {
        let by_instance = snapshot
            .into_iter()
            .map(|(instance, pins)| (instance, pins.into_iter().collect()))
            .collect();
        Self {
            inner: Mutex::new(Inner {
                active_instance: active_instance.into(),
                by_instance,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Set operations cannot leave the map half-updated, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn active_instance(&self) -> String {
        self.lock().active_instance.clone()
    }

    /// Switch scope; pins of other instances are kept.
    pub fn set_active_instance(&self, instance_id: impl Into<String>) {
        self.lock().active_instance = instance_id.into();
    }

    /// Flip membership of `item` on `system_id` in the active instance; returns the new state.
    pub fn toggle(&self, item: PinnedItem, system_id: &str) -> bool {
        let mut inner = self.lock();
        let instance = inner.active_instance.clone();
        let pins = inner.by_instance.entry(instance).or_default();
        let key = ResolvedPinnedItem::new(item, system_id);
        if pins.remove(&key) {
            false
        } else {
            pins.insert(key);
            true
        }
    }

    pub fn is_pinned(&self, item: &PinnedItem, system_id: &str) -> bool {
        let inner = self.lock();
        let key = ResolvedPinnedItem::new(item.clone(), system_id);
        inner
            .by_instance
            .get(&inner.active_instance)
            .is_some_and(|pins| pins.contains(&key))
    }

    /// Pins of one instance ordered by system, then item.
    pub fn all_pins_for_instance(&self, instance_id: &str) -> Vec<ResolvedPinnedItem> {
        self.lock()
            .by_instance
            .get(instance_id)
            .map(|pins| pins.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove the active instance's pins for one system; returns how many were removed.
    pub fn clear_for_system(&self, system_id: &str) -> usize {
        let mut inner = self.lock();
        let instance = inner.active_instance.clone();
        let Some(pins) = inner.by_instance.get_mut(&instance) else {
            return 0;
        };
        let before = pins.len();
        pins.retain(|p| p.system_id != system_id);
        before - pins.len()
    }

    /// Remove every pin of the active instance.
    pub fn clear_all(&self) {
        let mut inner = self.lock();
        let instance = inner.active_instance.clone();
        inner.by_instance.remove(&instance);
    }

    pub fn snapshot(&self) -> PinSnapshot {
        self.lock()
            .by_instance
            .iter()
            .filter(|(_, pins)| !pins.is_empty())
            .map(|(instance, pins)| (instance.clone(), pins.iter().cloned().collect()))
            .collect()
    }
}
