//! Per-component value storage.

use std::collections::HashMap;

use crate::ir::{ComponentId, ComponentValue, Netlist};

/// Maps each placed component to its user-entered value.
///
/// Also remembers the synthetic id (`R1`, `VAC2`, ...) each component received
/// in the most recent netlist build, so solver results can be mapped back.
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    values: HashMap<ComponentId, ComponentValue>,
    synthetic_ids: HashMap<ComponentId, String>,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset `id` to the placement default.
    pub fn insert_default(&mut self, id: ComponentId) {
        self.values.insert(id, ComponentValue::default());
    }

    pub fn set(&mut self, id: ComponentId, value: ComponentValue) {
        self.values.insert(id, value);
    }

    pub fn get(&self, id: &ComponentId) -> Option<&ComponentValue> {
        self.values.get(id)
    }

    pub fn contains(&self, id: &ComponentId) -> bool {
        self.values.contains_key(id)
    }

    pub fn remove(&mut self, id: &ComponentId) -> Option<ComponentValue> {
        self.synthetic_ids.remove(id);
        self.values.remove(id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replace the recorded synthetic ids with those of `netlist`.
    pub fn record_synthetic_ids(&mut self, netlist: &Netlist) {
        self.synthetic_ids = netlist
            .components
            .iter()
            .map(|entry| (entry.component.clone(), entry.id.clone()))
            .collect();
    }

    /// Synthetic id assigned to `id` at the last build, if any.
    pub fn synthetic_id(&self, id: &ComponentId) -> Option<&str> {
        self.synthetic_ids.get(id).map(String::as_str)
    }
}
