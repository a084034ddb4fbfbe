//! The central mutable circuit graph.
//!
//! [`TopologyStore`] owns the placed components (edges), the terminal → node
//! number assignment and the per-component values. All mutation goes through
//! its methods; the netlist builder reads an immutable [`TopologySnapshot`].

use std::collections::BTreeSet;

use crate::error::TopologyError;
use crate::grid::TerminalGrid;
use crate::ir::{ComponentId, ComponentKind, ComponentValue, Netlist, PlacedComponent, Terminal, GROUND};
use crate::numbering::NodeAssignment;
use crate::values::ValueStore;

/// Read-only view of the store handed to the netlist builder.
#[derive(Debug, Clone, Copy)]
pub struct TopologySnapshot<'a> {
    /// Placed components in insertion order.
    pub components: &'a [PlacedComponent],
    pub nodes: &'a NodeAssignment,
    pub values: &'a ValueStore,
}

impl TopologySnapshot<'_> {
    /// Terminals touched by at least one placed component.
    pub fn referenced_terminals(&self) -> BTreeSet<Terminal> {
        self.components.iter().flat_map(|c| c.terminals.iter().copied()).collect()
    }

    /// True if some placed component touches node 0. A ground set on a
    /// terminal nothing references does not count.
    pub fn is_grounded(&self) -> bool {
        self.components
            .iter()
            .flat_map(|c| &c.terminals)
            .any(|t| self.nodes.get(t) == Some(GROUND))
    }
}

#[derive(Debug, Clone, Default)]
pub struct TopologyStore {
    grid: TerminalGrid,
    components: Vec<PlacedComponent>,
    nodes: NodeAssignment,
    values: ValueStore,
}

impl TopologyStore {
    pub fn new(grid: TerminalGrid) -> Self {
        Self {
            grid,
            components: Vec::new(),
            nodes: NodeAssignment::new(),
            values: ValueStore::new(),
        }
    }

    pub fn grid(&self) -> &TerminalGrid {
        &self.grid
    }

    pub fn components(&self) -> &[PlacedComponent] {
        &self.components
    }

    pub fn component(&self, id: &ComponentId) -> Option<&PlacedComponent> {
        self.components.iter().find(|c| &c.id == id)
    }

    pub fn nodes(&self) -> &NodeAssignment {
        &self.nodes
    }

    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// True if some edge of any kind connects exactly `{a, b}`.
    pub fn connects(&self, a: &Terminal, b: &Terminal) -> bool {
        self.components.iter().any(|c| c.connects_exactly(a, b))
    }

    /// Record a completed placement.
    ///
    /// Terminals are numbered in click order. Placing the same kind on the
    /// same terminals again replaces the earlier edge in place and resets its
    /// value to the default.
    pub fn place_component(
        &mut self,
        kind: ComponentKind,
        terminals: Vec<Terminal>,
    ) -> Result<ComponentId, TopologyError> {
        if terminals.len() != kind.terminal_count() {
            return Err(TopologyError::ArityMismatch {
                kind: kind.label(),
                expected: kind.terminal_count(),
                got: terminals.len(),
            });
        }
        for t in &terminals {
            self.grid.check(t)?;
        }

        let component = PlacedComponent::new(kind, terminals);
        for t in &component.terminals {
            self.nodes.assign(*t);
        }

        let id = component.id.clone();
        match self.components.iter().position(|c| c.id == id) {
            Some(pos) => {
                tracing::info!(%id, "replaced component");
                self.components[pos] = component;
            }
            None => {
                tracing::info!(%id, "placed component");
                self.components.push(component);
            }
        }
        self.values.insert_default(id.clone());
        Ok(id)
    }

    /// Delete an edge, its value, and the node numbers of terminals no
    /// remaining edge references. Stray grounds on unused terminals go too.
    pub fn remove_component(&mut self, id: &ComponentId) -> Result<PlacedComponent, TopologyError> {
        let pos = self
            .components
            .iter()
            .position(|c| &c.id == id)
            .ok_or_else(|| TopologyError::UnknownComponent(id.to_string()))?;
        let removed = self.components.remove(pos);

        for t in &removed.terminals {
            let still_referenced = self.components.iter().any(|c| c.touches(t));
            self.nodes.release(t, still_referenced);
        }
        self.release_unreferenced();
        self.values.remove(id);

        tracing::info!(%id, "removed component");
        Ok(removed)
    }

    /// Drop node numbers held by terminals no placed component touches.
    pub fn release_unreferenced(&mut self) -> usize {
        let components = &self.components;
        let dropped = self.nodes.retain(|t| components.iter().any(|c| c.touches(t)));
        if dropped > 0 {
            tracing::debug!(dropped, "released unreferenced node numbers");
        }
        dropped
    }

    /// Force a terminal to ground (node 0).
    pub fn set_ground(&mut self, terminal: Terminal) -> Result<(), TopologyError> {
        self.grid.check(&terminal)?;
        self.nodes.set_ground(terminal);
        tracing::info!(%terminal, "set ground");
        Ok(())
    }

    pub fn set_value(&mut self, id: &ComponentId, value: ComponentValue) -> Result<(), TopologyError> {
        if self.component(id).is_none() {
            return Err(TopologyError::UnknownComponent(id.to_string()));
        }
        tracing::debug!(%id, %value, "value updated");
        self.values.set(id.clone(), value);
        Ok(())
    }

    /// Remember the synthetic ids handed out by a successful build.
    pub fn record_build(&mut self, netlist: &Netlist) {
        self.values.record_synthetic_ids(netlist);
    }

    pub fn snapshot(&self) -> TopologySnapshot<'_> {
        TopologySnapshot {
            components: &self.components,
            nodes: &self.nodes,
            values: &self.values,
        }
    }
}
