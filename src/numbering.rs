//! Canonical node numbering.
//!
//! Every terminal referenced by a placed component gets an integer node
//! number. Number 0 is ground and may be shared; every other number is held
//! by exactly one terminal.
//!
//! # Assignment rule
//!
//! - The first terminal ever numbered on an empty board becomes ground.
//! - After that, a new terminal takes the smallest positive number not
//!   currently in use.
//! - `set_ground` overwrites a terminal's number with 0. The abandoned number
//!   becomes free again for later terminals but is never handed to another
//!   terminal implicitly.
//! - Removing the only ground terminal does not promote another terminal;
//!   netlist builds fail until a new ground is designated.
//! - A terminal may be grounded before any component uses it. That entry
//!   only counts once a component references the terminal, and it is swept
//!   away when the topology drops unreferenced numbers.

use std::collections::{BTreeMap, BTreeSet};

use crate::ir::{NodeNumber, Terminal, GROUND};

/// Terminal → node number mapping plus the running assignment counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeAssignment {
    numbers: BTreeMap<Terminal, NodeNumber>,
    /// One past the last auto-assigned number. Zero means nothing has been
    /// numbered since the board was last empty.
    next_candidate: NodeNumber,
}

impl NodeAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, terminal: &Terminal) -> Option<NodeNumber> {
        self.numbers.get(terminal).copied()
    }

    pub fn contains(&self, terminal: &Terminal) -> bool {
        self.numbers.contains_key(terminal)
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Terminal, &NodeNumber)> {
        self.numbers.iter()
    }

    pub fn next_candidate(&self) -> NodeNumber {
        self.next_candidate
    }

    pub fn has_ground(&self) -> bool {
        self.numbers.values().any(|&n| n == GROUND)
    }

    pub fn ground_terminals(&self) -> Vec<Terminal> {
        self.numbers
            .iter()
            .filter(|(_, &n)| n == GROUND)
            .map(|(t, _)| *t)
            .collect()
    }

    /// Distinct node numbers currently in use, ground included.
    pub fn distinct_nodes(&self) -> BTreeSet<NodeNumber> {
        self.numbers.values().copied().collect()
    }

    /// Give `terminal` a node number if it has none; returns its number.
    pub fn assign(&mut self, terminal: Terminal) -> NodeNumber {
        if let Some(n) = self.get(&terminal) {
            return n;
        }

        let number = if self.next_candidate == 0 && !self.has_ground() {
            self.next_candidate = 1;
            GROUND
        } else {
            let free = self.smallest_free();
            self.next_candidate = free + 1;
            free
        };

        tracing::debug!(%terminal, number, "assigned node number");
        self.numbers.insert(terminal, number);
        number
    }

    /// Force `terminal` to ground, overwriting any previous number.
    pub fn set_ground(&mut self, terminal: Terminal) {
        let previous = self.numbers.insert(terminal, GROUND);
        if self.next_candidate == 0 {
            self.next_candidate = 1;
        }
        tracing::debug!(%terminal, ?previous, "terminal set as ground");
    }

    /// Drop `terminal`'s number unless it is still referenced.
    ///
    /// Returns true if the entry was removed. When the last entry goes, the
    /// board counts as empty again and the next assignment picks ground.
    pub fn release(&mut self, terminal: &Terminal, still_referenced: bool) -> bool {
        if still_referenced {
            return false;
        }
        let removed = self.numbers.remove(terminal).is_some();
        if removed {
            tracing::debug!(%terminal, "released node number");
        }
        if self.numbers.is_empty() {
            self.next_candidate = 0;
        }
        removed
    }

    /// Drop every entry whose terminal fails `keep`; returns how many went.
    pub fn retain(&mut self, mut keep: impl FnMut(&Terminal) -> bool) -> usize {
        let before = self.numbers.len();
        self.numbers.retain(|terminal, _| keep(terminal));
        if self.numbers.is_empty() {
            self.next_candidate = 0;
        }
        before - self.numbers.len()
    }

    fn smallest_free(&self) -> NodeNumber {
        let used = self.distinct_nodes();
        (1..).find(|n| !used.contains(n)).unwrap_or(NodeNumber::MAX)
    }
}
