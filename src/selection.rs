//! Click-driven terminal selection.
//!
//! ```text
//! Idle           --click t-->            OneSelected(t)
//! OneSelected(t) --click t-->            Idle                 (deselect)
//! OneSelected(a) --click b, 2-terminal-> Idle + Completed(a,b) if a,b share a row/col
//!                                                              and no edge joins {a,b}
//!                                        Idle + Ignored       otherwise
//! OneSelected(a) --click b, 3-terminal-> TwoSelected(a,b)
//! TwoSelected(a,b) --click c-->          Idle + Completed(a,b,c)
//! ```

use crate::ir::{ComponentKind, Terminal};
use crate::topology::TopologyStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    OneSelected(Terminal),
    /// Only reachable for three-terminal kinds.
    TwoSelected(Terminal, Terminal),
}

/// A finished selection sequence, ready for the topology store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub kind: ComponentKind,
    pub terminals: Vec<Terminal>,
}

/// Outcome of one click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    /// More clicks are needed.
    Pending,
    /// The pending terminal was clicked again and dropped.
    Deselected,
    /// Diagonal or duplicate placement; silently dropped.
    Ignored,
    Completed(Placement),
}

#[derive(Debug, Clone)]
pub struct SelectionController {
    state: SelectionState,
    kind: ComponentKind,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new(ComponentKind::Wire)
    }
}

impl SelectionController {
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            state: SelectionState::Idle,
            kind,
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Choose the component type for the next placement. A partial
    /// selection made for another type is dropped.
    pub fn set_kind(&mut self, kind: ComponentKind) {
        if kind != self.kind {
            self.state = SelectionState::Idle;
        }
        self.kind = kind;
    }

    /// First pending terminal, if any.
    pub fn selected(&self) -> Option<Terminal> {
        match self.state {
            SelectionState::Idle => None,
            SelectionState::OneSelected(t) | SelectionState::TwoSelected(t, _) => Some(t),
        }
    }

    pub fn reset(&mut self) {
        self.state = SelectionState::Idle;
    }

    /// Feed one terminal click. `topology` is consulted for duplicate edges.
    pub fn click(&mut self, terminal: Terminal, topology: &TopologyStore) -> SelectionEvent {
        let kind = self.kind;
        let (next, event) = match self.state {
            SelectionState::Idle => (SelectionState::OneSelected(terminal), SelectionEvent::Pending),

            SelectionState::OneSelected(first) if first == terminal => {
                (SelectionState::Idle, SelectionEvent::Deselected)
            }

            SelectionState::OneSelected(first) if kind.is_multi_terminal() => {
                (SelectionState::TwoSelected(first, terminal), SelectionEvent::Pending)
            }

            SelectionState::OneSelected(first) => {
                if first.is_orthogonal_to(&terminal) && !topology.connects(&first, &terminal) {
                    let placement = Placement {
                        kind,
                        terminals: vec![first, terminal],
                    };
                    (SelectionState::Idle, SelectionEvent::Completed(placement))
                } else {
                    tracing::debug!(%first, %terminal, "placement ignored");
                    (SelectionState::Idle, SelectionEvent::Ignored)
                }
            }

            SelectionState::TwoSelected(first, second) => {
                let placement = Placement {
                    kind,
                    terminals: vec![first, second, terminal],
                };
                (SelectionState::Idle, SelectionEvent::Completed(placement))
            }
        };

        self.state = next;
        event
    }
}
