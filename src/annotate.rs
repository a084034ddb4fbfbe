//! Maps a solver response back onto placed components.

use std::fmt;

use crate::gateway::SimulationResponse;
use crate::ir::{ComponentId, ComponentKind, NodeNumber, Terminal};
use crate::topology::TopologyStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Voltage,
    Current,
}

impl Quantity {
    pub fn unit(self) -> &'static str {
        match self {
            Quantity::Voltage => "V",
            Quantity::Current => "A",
        }
    }
}

/// Format a reading for display.
///
/// The sign is dropped and the unit auto-scaled: base unit at or above 1,
/// milli at or above 1e-3, micro at or above 1e-6, scientific below that.
pub fn format_quantity(value: f64, quantity: Quantity) -> String {
    let unit = quantity.unit();
    let magnitude = value.abs();
    if magnitude >= 1.0 {
        format!("{:.3} {}", magnitude, unit)
    } else if magnitude >= 1e-3 {
        format!("{:.3} m{}", magnitude * 1e3, unit)
    } else if magnitude >= 1e-6 {
        format!("{:.3} µ{}", magnitude * 1e6, unit)
    } else {
        format!("{:.3e} {}", magnitude, unit)
    }
}

/// What the solver reported for one placed component.
#[derive(Debug, Clone, PartialEq)]
pub struct Readout {
    pub component: ComponentId,
    pub kind: ComponentKind,
    /// Id handed out by the last netlist build.
    pub synthetic_id: Option<String>,
    /// Potential difference between the first two terminals.
    pub voltage: Option<f64>,
    /// Branch current reported under `I_<synthetic id>`.
    pub current: Option<f64>,
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.synthetic_id.as_deref().unwrap_or(self.component.as_str());
        let show = |value: Option<f64>, quantity| match value {
            Some(v) => format_quantity(v, quantity),
            None => "No data".to_string(),
        };

        match self.kind {
            ComponentKind::Voltmeter => write!(f, "{}: {}", name, show(self.voltage, Quantity::Voltage)),
            ComponentKind::Ammeter if self.current.is_some() => write!(
                f,
                "{}: {} ({} across)",
                name,
                show(self.current, Quantity::Current),
                show(self.voltage, Quantity::Voltage)
            ),
            _ => write!(
                f,
                "{}: V = {}, I = {}",
                name,
                show(self.voltage, Quantity::Voltage),
                show(self.current, Quantity::Current)
            ),
        }
    }
}

pub struct ResultAnnotator<'a> {
    topology: &'a TopologyStore,
    response: Option<&'a SimulationResponse>,
}

impl<'a> ResultAnnotator<'a> {
    pub fn new(topology: &'a TopologyStore, response: Option<&'a SimulationResponse>) -> Self {
        Self { topology, response }
    }

    /// Voltage of node `node`, if the solver reported it.
    pub fn node_voltage(&self, node: NodeNumber) -> Option<f64> {
        self.response.and_then(|r| r.node_voltage(node))
    }

    /// Label shown next to a terminal: its node voltage, or `Node <n>` when
    /// there is no reading. `None` for unnumbered terminals.
    pub fn terminal_label(&self, terminal: &Terminal) -> Option<String> {
        let node = self.topology.nodes().get(terminal)?;
        Some(match self.node_voltage(node) {
            Some(v) => format_quantity(v, Quantity::Voltage),
            None => format!("Node {}", node),
        })
    }

    /// Readings for one placed component. `None` if no such component exists.
    ///
    /// The voltage is `V(n1) - V(n2)` over the first two terminals; a node
    /// missing from the response reads as 0. Without a response, or before
    /// the component has been through a netlist build, both readings are
    /// empty.
    pub fn readout(&self, id: &ComponentId) -> Option<Readout> {
        let component = self.topology.component(id)?;
        let synthetic_id = self.topology.values().synthetic_id(id).map(str::to_string);

        let mut readout = Readout {
            component: id.clone(),
            kind: component.kind,
            synthetic_id,
            voltage: None,
            current: None,
        };

        let (Some(response), Some(sid)) = (self.response, readout.synthetic_id.as_deref()) else {
            return Some(readout);
        };

        let nodes = self.topology.nodes();
        if let [a, b, ..] = component.terminals.as_slice() {
            if let (Some(n1), Some(n2)) = (nodes.get(a), nodes.get(b)) {
                let v1 = response.node_voltage(n1).unwrap_or(0.0);
                let v2 = response.node_voltage(n2).unwrap_or(0.0);
                readout.voltage = Some(v1 - v2);
            }
        }
        readout.current = response.branch_current(sid);
        Some(readout)
    }
}
