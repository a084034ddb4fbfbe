//! Circuit topology data model.
//!
//! Terminals are grid coordinates, placed components are edges bound to two
//! or three terminals, and the netlist types are the derived, solver-facing
//! view produced by [`crate::netlist::build`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GridSpiceError;

/// Canonical node number. Ground is always [`GROUND`].
pub type NodeNumber = u32;

/// The reserved ground node number.
pub const GROUND: NodeNumber = 0;

/// A terminal on the placement grid, addressed by `(row, col)`.
///
/// Text form is `"<row>-<col>"`, e.g. `"3-12"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Terminal {
    pub row: u16,
    pub col: u16,
}

impl Terminal {
    pub const fn new(row: u16, col: u16) -> Self {
        Self { row, col }
    }

    /// True if both terminals lie on the same grid row or column.
    pub fn is_orthogonal_to(&self, other: &Terminal) -> bool {
        self.row == other.row || self.col == other.col
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.row, self.col)
    }
}

impl FromStr for Terminal {
    type Err = GridSpiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parser::parse_terminal(s)
    }
}

/// How a component's user-entered value is decoded at netlist build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Plain value passed through as a string.
    Scalar,
    /// Magnitude + phase (degrees).
    Ac,
    /// Gain + two controlling nodes.
    VoltageControlled,
    /// Gain + controlling branch (e.g. `V1`).
    CurrentControlled,
    /// Characteristic impedance + electrical length.
    Line,
    /// Measurement device; always emits `0`.
    Meter,
}

/// Static behaviour of a component kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindInfo {
    /// Code used in component ids and on the command line.
    pub code: &'static str,
    /// Human-readable type label sent to the solver.
    pub label: &'static str,
    /// Synthetic-id prefix (`R` in `R3`).
    pub prefix: &'static str,
    /// Number of grid terminals clicked to place the component.
    pub terminals: usize,
    /// Number of netlist node slots (`node1..node4`) the component fills.
    pub nodes: usize,
    pub shape: ValueShape,
}

/// Every placeable component type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    Wire,
    Resistor,
    Capacitor,
    Inductor,
    DcSource,
    AcSource,
    Diode,
    NpnTransistor,
    PnpTransistor,
    NMosfet,
    PMosfet,
    Ammeter,
    Voltmeter,
    Vcvs,
    Vccs,
    Ccvs,
    Cccs,
    CurrentSource,
    TransmissionLine,
    OpenStub,
    ShortStub,
    Port,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 22] = [
        ComponentKind::Wire,
        ComponentKind::Resistor,
        ComponentKind::Capacitor,
        ComponentKind::Inductor,
        ComponentKind::DcSource,
        ComponentKind::AcSource,
        ComponentKind::Diode,
        ComponentKind::NpnTransistor,
        ComponentKind::PnpTransistor,
        ComponentKind::NMosfet,
        ComponentKind::PMosfet,
        ComponentKind::Ammeter,
        ComponentKind::Voltmeter,
        ComponentKind::Vcvs,
        ComponentKind::Vccs,
        ComponentKind::Ccvs,
        ComponentKind::Cccs,
        ComponentKind::CurrentSource,
        ComponentKind::TransmissionLine,
        ComponentKind::OpenStub,
        ComponentKind::ShortStub,
        ComponentKind::Port,
    ];

    /// Dispatch table: one row per kind.
    pub const fn info(self) -> KindInfo {
        use ValueShape::*;

        const fn two(code: &'static str, label: &'static str, prefix: &'static str, shape: ValueShape) -> KindInfo {
            KindInfo { code, label, prefix, terminals: 2, nodes: 2, shape }
        }

        match self {
            ComponentKind::Wire => two("W", "Wire", "W", Scalar),
            ComponentKind::Resistor => two("R", "Resistor", "R", Scalar),
            ComponentKind::Capacitor => two("C", "Capacitor", "C", Scalar),
            ComponentKind::Inductor => two("L", "Inductor", "L", Scalar),
            ComponentKind::DcSource => two("V", "DC Source", "V", Scalar),
            ComponentKind::AcSource => two("AC", "AC Source", "VAC", Ac),
            ComponentKind::Diode => two("Diode", "Diode", "D", Scalar),
            ComponentKind::NpnTransistor => KindInfo {
                code: "NpnTransistor",
                label: "Npn Transistor",
                prefix: "QN",
                terminals: 3,
                nodes: 3,
                shape: Scalar,
            },
            ComponentKind::PnpTransistor => KindInfo {
                code: "PnpTransistor",
                label: "Pnp Transistor",
                prefix: "QP",
                terminals: 3,
                nodes: 3,
                shape: Scalar,
            },
            ComponentKind::NMosfet => KindInfo {
                code: "NMosfet",
                label: "N Mosfet",
                prefix: "MN",
                terminals: 3,
                nodes: 4,
                shape: Scalar,
            },
            ComponentKind::PMosfet => KindInfo {
                code: "PMosfet",
                label: "P Mosfet",
                prefix: "MP",
                terminals: 3,
                nodes: 4,
                shape: Scalar,
            },
            ComponentKind::Ammeter => two("Ammeter", "Ammeter", "AM", Meter),
            ComponentKind::Voltmeter => two("Voltmeter", "Voltmeter", "VM", Meter),
            ComponentKind::Vcvs => two("VCVS", "VCVS", "E", VoltageControlled),
            ComponentKind::Vccs => two("VCCS", "VCCS", "G", VoltageControlled),
            ComponentKind::Ccvs => two("CCVS", "CCVS", "H", CurrentControlled),
            ComponentKind::Cccs => two("CCCS", "CCCS", "F", CurrentControlled),
            ComponentKind::CurrentSource => two("CS", "Current Source", "I", Scalar),
            ComponentKind::TransmissionLine => two("TL", "Transmission Line", "TL", Line),
            ComponentKind::OpenStub => two("OS", "Open Stub", "OS", Line),
            ComponentKind::ShortStub => two("SS", "Short Stub", "SS", Line),
            ComponentKind::Port => two("P", "Port", "P", Scalar),
        }
    }

    pub const fn code(self) -> &'static str {
        self.info().code
    }

    pub const fn label(self) -> &'static str {
        self.info().label
    }

    pub const fn prefix(self) -> &'static str {
        self.info().prefix
    }

    pub const fn terminal_count(self) -> usize {
        self.info().terminals
    }

    pub const fn node_count(self) -> usize {
        self.info().nodes
    }

    pub const fn shape(self) -> ValueShape {
        self.info().shape
    }

    /// Devices placed with three clicks (transistors, MOSFETs).
    pub const fn is_multi_terminal(self) -> bool {
        self.terminal_count() == 3
    }

    /// Look up a kind by its code (`"R"`, `"AC"`, `"NMosfet"`, ...).
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.code() == code)
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Content-addressed component id: `<code>_<t1>_<t2>[_<t3>]`.
///
/// Placing the same kind on the same terminals yields the same id, which is
/// what makes re-placement idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(kind: ComponentKind, terminals: &[Terminal]) -> Self {
        let mut id = kind.code().to_string();
        for t in terminals {
            id.push('_');
            id.push_str(&t.to_string());
        }
        ComponentId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(s: &str) -> Self {
        ComponentId(s.to_string())
    }
}

impl From<String> for ComponentId {
    fn from(s: String) -> Self {
        ComponentId(s)
    }
}

/// A component instance bound to 2 or 3 grid terminals (an edge).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedComponent {
    pub id: ComponentId,
    pub kind: ComponentKind,
    pub terminals: Vec<Terminal>,
}

impl PlacedComponent {
    pub fn new(kind: ComponentKind, terminals: Vec<Terminal>) -> Self {
        Self {
            id: ComponentId::new(kind, &terminals),
            kind,
            terminals,
        }
    }

    pub fn touches(&self, terminal: &Terminal) -> bool {
        self.terminals.contains(terminal)
    }

    /// True if this edge connects exactly the two given terminals, in either order.
    pub fn connects_exactly(&self, a: &Terminal, b: &Terminal) -> bool {
        self.terminals.len() == 2 && self.touches(a) && self.touches(b)
    }
}

/// User-entered value of a placed component.
///
/// The JSON shape matches what the solver accepts for the raw `value` field.
/// Values are kept as text: engineering suffixes and malformed input are
/// forwarded to the solver unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ComponentValue {
    Scalar(String),
    Ac {
        #[serde(rename = "value")]
        magnitude: String,
        phase: String,
    },
    VoltageControlled {
        #[serde(rename = "value")]
        gain: String,
        #[serde(rename = "dependentNode1")]
        dependent_node1: String,
        #[serde(rename = "dependentNode2")]
        dependent_node2: String,
    },
    CurrentControlled {
        #[serde(rename = "value")]
        gain: String,
        #[serde(rename = "Vcontrol")]
        control_branch: String,
    },
    Line {
        impedance: String,
        #[serde(rename = "electricalLength")]
        electrical_length: String,
    },
}

impl ComponentValue {
    pub fn scalar(value: impl Into<String>) -> Self {
        ComponentValue::Scalar(value.into())
    }

    /// The headline number: scalar value, magnitude, gain or impedance.
    pub fn primary(&self) -> &str {
        match self {
            ComponentValue::Scalar(v) => v,
            ComponentValue::Ac { magnitude, .. } => magnitude,
            ComponentValue::VoltageControlled { gain, .. } => gain,
            ComponentValue::CurrentControlled { gain, .. } => gain,
            ComponentValue::Line { impedance, .. } => impedance,
        }
    }
}

impl Default for ComponentValue {
    /// Value assigned at placement time.
    fn default() -> Self {
        ComponentValue::Scalar("1".to_string())
    }
}

impl fmt::Display for ComponentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentValue::Scalar(v) => write!(f, "{}", v),
            ComponentValue::Ac { magnitude, phase } => write!(f, "{} ∠ {}°", magnitude, phase),
            ComponentValue::VoltageControlled {
                gain,
                dependent_node1,
                dependent_node2,
            } => write!(f, "{} (controlled by {}, {})", gain, dependent_node1, dependent_node2),
            ComponentValue::CurrentControlled { gain, control_branch } => {
                write!(f, "{} (control: {})", gain, control_branch)
            }
            ComponentValue::Line {
                impedance,
                electrical_length,
            } => write!(f, "{} Ω, {}°", impedance, electrical_length),
        }
    }
}

/// One solver-facing component descriptor with resolved node numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetlistEntry {
    #[serde(rename = "type")]
    pub label: &'static str,
    /// Synthetic id, e.g. `R3`.
    pub id: String,
    pub node1: Option<NodeNumber>,
    pub node2: Option<NodeNumber>,
    pub node3: Option<NodeNumber>,
    pub node4: Option<NodeNumber>,
    pub value: String,
    pub phase: Option<String>,
    pub dependentnode1: Option<String>,
    pub dependentnode2: Option<String>,
    #[serde(rename = "Vcontrol")]
    pub control_branch: Option<String>,
    #[serde(rename = "electricalLength")]
    pub electrical_length: Option<String>,
    #[serde(skip)]
    pub kind: ComponentKind,
    /// Placed component this entry was built from.
    #[serde(skip)]
    pub component: ComponentId,
}

impl NetlistEntry {
    /// Populated node slots, in order.
    pub fn nodes(&self) -> Vec<NodeNumber> {
        [self.node1, self.node2, self.node3, self.node4].into_iter().flatten().collect()
    }
}

/// Result of a netlist build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Netlist {
    pub components: Vec<NetlistEntry>,
    #[serde(rename = "groundNode")]
    pub ground_node: NodeNumber,
    /// Distinct terminals referenced by placed components at build time.
    #[serde(skip)]
    pub number_of_nodes: usize,
}
