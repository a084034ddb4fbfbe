use thiserror::Error;

use crate::ir::Terminal;

/// Failures raised by the topology engine (placement, numbering, netlist build).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("terminal {0} is outside the {1}x{2} grid")]
    OffGrid(Terminal, u16, u16),

    #[error("{kind} needs {expected} terminals, got {got}")]
    ArityMismatch {
        kind: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("no placed component with id {0}")]
    UnknownComponent(String),

    #[error("no terminal is selected")]
    NothingSelected,

    #[error("no terminal is assigned to ground (node 0); set a ground node first")]
    MissingGround,

    #[error("terminal {terminal} of {component} has no node number")]
    UnassignedTerminal { component: String, terminal: Terminal },
}

/// Failures raised while talking to the remote solver.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("a simulation request is already in flight")]
    Busy,

    #[error("solver returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not encode solver request: {0}")]
    Encode(String),

    #[error("malformed solver response: {0}")]
    Decode(String),

    #[error("{0}-parameter analysis needs all four port nodes (p1n1, p1n2, p2n1, p2n2)")]
    MissingPortNodes(&'static str),

    #[error("remote requests are disabled in offline mode")]
    Offline,
}

#[derive(Debug, Error)]
pub enum GridSpiceError {
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Simulation error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GridSpiceError>;
