//! Netlist and results output formatting (SPICE text, CSV).

use std::io::Write;

use crate::error::Result;
use crate::gateway::{ParameterResponse, SimulationResponse};
use crate::ir::{Netlist, NetlistEntry, NodeNumber, ValueShape};

/// Write a built netlist as SPICE element lines.
///
/// Format:
/// ```text
/// * ground node 0
/// R1 0 1 1k
/// V1 2 0 5
/// VAC1 1 2 AC 1 0
/// E1 3 0 1 0 10
/// H1 3 0 V1 100
/// QN1 1 2 3 1
/// MN1 1 2 3 3 1
/// TL1 1 2 90 50
/// .end
/// ```
///
/// DC sources list their nodes in reverse click order. Missing fields are
/// written as `?`.
pub fn write_spice<W: Write>(netlist: &Netlist, writer: &mut W) -> Result<()> {
    writeln!(writer, "* ground node {}", netlist.ground_node)?;
    for entry in &netlist.components {
        writeln!(writer, "{}", spice_line(entry))?;
    }
    writeln!(writer, ".end")?;
    Ok(())
}

fn spice_line(entry: &NetlistEntry) -> String {
    let node = |n: Option<NodeNumber>| n.map_or_else(|| "?".to_string(), |n| n.to_string());
    let text = |s: &Option<String>| s.clone().unwrap_or_else(|| "?".to_string());
    let (n1, n2) = (node(entry.node1), node(entry.node2));

    match entry.kind.shape() {
        ValueShape::Ac => format!(
            "{} {} {} AC {} {}",
            entry.id,
            n1,
            n2,
            entry.value,
            entry.phase.as_deref().unwrap_or("0")
        ),
        ValueShape::VoltageControlled => format!(
            "{} {} {} {} {} {}",
            entry.id,
            n1,
            n2,
            text(&entry.dependentnode1),
            text(&entry.dependentnode2),
            entry.value
        ),
        ValueShape::CurrentControlled => {
            format!("{} {} {} {} {}", entry.id, n1, n2, text(&entry.control_branch), entry.value)
        }
        ValueShape::Line => format!(
            "{} {} {} {} {}",
            entry.id,
            n1,
            n2,
            entry.electrical_length.as_deref().unwrap_or("0"),
            entry.value
        ),
        _ if entry.kind.node_count() == 4 => format!(
            "{} {} {} {} {} {}",
            entry.id,
            n1,
            n2,
            node(entry.node3),
            node(entry.node4),
            entry.value
        ),
        _ if entry.kind.node_count() == 3 => {
            format!("{} {} {} {} {}", entry.id, n1, n2, node(entry.node3), entry.value)
        }
        _ if entry.kind == crate::ir::ComponentKind::DcSource => {
            format!("{} {} {} {}", entry.id, n2, n1, entry.value)
        }
        _ => format!("{} {} {} {}", entry.id, n1, n2, entry.value),
    }
}

/// Write the latest simulation response as CSV.
///
/// Format:
/// ```csv
/// Variable,Value
/// V_node_1,5
/// I_V1,-0.001
/// ```
pub fn write_results_csv<W: Write>(response: &SimulationResponse, writer: &mut W) -> Result<()> {
    writeln!(writer, "Variable,Value")?;
    for (name, value) in &response.voltages {
        writeln!(writer, "{},{}", name, value)?;
    }
    for (name, value) in &response.current {
        writeln!(writer, "{},{}", name, value)?;
    }
    Ok(())
}

/// Write the numeric part of a two-port parameter response as CSV.
pub fn write_parameters_csv<W: Write>(response: &ParameterResponse, writer: &mut W) -> Result<()> {
    writeln!(writer, "Parameter,Value")?;
    for (name, value) in &response.parameters.numeric {
        writeln!(writer, "{},{}", name, value)?;
    }
    Ok(())
}
