//! Netlist builder.
//!
//! Walks the placed components in insertion order and turns each into a
//! [`NetlistEntry`]:
//!
//! 1. Resolve every terminal to its node number (fail if any is missing).
//! 2. Hand out a synthetic id from a per-label counter that restarts at 1 on
//!    every build, so the third resistor placed is always `R3`. Every label
//!    has its own prefix, so ids never collide.
//! 3. Decode the stored value according to the kind's [`ValueShape`].
//!
//! The build is all-or-nothing: the first failure is returned and no partial
//! netlist is produced.

use std::collections::HashMap;

use crate::error::TopologyError;
use crate::ir::{
    ComponentValue, Netlist, NetlistEntry, NodeNumber, PlacedComponent, ValueShape, GROUND,
};
use crate::numbering::NodeAssignment;
use crate::parser;
use crate::topology::TopologySnapshot;

/// Build the solver netlist for the current topology.
pub fn build(snapshot: TopologySnapshot<'_>) -> Result<Netlist, TopologyError> {
    let _span = tracing::info_span!("netlist_build", components = snapshot.components.len()).entered();

    if !snapshot.is_grounded() {
        tracing::warn!("netlist build rejected: no ground node");
        return Err(TopologyError::MissingGround);
    }

    let mut counters: HashMap<&'static str, u32> = HashMap::new();
    let mut entries = Vec::with_capacity(snapshot.components.len());

    for component in snapshot.components {
        let [node1, node2, node3, node4] = resolve_nodes(component, snapshot.nodes)?;

        let counter = counters.entry(component.kind.label()).or_insert(0);
        *counter += 1;

        let mut entry = NetlistEntry {
            label: component.kind.label(),
            id: format!("{}{}", component.kind.prefix(), counter),
            node1,
            node2,
            node3,
            node4,
            value: String::new(),
            phase: None,
            dependentnode1: None,
            dependentnode2: None,
            control_branch: None,
            electrical_length: None,
            kind: component.kind,
            component: component.id.clone(),
        };

        let stored = snapshot.values.get(&component.id).cloned().unwrap_or_default();
        decode_value(&mut entry, &stored, snapshot.nodes);

        tracing::debug!(id = %entry.id, component = %component.id, "netlist entry");
        entries.push(entry);
    }

    tracing::info!(entries = entries.len(), "netlist built");
    Ok(Netlist {
        components: entries,
        ground_node: GROUND,
        number_of_nodes: snapshot.referenced_terminals().len(),
    })
}

/// Node slots `node1..node4` for one component.
///
/// Four-node devices (MOSFETs) are placed with three clicks; the bulk node
/// is tied to the third terminal.
fn resolve_nodes(
    component: &PlacedComponent,
    nodes: &NodeAssignment,
) -> Result<[Option<NodeNumber>; 4], TopologyError> {
    let mut slots = [None; 4];
    for (slot, terminal) in slots.iter_mut().zip(&component.terminals) {
        let number = nodes.get(terminal).ok_or_else(|| TopologyError::UnassignedTerminal {
            component: component.id.to_string(),
            terminal: *terminal,
        })?;
        *slot = Some(number);
    }
    if component.kind.node_count() == 4 {
        slots[3] = slots[2];
    }
    Ok(slots)
}

fn decode_value(entry: &mut NetlistEntry, value: &ComponentValue, nodes: &NodeAssignment) {
    match (entry.kind.shape(), value) {
        (ValueShape::Meter, _) => entry.value = "0".to_string(),

        (ValueShape::Ac, ComponentValue::Ac { magnitude, phase }) => {
            entry.value = magnitude.clone();
            entry.phase = Some(phase.clone());
        }

        (
            ValueShape::VoltageControlled,
            ComponentValue::VoltageControlled {
                gain,
                dependent_node1,
                dependent_node2,
            },
        ) => {
            entry.value = gain.clone();
            entry.dependentnode1 = Some(resolve_reference(dependent_node1, nodes));
            entry.dependentnode2 = Some(resolve_reference(dependent_node2, nodes));
        }

        (ValueShape::CurrentControlled, ComponentValue::CurrentControlled { gain, control_branch }) => {
            entry.value = gain.clone();
            entry.control_branch = Some(control_branch.trim().to_string());
        }

        (
            ValueShape::Line,
            ComponentValue::Line {
                impedance,
                electrical_length,
            },
        ) => {
            entry.value = impedance.clone();
            entry.electrical_length = Some(electrical_length.clone());
        }

        // Not yet edited into structured form (or edited with another
        // shape): the headline value is passed through.
        (_, other) => entry.value = other.primary().to_string(),
    }
}

/// A controlling-node reference written as a terminal (`"3-4"`) resolves to
/// that terminal's node number; anything else is forwarded as typed.
fn resolve_reference(text: &str, nodes: &NodeAssignment) -> String {
    parser::parse_terminal(text)
        .ok()
        .and_then(|t| nodes.get(&t))
        .map(|n| n.to_string())
        .unwrap_or_else(|| text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ComponentId, ComponentKind, Terminal};
    use crate::topology::TopologyStore;

    fn t(row: u16, col: u16) -> Terminal {
        Terminal::new(row, col)
    }

    fn ids(netlist: &Netlist) -> Vec<&str> {
        netlist.components.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_missing_ground_fails() {
        let mut store = TopologyStore::default();
        let r = store
            .place_component(ComponentKind::Resistor, vec![t(0, 0), t(0, 1)])
            .unwrap();
        store
            .place_component(ComponentKind::Resistor, vec![t(1, 0), t(1, 1)])
            .unwrap();
        // Removing the first resistor orphans the ground terminal.
        store.remove_component(&r).unwrap();
        assert_eq!(build(store.snapshot()), Err(TopologyError::MissingGround));
    }

    #[test]
    fn test_empty_board_has_no_ground() {
        let store = TopologyStore::default();
        assert_eq!(build(store.snapshot()), Err(TopologyError::MissingGround));
    }

    #[test]
    fn test_unassigned_terminal_fails() {
        let mut nodes = NodeAssignment::new();
        nodes.assign(t(0, 0));
        let components = vec![PlacedComponent::new(ComponentKind::Resistor, vec![t(0, 0), t(0, 1)])];
        let values = crate::values::ValueStore::new();
        let snapshot = TopologySnapshot {
            components: &components,
            nodes: &nodes,
            values: &values,
        };
        assert_eq!(
            build(snapshot),
            Err(TopologyError::UnassignedTerminal {
                component: "R_0-0_0-1".into(),
                terminal: t(0, 1),
            })
        );
    }

    #[test]
    fn test_synthetic_ids_interleaved() {
        let mut store = TopologyStore::default();
        store.place_component(ComponentKind::Resistor, vec![t(0, 0), t(0, 1)]).unwrap();
        store.place_component(ComponentKind::Capacitor, vec![t(0, 1), t(0, 2)]).unwrap();
        store.place_component(ComponentKind::Resistor, vec![t(0, 2), t(0, 3)]).unwrap();
        store.place_component(ComponentKind::Capacitor, vec![t(0, 3), t(0, 4)]).unwrap();
        store.place_component(ComponentKind::Resistor, vec![t(0, 4), t(0, 5)]).unwrap();

        let netlist = build(store.snapshot()).unwrap();
        assert_eq!(ids(&netlist), vec!["R1", "C1", "R2", "C2", "R3"]);

        // Counters restart on every build.
        let again = build(store.snapshot()).unwrap();
        assert_eq!(ids(&again), ids(&netlist));
    }

    #[test]
    fn test_counters_are_per_label() {
        let mut store = TopologyStore::default();
        store.place_component(ComponentKind::DcSource, vec![t(0, 0), t(1, 0)]).unwrap();
        store.place_component(ComponentKind::AcSource, vec![t(1, 0), t(2, 0)]).unwrap();
        store.place_component(ComponentKind::DcSource, vec![t(2, 0), t(3, 0)]).unwrap();
        store
            .place_component(ComponentKind::NpnTransistor, vec![t(4, 0), t(4, 1), t(4, 2)])
            .unwrap();
        store
            .place_component(ComponentKind::PnpTransistor, vec![t(5, 0), t(5, 1), t(5, 2)])
            .unwrap();
        store
            .place_component(ComponentKind::PMosfet, vec![t(6, 0), t(6, 1), t(6, 2)])
            .unwrap();
        let netlist = build(store.snapshot()).unwrap();
        assert_eq!(ids(&netlist), vec!["V1", "VAC1", "V2", "QN1", "QP1", "MP1"]);
        assert_eq!(netlist.components[1].label, "AC Source");
    }

    #[test]
    fn test_mosfet_bulk_tied_to_third_terminal() {
        let mut store = TopologyStore::default();
        store
            .place_component(ComponentKind::NMosfet, vec![t(0, 0), t(1, 1), t(2, 2)])
            .unwrap();
        let netlist = build(store.snapshot()).unwrap();
        let m = &netlist.components[0];
        assert_eq!(m.id, "MN1");
        assert_eq!(m.nodes(), vec![0, 1, 2, 2]);
    }

    #[test]
    fn test_structured_values_decoded() {
        let mut store = TopologyStore::default();
        let ac = store.place_component(ComponentKind::AcSource, vec![t(0, 0), t(1, 0)]).unwrap();
        let e = store.place_component(ComponentKind::Vcvs, vec![t(1, 0), t(1, 1)]).unwrap();
        let h = store.place_component(ComponentKind::Ccvs, vec![t(1, 1), t(1, 2)]).unwrap();
        let tl = store
            .place_component(ComponentKind::TransmissionLine, vec![t(1, 2), t(1, 3)])
            .unwrap();
        let os = store.place_component(ComponentKind::OpenStub, vec![t(1, 3), t(2, 3)]).unwrap();

        store
            .set_value(&ac, ComponentValue::Ac { magnitude: "10".into(), phase: "45".into() })
            .unwrap();
        store
            .set_value(
                &e,
                ComponentValue::VoltageControlled {
                    gain: "2".into(),
                    dependent_node1: "1-1".into(),
                    dependent_node2: "7".into(),
                },
            )
            .unwrap();
        store
            .set_value(&h, ComponentValue::CurrentControlled { gain: "100".into(), control_branch: " V1 ".into() })
            .unwrap();
        store
            .set_value(&tl, ComponentValue::Line { impedance: "75".into(), electrical_length: "90".into() })
            .unwrap();
        store.set_value(&os, ComponentValue::scalar("50")).unwrap();

        let netlist = build(store.snapshot()).unwrap();
        let by_component = |id: &ComponentId| -> NetlistEntry {
            netlist.components.iter().find(|e| &e.component == id).unwrap().clone()
        };

        let v = by_component(&ac);
        assert_eq!((v.value.as_str(), v.phase.as_deref()), ("10", Some("45")));

        let vcvs = by_component(&e);
        assert_eq!(vcvs.id, "E1");
        assert_eq!(vcvs.value, "2");
        assert_eq!(vcvs.dependentnode1.as_deref(), Some("2"));
        assert_eq!(vcvs.dependentnode2.as_deref(), Some("7"));

        let ccvs = by_component(&h);
        assert_eq!(ccvs.control_branch.as_deref(), Some("V1"));

        let line = by_component(&tl);
        assert_eq!((line.value.as_str(), line.electrical_length.as_deref()), ("75", Some("90")));

        let stub = by_component(&os);
        assert_eq!((stub.value.as_str(), stub.electrical_length.as_deref()), ("50", None));
    }

    #[test]
    fn test_meters_emit_zero() {
        let mut store = TopologyStore::default();
        let am = store.place_component(ComponentKind::Ammeter, vec![t(0, 0), t(0, 1)]).unwrap();
        store.set_value(&am, ComponentValue::scalar("5")).unwrap();
        store.place_component(ComponentKind::Voltmeter, vec![t(0, 1), t(0, 2)]).unwrap();
        let netlist = build(store.snapshot()).unwrap();
        assert_eq!(ids(&netlist), vec!["AM1", "VM1"]);
        assert!(netlist.components.iter().all(|e| e.value == "0"));
    }

    #[test]
    fn test_wire_json_shape() {
        let mut store = TopologyStore::default();
        store.place_component(ComponentKind::Resistor, vec![t(0, 0), t(0, 1)]).unwrap();
        let netlist = build(store.snapshot()).unwrap();
        let json = serde_json::to_value(&netlist).unwrap();
        assert_eq!(json["groundNode"], 0);
        let entry = &json["components"][0];
        assert_eq!(entry["type"], "Resistor");
        assert_eq!(entry["id"], "R1");
        assert_eq!(entry["node1"], 0);
        assert_eq!(entry["node2"], 1);
        assert!(entry["node3"].is_null());
        assert_eq!(entry["value"], "1");
        assert!(entry.get("Vcontrol").is_some());
        assert!(entry.get("kind").is_none());
    }
}
