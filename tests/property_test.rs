//! Property tests over random placement/removal sequences.

use std::collections::{BTreeMap, HashSet};

use gridspice::grid::TerminalGrid;
use gridspice::ir::{ComponentKind, Terminal};
use gridspice::netlist;
use gridspice::topology::TopologyStore;
use proptest::prelude::*;

const ROWS: u16 = 4;
const COLS: u16 = 4;

#[derive(Debug, Clone)]
enum Op {
    Place(ComponentKind, Vec<Terminal>),
    Remove(usize),
    Ground(Terminal),
}

fn terminal_strategy() -> impl Strategy<Value = Terminal> {
    (0..ROWS, 0..COLS).prop_map(|(row, col)| Terminal::new(row, col))
}

fn kind_strategy() -> impl Strategy<Value = ComponentKind> {
    prop::sample::select(ComponentKind::ALL.to_vec())
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (kind_strategy(), prop::collection::vec(terminal_strategy(), 3)).prop_map(|(kind, mut ts)| {
            ts.truncate(kind.terminal_count());
            Op::Place(kind, ts)
        }),
        2 => any::<usize>().prop_map(Op::Remove),
        1 => terminal_strategy().prop_map(Op::Ground),
    ]
}

/// Apply `ops`, checking garbage collection on every removal.
fn apply(ops: &[Op]) -> Result<TopologyStore, TestCaseError> {
    let mut store = TopologyStore::new(TerminalGrid::new(ROWS, COLS));
    for op in ops {
        match op {
            Op::Place(kind, terminals) => {
                store.place_component(*kind, terminals.clone()).unwrap();
            }
            Op::Remove(index) => {
                if store.is_empty() {
                    continue;
                }
                let id = store.components()[index % store.len()].id.clone();
                let removed = store.remove_component(&id).unwrap();
                for terminal in &removed.terminals {
                    let still_used = store.components().iter().any(|c| c.terminals.contains(terminal));
                    prop_assert_eq!(store.nodes().contains(terminal), still_used);
                }
            }
            Op::Ground(terminal) => store.set_ground(*terminal).unwrap(),
        }
    }
    Ok(store)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn non_ground_numbers_are_unique(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let store = apply(&ops)?;
        let mut seen = HashSet::new();
        for (_, &number) in store.nodes().iter() {
            if number != 0 {
                prop_assert!(seen.insert(number), "node {} assigned twice", number);
            }
        }
    }

    #[test]
    fn removal_leaves_no_unreferenced_numbers(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut store = apply(&ops)?;
        if let Some(first) = store.components().first().map(|c| c.id.clone()) {
            store.remove_component(&first).unwrap();
            let referenced = store.snapshot().referenced_terminals();
            for (terminal, _) in store.nodes().iter() {
                prop_assert!(referenced.contains(terminal), "{} kept a number", terminal);
            }
        }
    }

    #[test]
    fn every_referenced_terminal_is_numbered(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let store = apply(&ops)?;
        for component in store.components() {
            for terminal in &component.terminals {
                prop_assert!(store.nodes().contains(terminal));
            }
        }
    }

    #[test]
    fn replacement_is_idempotent(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let store = apply(&ops)?;
        let ids: HashSet<_> = store.components().iter().map(|c| c.id.clone()).collect();
        prop_assert_eq!(ids.len(), store.len());
    }

    #[test]
    fn netlist_cardinality_and_contiguous_ids(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let store = apply(&ops)?;
        match netlist::build(store.snapshot()) {
            Ok(built) => {
                prop_assert_eq!(built.components.len(), store.len());

                let mut by_label: BTreeMap<&str, Vec<String>> = BTreeMap::new();
                for (entry, component) in built.components.iter().zip(store.components()) {
                    by_label.entry(component.kind.label()).or_default().push(entry.id.clone());
                }
                let all_ids: HashSet<&String> = built.components.iter().map(|e| &e.id).collect();
                prop_assert_eq!(all_ids.len(), built.components.len());
                for (label, ids) in by_label {
                    let prefix = ComponentKind::ALL.iter().find(|k| k.label() == label).unwrap().prefix();
                    let expected: Vec<String> = (1..=ids.len()).map(|k| format!("{}{}", prefix, k)).collect();
                    prop_assert_eq!(ids, expected);
                }
            }
            Err(e) => {
                // The only way a grid-checked store can fail to build.
                prop_assert!(!store.snapshot().is_grounded(), "unexpected build failure: {}", e);
            }
        }
    }
}
