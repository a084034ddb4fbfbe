//! Session scripts replayed end to end.

use std::cell::RefCell;

use gridspice::config::Config;
use gridspice::error::GatewayError;
use gridspice::gateway::Transport;
use gridspice::script::{run_script, ScriptSummary};
use gridspice::session::Workbench;
use serde_json::{json, Value};

/// Always answers with the same simulation result.
struct FixedSolver(Value, RefCell<usize>);

impl Transport for FixedSolver {
    fn post_json(&self, _path: &str, _body: &Value) -> Result<Value, GatewayError> {
        *self.1.borrow_mut() += 1;
        Ok(self.0.clone())
    }
}

fn replay(script: &str, reply: Value) -> (ScriptSummary, String, String, usize) {
    let mut bench = Workbench::new(&Config::default(), FixedSolver(reply, RefCell::new(0)));
    let mut out = Vec::new();
    let mut err = Vec::new();
    let summary = run_script(&mut bench, script.as_bytes(), &mut out, &mut err).unwrap();
    let calls = *bench.gateway().transport().1.borrow();
    (
        summary,
        String::from_utf8(out).unwrap(),
        String::from_utf8(err).unwrap(),
        calls,
    )
}

#[test]
fn test_rc_circuit_session() {
    let script = "\
# RC low-pass driven by an AC source
kind AC
click 0-0
click 2-0
value AC_0-0_2-0 ac 1 0
kind R
click 2-0
click 2-3
value R_2-0_2-3 1k
kind C
click 2-3
click 0-3
value C_2-3_0-3 100n
kind W
click 0-3
click 0-0
spice
simulate ac 1k
show R_2-0_2-3
voltage 2-3
results
";
    let reply = json!({
        "voltages": {"V_node_1": 1.0, "V_node_2": 0.847},
        "current": {"I_VAC1": -0.000153, "I_R1": 0.000153, "I_C1": 0.000153}
    });
    let (summary, out, err, calls) = replay(script, reply);
    assert_eq!(err, "");
    assert_eq!(summary, ScriptSummary { commands: 20, failures: 0 });
    assert_eq!(calls, 1);

    let expected = "\
placed AC_0-0_2-0
placed R_2-0_2-3
placed C_2-3_0-3
placed W_0-3_0-0
* ground node 0
VAC1 0 1 AC 1 0
R1 1 2 1k
C1 2 3 100n
W1 3 0 1
.end
simulated: 2 voltages, 3 currents
R1: V = 153.000 mV, I = 153.000 µA
2-3: 847.000 mV
Variable,Value
V_node_1,1
V_node_2,0.847
I_C1,0.000153
I_R1,0.000153
I_VAC1,-0.000153
";
    assert_eq!(out, expected);
}

#[test]
fn test_ground_button_and_errors() {
    let script = "\
kind R
click 0-0
click 0-1
remove R_0-0_0-1
netlist
click 0-1
ground
click 0-2
netlist
ground 99-0
";
    let (summary, out, err, calls) = replay(script, json!({}));
    assert_eq!(calls, 0);
    assert_eq!(summary.failures, 2);

    let errors: Vec<&str> = err.lines().collect();
    assert_eq!(errors.len(), 2);
    assert!(errors[0].starts_with("line 5:"));
    assert!(errors[0].contains("ground"));
    assert!(errors[1].starts_with("line 10:"));

    assert!(out.contains("ground 0-1\n"));
    let json_start = out.find('{').unwrap();
    let json_end = out.rfind('}').unwrap();
    let netlist: Value = serde_json::from_str(&out[json_start..=json_end]).unwrap();
    assert_eq!(netlist["groundNode"], 0);
    assert_eq!(netlist["components"][0]["node1"], 0);
    assert_eq!(netlist["components"][0]["node2"], 1);
}
