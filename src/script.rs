//! Replays session scripts against a [`Workbench`].

use std::io::{BufRead, Write};

use crate::error::Result;
use crate::gateway::Transport;
use crate::output;
use crate::parser::{self, Command};
use crate::selection::SelectionEvent;
use crate::session::Workbench;

/// Outcome of a script run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptSummary {
    pub commands: usize,
    pub failures: usize,
}

/// Run every line of `input`. Command output goes to `out`; a failing line
/// is reported on `err` and the run continues.
pub fn run_script<T, R, W, E>(bench: &mut Workbench<T>, input: R, out: &mut W, err: &mut E) -> Result<ScriptSummary>
where
    T: Transport,
    R: BufRead,
    W: Write,
    E: Write,
{
    let mut summary = ScriptSummary::default();
    for (line_num, line) in input.lines().enumerate() {
        let line = line?;
        let outcome = parser::parse_command(&line).and_then(|command| match command {
            Some(command) => {
                summary.commands += 1;
                execute(bench, &command, out)
            }
            None => Ok(()),
        });
        if let Err(e) = outcome {
            summary.failures += 1;
            tracing::warn!(line = line_num + 1, error = %e, "command failed");
            writeln!(err, "line {}: {}", line_num + 1, e)?;
        }
    }
    Ok(summary)
}

/// Apply one command.
pub fn execute<T: Transport, W: Write>(bench: &mut Workbench<T>, command: &Command, out: &mut W) -> Result<()> {
    match command {
        Command::Kind(kind) => bench.set_kind(*kind),
        Command::Click(terminal) => {
            let click = bench.click(*terminal)?;
            if let Some(id) = &click.placed {
                writeln!(out, "placed {}", id)?;
            } else if click.event == SelectionEvent::Ignored {
                writeln!(out, "ignored")?;
            }
        }
        Command::Ground(terminal) => {
            let grounded = bench.set_ground(*terminal)?;
            writeln!(out, "ground {}", grounded)?;
        }
        Command::Value(id, value) => bench.set_value(id, value.clone())?,
        Command::Remove(id) => bench.remove(id)?,
        Command::Show(id) => writeln!(out, "{}", bench.readout(id)?)?,
        Command::Voltage(terminal) => {
            bench.topology().grid().check(terminal)?;
            let label = bench
                .annotator()
                .terminal_label(terminal)
                .unwrap_or_else(|| "unassigned".to_string());
            writeln!(out, "{}: {}", terminal, label)?;
        }
        Command::Nodes => {
            for (terminal, node) in bench.topology().nodes().iter() {
                writeln!(out, "{} {}", terminal, node)?;
            }
        }
        Command::Netlist => {
            let netlist = bench.build_netlist()?;
            serde_json::to_writer_pretty(&mut *out, netlist)?;
            writeln!(out)?;
        }
        Command::Spice => {
            let netlist = bench.build_netlist()?;
            output::write_spice(netlist, out)?;
        }
        Command::Generate => {
            let text = bench.render_remote()?;
            writeln!(out, "{}", text.trim_end())?;
        }
        Command::Simulate { analysis, frequency } => {
            let response = bench.simulate(*analysis, *frequency)?;
            writeln!(
                out,
                "simulated: {} voltages, {} currents",
                response.voltages.len(),
                response.current.len()
            )?;
        }
        Command::Parameter(request) => {
            let response = bench.evaluate_parameters(request)?;
            output::write_parameters_csv(response, out)?;
        }
        Command::Results => match bench.last_response() {
            Some(response) => output::write_results_csv(response, out)?,
            None => writeln!(out, "No data")?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::gateway::OfflineTransport;

    fn run(script: &str) -> (ScriptSummary, String, String) {
        let mut bench = Workbench::new(&Config::default(), OfflineTransport);
        let mut out = Vec::new();
        let mut err = Vec::new();
        let summary = run_script(&mut bench, script.as_bytes(), &mut out, &mut err).unwrap();
        (
            summary,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_errors_do_not_stop_the_script() {
        let (summary, out, err) = run("\
# resistor then a bad line
kind R
click 0-0
click 0-1
bogus
nodes
");
        assert_eq!(summary, ScriptSummary { commands: 4, failures: 1 });
        assert_eq!(out, "placed R_0-0_0-1\n0-0 0\n0-1 1\n");
        assert!(err.starts_with("line 5:"));
    }

    #[test]
    fn test_offline_simulate_reports_error() {
        let (summary, out, err) = run("click 0-0\nclick 1-0\nsimulate dc\nresults\n");
        assert_eq!(summary.failures, 1);
        assert!(err.contains("offline"));
        assert!(out.ends_with("No data\n"));
    }
}
