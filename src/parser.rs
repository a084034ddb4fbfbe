//! Text parsers: terminal ids, engineering values and session-script commands.
//!
//! # Script syntax
//!
//! ```text
//! # comment
//! kind <CODE>                          (W R C L V AC Diode NpnTransistor ...)
//! click <row>-<col>
//! ground [<row>-<col>]                 (defaults to the selected terminal)
//! value <id> <text>
//! value <id> ac <magnitude> <phase>
//! value <id> vc <gain> <dep1> <dep2>
//! value <id> cc <gain> <branch>
//! value <id> line <impedance> <length>
//! remove <id>
//! show <id>
//! voltage <row>-<col>
//! nodes | netlist | spice | generate | results
//! simulate [dc|ac|transient [frequency]]
//! parameter <z|y|s> <frequency> [ports <p1n1> <p1n2> <p2n1> <p2n2>]
//!           [z0 <z01> [<z02>]] [sweep <start> <stop>]
//! ```
//!
//! Numbers accept engineering suffixes: T, G, MEG, K, M, U, N, P, F
//! (case-insensitive).

use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_while1};
use nom::character::complete::{char, digit1, space0, space1};
use nom::combinator::{all_consuming, map, map_res, opt, rest};
use nom::number::complete::double;
use nom::sequence::separated_pair;
use nom::IResult;
use nom::Parser;

use crate::error::{GridSpiceError, Result};
use crate::gateway::{AnalysisType, ParameterRequest, ParameterType, PortNodes};
use crate::ir::{ComponentId, ComponentKind, ComponentValue, NodeNumber, Terminal};

/// One line of a session script.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Kind(ComponentKind),
    Click(Terminal),
    Ground(Option<Terminal>),
    Value(ComponentId, ComponentValue),
    Remove(ComponentId),
    Show(ComponentId),
    Voltage(Terminal),
    Nodes,
    Netlist,
    Spice,
    Generate,
    Results,
    Simulate {
        analysis: Option<AnalysisType>,
        frequency: Option<f64>,
    },
    Parameter(ParameterRequest),
}

/// Parse a terminal id of the form `"<row>-<col>"`.
pub fn parse_terminal(text: &str) -> Result<Terminal> {
    all_consuming(terminal)
        .parse(text.trim())
        .map(|(_, t)| t)
        .map_err(|_| GridSpiceError::Parse(format!("invalid terminal '{}', expected <row>-<col>", text.trim())))
}

/// Parse a number with optional engineering suffix (`10k`, `4.7u`, `1MEG`).
pub fn parse_value(text: &str) -> Result<f64> {
    all_consuming(eng_value)
        .parse(text.trim())
        .map(|(_, v)| v)
        .map_err(|_| GridSpiceError::Parse(format!("invalid number '{}'", text.trim())))
}

/// Parse one script line. Blank lines and `#` comments yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (args, word) = command_word(line)
        .map_err(|_| GridSpiceError::Parse(format!("expected a command in: {}", line)))?;
    let args = args.trim();
    let tokens: Vec<&str> = args.split_whitespace().collect();

    let command = match word.to_ascii_lowercase().as_str() {
        "kind" => {
            let code = single(&tokens, "kind <CODE>")?;
            let kind = ComponentKind::from_code(code)
                .ok_or_else(|| GridSpiceError::Parse(format!("unknown component code '{}'", code)))?;
            Command::Kind(kind)
        }
        "click" => Command::Click(parse_terminal(single(&tokens, "click <row>-<col>")?)?),
        "ground" => match tokens.as_slice() {
            [] => Command::Ground(None),
            [t] => Command::Ground(Some(parse_terminal(t)?)),
            _ => return Err(usage("ground [<row>-<col>]")),
        },
        "value" => parse_value_command(args)?,
        "remove" => Command::Remove(ComponentId::from(single(&tokens, "remove <id>")?)),
        "show" => Command::Show(ComponentId::from(single(&tokens, "show <id>")?)),
        "voltage" => Command::Voltage(parse_terminal(single(&tokens, "voltage <row>-<col>")?)?),
        "nodes" => bare(&tokens, Command::Nodes, "nodes")?,
        "netlist" => bare(&tokens, Command::Netlist, "netlist")?,
        "spice" => bare(&tokens, Command::Spice, "spice")?,
        "generate" => bare(&tokens, Command::Generate, "generate")?,
        "results" => bare(&tokens, Command::Results, "results")?,
        "simulate" => match tokens.as_slice() {
            [] => Command::Simulate {
                analysis: None,
                frequency: None,
            },
            [kind] => Command::Simulate {
                analysis: Some(kind.parse()?),
                frequency: None,
            },
            [kind, freq] => Command::Simulate {
                analysis: Some(kind.parse()?),
                frequency: Some(parse_value(freq)?),
            },
            _ => return Err(usage("simulate [dc|ac|transient [frequency]]")),
        },
        "parameter" => Command::Parameter(parse_parameter_args(&tokens)?),
        other => return Err(GridSpiceError::Parse(format!("unknown command '{}'", other))),
    };
    Ok(Some(command))
}

// ---------------------------------------------------------------------------
// Token parsers
// ---------------------------------------------------------------------------

fn terminal(input: &str) -> IResult<&str, Terminal> {
    map(
        separated_pair(
            map_res(digit1, |s: &str| s.parse::<u16>()),
            char('-'),
            map_res(digit1, |s: &str| s.parse::<u16>()),
        ),
        |(row, col)| Terminal::new(row, col),
    )
    .parse(input)
}

fn command_word(input: &str) -> IResult<&str, &str> {
    map((take_while1(|c: char| c.is_ascii_alphabetic()), space0), |(word, _)| word).parse(input)
}

/// Split `value <id> <payload>` and decode the payload by its keyword.
fn parse_value_command(args: &str) -> Result<Command> {
    const USAGE: &str = "value <id> <text> | ac <mag> <phase> | vc <gain> <dep1> <dep2> | cc <gain> <branch> | line <z> <length>";

    let (_, (id, _, payload)) = (
        take_while1(|c: char| !c.is_whitespace()),
        space1,
        rest,
    )
        .parse(args)
        .map_err(|_: nom::Err<nom::error::Error<&str>>| usage(USAGE))?;

    let payload = payload.trim();
    let (_, shape) = opt((value_shape, space1))
        .parse(payload)
        .map_err(|_: nom::Err<nom::error::Error<&str>>| usage(USAGE))?;
    let tokens: Vec<&str> = payload.split_whitespace().skip(1).collect();

    let value = match (shape.map(|(s, _)| s), tokens.as_slice()) {
        (Some("ac"), [magnitude, phase]) => ComponentValue::Ac {
            magnitude: magnitude.to_string(),
            phase: phase.to_string(),
        },
        (Some("vc"), [gain, dep1, dep2]) => ComponentValue::VoltageControlled {
            gain: gain.to_string(),
            dependent_node1: dep1.to_string(),
            dependent_node2: dep2.to_string(),
        },
        (Some("cc"), [gain, branch]) => ComponentValue::CurrentControlled {
            gain: gain.to_string(),
            control_branch: branch.to_string(),
        },
        (Some("line"), [impedance, length]) => ComponentValue::Line {
            impedance: impedance.to_string(),
            electrical_length: length.to_string(),
        },
        (Some(_), _) => return Err(usage(USAGE)),
        (None, _) if payload.is_empty() => return Err(usage(USAGE)),
        // Unvalidated: anything else is stored verbatim.
        (None, _) => ComponentValue::scalar(payload),
    };
    Ok(Command::Value(ComponentId::from(id), value))
}

fn value_shape(input: &str) -> IResult<&str, &'static str> {
    alt((
        map(tag_no_case("ac"), |_: &str| "ac"),
        map(tag_no_case("vc"), |_: &str| "vc"),
        map(tag_no_case("cc"), |_: &str| "cc"),
        map(tag_no_case("line"), |_: &str| "line"),
    ))
    .parse(input)
}

/// `<z|y|s> <frequency> [ports a b c d] [z0 a [b]] [sweep start stop]`
fn parse_parameter_args(tokens: &[&str]) -> Result<ParameterRequest> {
    const USAGE: &str =
        "parameter <z|y|s> <frequency> [ports <p1n1> <p1n2> <p2n1> <p2n2>] [z0 <z01> [<z02>]] [sweep <start> <stop>]";

    let (kind, frequency, mut rest) = match tokens {
        [kind, frequency, rest @ ..] => (kind.parse::<ParameterType>()?, parse_value(frequency)?, rest),
        _ => return Err(usage(USAGE)),
    };

    let mut request = ParameterRequest::new(kind, frequency);
    while let Some((keyword, tail)) = rest.split_first() {
        rest = match (keyword.to_ascii_lowercase().as_str(), tail) {
            ("ports", [a, b, c, d, tail @ ..]) => {
                request.ports = PortNodes::new(node(a)?, node(b)?, node(c)?, node(d)?);
                tail
            }
            ("z0", [a, tail @ ..]) => {
                let z01 = parse_value(a)?;
                match tail.split_first() {
                    Some((b, tail)) if parse_value(b).is_ok() => {
                        request.reference_impedance = [z01, parse_value(b)?];
                        tail
                    }
                    _ => {
                        request.reference_impedance = [z01, z01];
                        tail
                    }
                }
            }
            ("sweep", [start, stop, tail @ ..]) => {
                request.sweep = Some((parse_value(start)?, parse_value(stop)?));
                tail
            }
            _ => return Err(usage(USAGE)),
        };
    }
    Ok(request)
}

fn node(text: &str) -> Result<NodeNumber> {
    text.parse()
        .map_err(|_| GridSpiceError::Parse(format!("invalid node number '{}'", text)))
}

fn single<'a>(tokens: &[&'a str], usage_text: &str) -> Result<&'a str> {
    match tokens {
        [one] => Ok(*one),
        _ => Err(usage(usage_text)),
    }
}

fn bare(tokens: &[&str], command: Command, usage_text: &str) -> Result<Command> {
    if tokens.is_empty() {
        Ok(command)
    } else {
        Err(usage(usage_text))
    }
}

fn usage(text: &str) -> GridSpiceError {
    GridSpiceError::Parse(format!("usage: {}", text))
}

// ---------------------------------------------------------------------------
// Engineering suffix value parser
// ---------------------------------------------------------------------------

/// Parse a numeric value with optional engineering suffix.
/// Handles: 10k, 100n, 4.7u, 1MEG, 1e3, -3.3, etc.
fn eng_value(input: &str) -> IResult<&str, f64> {
    let (rest, num) = double(input)?;
    let (rest, suffix) = opt(eng_suffix).parse(rest)?;
    let multiplier = suffix.unwrap_or(1.0);
    Ok((rest, num * multiplier))
}

/// Match an engineering suffix and return its multiplier.
fn eng_suffix(input: &str) -> IResult<&str, f64> {
    // Order matters: MEG must come before M
    alt((
        map(tag_no_case("MEG"), |_: &str| 1e6),
        map(tag_no_case("T"), |_: &str| 1e12),
        map(tag_no_case("G"), |_: &str| 1e9),
        map(tag_no_case("K"), |_: &str| 1e3),
        map(tag_no_case("M"), |_: &str| 1e-3),
        map(tag_no_case("U"), |_: &str| 1e-6),
        map(tag_no_case("N"), |_: &str| 1e-9),
        map(tag_no_case("P"), |_: &str| 1e-12),
        map(tag_no_case("F"), |_: &str| 1e-15),
    ))
    .parse(input)
}
