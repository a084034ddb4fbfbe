//! Grid-based circuit topology engine.
//!
//! Components are placed between terminals of a fixed grid; the engine keeps
//! canonical node numbers for every referenced terminal, builds a
//! solver-facing netlist on demand, ships it to a remote SPICE-style solver
//! and maps the reply back onto the placed components.

pub mod annotate;
pub mod config;
pub mod error;
pub mod gateway;
pub mod grid;
pub mod ir;
pub mod netlist;
pub mod numbering;
pub mod output;
pub mod parser;
pub mod script;
pub mod selection;
pub mod session;
pub mod topology;
pub mod values;
