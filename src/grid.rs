//! Fixed terminal grid.

use crate::config::GridConfig;
use crate::error::TopologyError;
use crate::ir::Terminal;

/// A fixed `rows x cols` grid of addressable terminals.
///
/// The grid holds no state beyond its dimensions; terminals exist for the
/// lifetime of the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalGrid {
    rows: u16,
    cols: u16,
    dot_radius: f64,
    gap: f64,
}

impl Default for TerminalGrid {
    fn default() -> Self {
        Self::from_config(&GridConfig::default())
    }
}

impl TerminalGrid {
    pub fn new(rows: u16, cols: u16) -> Self {
        let defaults = GridConfig::default();
        Self {
            rows,
            cols,
            dot_radius: defaults.dot_radius,
            gap: defaults.gap,
        }
    }

    pub fn from_config(config: &GridConfig) -> Self {
        Self {
            rows: config.rows,
            cols: config.cols,
            dot_radius: config.dot_radius,
            gap: config.gap,
        }
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    pub fn cols(&self) -> u16 {
        self.cols
    }

    pub fn contains(&self, terminal: &Terminal) -> bool {
        terminal.row < self.rows && terminal.col < self.cols
    }

    /// Look up a terminal, failing if it is off the grid.
    pub fn terminal(&self, row: u16, col: u16) -> Result<Terminal, TopologyError> {
        let t = Terminal::new(row, col);
        self.check(&t)?;
        Ok(t)
    }

    pub fn check(&self, terminal: &Terminal) -> Result<(), TopologyError> {
        if self.contains(terminal) {
            Ok(())
        } else {
            Err(TopologyError::OffGrid(*terminal, self.rows, self.cols))
        }
    }

    /// Drawing-surface centre of a terminal, for rendering adapters.
    pub fn position(&self, terminal: &Terminal) -> (f64, f64) {
        let pitch = 2.0 * self.dot_radius + self.gap;
        (
            terminal.col as f64 * pitch + self.dot_radius,
            terminal.row as f64 * pitch + self.dot_radius,
        )
    }

    /// All terminals in row-major order.
    pub fn terminals(&self) -> impl Iterator<Item = Terminal> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Terminal::new(row, col)))
    }
}
