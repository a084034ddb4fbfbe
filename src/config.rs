//! Workbench configuration.
//!
//! Loaded from a TOML file; every section and key is optional.
//!
//! ```toml
//! [server]
//! base_url = "http://127.0.0.1:8000"
//! simulation_path = "/simulation"
//! parameter_path = "/parameter"
//! netlist_path = "/"
//!
//! [grid]
//! rows = 17
//! cols = 20
//!
//! [analysis]
//! kind = "ac"
//! frequency = 1e3
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{GridSpiceError, Result};
use crate::gateway::AnalysisType;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub grid: GridConfig,
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub base_url: String,
    pub simulation_path: String,
    pub parameter_path: String,
    pub netlist_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            simulation_path: "/simulation".to_string(),
            parameter_path: "/parameter".to_string(),
            netlist_path: "/".to_string(),
        }
    }
}

/// Grid dimensions and drawing geometry (pixels).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    pub rows: u16,
    pub cols: u16,
    pub dot_radius: f64,
    pub gap: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 17,
            cols: 20,
            dot_radius: 4.0,
            gap: 40.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub kind: AnalysisType,
    /// Hz; only meaningful for AC analysis.
    pub frequency: f64,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)
            .map_err(|e| GridSpiceError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| GridSpiceError::Config(e.to_string()))?;
        if config.grid.rows == 0 || config.grid.cols == 0 {
            return Err(GridSpiceError::Config(format!(
                "grid must have at least one row and column, got {}x{}",
                config.grid.rows, config.grid.cols
            )));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.grid.rows, 17);
        assert_eq!(config.grid.cols, 20);
        assert_eq!(config.server.simulation_path, "/simulation");
        assert_eq!(config.analysis.kind, AnalysisType::Dc);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::from_toml_str(
            r#"
            [server]
            base_url = "http://solver:5000"

            [analysis]
            kind = "ac"
            frequency = 1e3
            "#,
        )
        .unwrap();
        assert_eq!(config.server.base_url, "http://solver:5000");
        assert_eq!(config.server.parameter_path, "/parameter");
        assert_eq!(config.analysis.kind, AnalysisType::Ac);
        assert_eq!(config.analysis.frequency, 1e3);
        assert_eq!(config.grid, GridConfig::default());
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            Config::from_toml_str("[grid]\nrows = 0"),
            Err(GridSpiceError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[grid]\nlayers = 3"),
            Err(GridSpiceError::Config(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[analysis]\nkind = \"noise\""),
            Err(GridSpiceError::Config(_))
        ));
    }
}
