use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WeftError};

/// Top-level Weft configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub graph: GraphConfig,
}

/// Message-bus orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Participant that receives the initial input envelope.
    #[serde(default = "default_entry")]
    pub entry: String,
    /// Payload action marking the terminal envelope.
    #[serde(default = "default_terminal_action")]
    pub terminal_action: String,
    /// Cap on breadth-first delivery rounds.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            terminal_action: default_terminal_action(),
            max_rounds: default_max_rounds(),
        }
    }
}

/// Graph orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Context field holding the final artifact.
    #[serde(default = "default_artifact_field")]
    pub artifact_field: String,
    /// Fields seeded as empty defaults in the initial context.
    #[serde(default)]
    pub declared_fields: Vec<String>,
    /// Per-step revisit cap for cyclic configurations. 0 disables the guard.
    #[serde(default = "default_revisit_limit")]
    pub revisit_limit: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            artifact_field: default_artifact_field(),
            declared_fields: Vec::new(),
            revisit_limit: default_revisit_limit(),
        }
    }
}

impl GraphConfig {
    /// The revisit limit as the engine expects it (`None` = disabled).
    pub fn revisit_limit_opt(&self) -> Option<usize> {
        if self.revisit_limit == 0 {
            None
        } else {
            Some(self.revisit_limit)
        }
    }
}

fn default_entry() -> String {
    "Coordinator".to_string()
}

fn default_terminal_action() -> String {
    "final_result".to_string()
}

fn default_max_rounds() -> usize {
    64
}

fn default_artifact_field() -> String {
    "final_output".to_string()
}

fn default_revisit_limit() -> usize {
    25
}

impl AppConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| WeftError::ConfigNotFound(path.display().to_string()))?;

        toml::from_str(&content).map_err(|e| WeftError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bus.entry, "Coordinator");
        assert_eq!(config.bus.terminal_action, "final_result");
        assert_eq!(config.bus.max_rounds, 64);
        assert_eq!(config.graph.artifact_field, "final_output");
        assert_eq!(config.graph.revisit_limit_opt(), Some(25));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [bus]
            entry = "Router"
            "#,
        )
        .unwrap();
        assert_eq!(config.bus.entry, "Router");
        assert_eq!(config.bus.terminal_action, "final_result");
        assert_eq!(config.graph.artifact_field, "final_output");
    }

    #[test]
    fn test_zero_revisit_limit_disables_guard() {
        let config: AppConfig = toml::from_str(
            r#"
            [graph]
            revisit_limit = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.graph.revisit_limit_opt(), None);
    }
}
