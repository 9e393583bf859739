use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Order in which the coverability builder takes nodes off its worklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExplorationOrder {
    #[default]
    BreadthFirst,
    DepthFirst,
}

/// Start states considered by the smallest-cycle search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CycleMode {
    /// Cycles through any state.
    #[default]
    AllStates,
    /// Only cycles returning to the initial state.
    InitialState,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Maximum number of coverability nodes. None means unlimited.
    #[serde(default)]
    pub state_limit: Option<usize>,
    #[serde(default)]
    pub exploration_order: ExplorationOrder,
    #[serde(default)]
    pub cycle_mode: CycleMode,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            state_limit: None,
            exploration_order: ExplorationOrder::default(),
            cycle_mode: CycleMode::default(),
            timeout_ms: None,
        }
    }
}

impl AnalysisConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn with_state_limit(mut self, limit: Option<usize>) -> Self {
        self.state_limit = limit;
        self
    }

    pub fn with_exploration_order(mut self, order: ExplorationOrder) -> Self {
        self.exploration_order = order;
        self
    }
}
