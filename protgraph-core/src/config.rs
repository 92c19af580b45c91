use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Pair-enumeration strategy for the similarity builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BuildStrategy {
    /// Compare every unordered pair: `n(n-1)/2` comparisons.
    Exhaustive,
    /// Compare only pairs sharing at least one domain.
    #[default]
    InvertedIndex,
}

/// Top-level configuration, matching `protgraph.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtGraphConfig {
    #[serde(default)]
    pub input: InputSection,
    #[serde(default)]
    pub graph: GraphSection,
    #[serde(default)]
    pub annotate: AnnotateSection,
    #[serde(default)]
    pub evaluate: EvaluateSection,
    #[serde(default)]
    pub store: StoreSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputSection {
    /// Keep only the first N normalized records.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSection {
    pub similarity_threshold: f64,
    pub strategy: BuildStrategy,
    pub parallel: bool,
    /// Drop edges from earlier builds before persisting a new one.
    pub replace_edges: bool,
}

impl Default for GraphSection {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.3,
            strategy: BuildStrategy::InvertedIndex,
            parallel: true,
            replace_edges: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotateSection {
    pub similarity_threshold: f64,
    pub top_n: usize,
    pub min_weight: f64,
}

impl Default for AnnotateSection {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.2,
            top_n: 5,
            min_weight: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluateSection {
    pub sample_size: usize,
}

impl Default for EvaluateSection {
    fn default() -> Self {
        Self { sample_size: 100 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("protgraph.db"),
        }
    }
}

impl ProtGraphConfig {
    /// Parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit_interval("graph.similarity_threshold", self.graph.similarity_threshold)?;
        check_unit_interval(
            "annotate.similarity_threshold",
            self.annotate.similarity_threshold,
        )?;
        if self.annotate.top_n == 0 {
            return Err(ConfigError::Invalid("annotate.top_n must be at least 1".into()));
        }
        if self.annotate.min_weight.is_nan() || self.annotate.min_weight < 0.0 {
            return Err(ConfigError::Invalid(
                "annotate.min_weight must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

fn check_unit_interval(key: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{key} must be within [0, 1], got {value}"
        )))
    }
}
