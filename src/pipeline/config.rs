use crate::error::ConfigError;
use crate::pipeline::stream::Stage;
use crate::stages::ltsv::{LtsvConfig, LtsvStage};
use serde::Deserialize;
use std::path::Path;

/// Configuration for pipeline behavior
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub error_strategy: ErrorStrategy,
    pub debug: bool,
    pub max_line_length: usize,
    pub keys: Option<Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            error_strategy: ErrorStrategy::Skip,
            debug: false,
            max_line_length: 1048576, // 1MB
            keys: None,
        }
    }
}

/// Simple error handling strategy
#[derive(Debug, Clone)]
pub enum ErrorStrategy {
    /// Skip problematic lines and continue processing
    Skip,
    /// Stop processing on first error
    FailFast,
}

/// One entry of `pipeline_stages`, keyed by stage type.
///
/// A stage key with an empty body (`- ltsv:`) decodes to `None`, which the
/// stage itself rejects when it is built.
#[derive(Debug, Clone, PartialEq)]
pub enum StageConfig {
    Ltsv(Option<LtsvConfig>),
}

impl StageConfig {
    pub fn stage_type(&self) -> &'static str {
        match self {
            StageConfig::Ltsv(_) => crate::stages::ltsv::STAGE_TYPE_LTSV,
        }
    }

    /// Validate the configuration and construct the stage it describes
    pub fn build(&self, debug: bool) -> Result<Box<dyn Stage>, ConfigError> {
        match self {
            StageConfig::Ltsv(cfg) => Ok(Box::new(LtsvStage::new(cfg.clone(), debug)?)),
        }
    }
}

/// Decode a single stage from a generic document node.
///
/// Expects a mapping with exactly one key naming the stage type.
pub fn decode_stage(value: &serde_yaml::Value) -> Result<StageConfig, ConfigError> {
    let mapping = value
        .as_mapping()
        .ok_or_else(|| ConfigError::Decode("stage must be a mapping".to_string()))?;

    if mapping.len() != 1 {
        return Err(ConfigError::Decode(format!(
            "stage must have exactly one type key, found {}",
            mapping.len()
        )));
    }

    let Some((key, body)) = mapping.iter().next() else {
        return Err(ConfigError::Decode("empty stage".to_string()));
    };
    let stage_type = key
        .as_str()
        .ok_or_else(|| ConfigError::Decode("stage type must be a string".to_string()))?;

    match stage_type {
        "ltsv" => Ok(StageConfig::Ltsv(serde_yaml::from_value(body.clone())?)),
        other => Err(ConfigError::UnknownStage(other.to_string())),
    }
}

/// A pipeline definition as written in a YAML (or JSON) file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineDefinition {
    pub stages: Vec<StageConfig>,
}

#[derive(Deserialize)]
struct RawDefinition {
    #[serde(default)]
    pipeline_stages: Vec<serde_yaml::Value>,
}

impl PipelineDefinition {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let raw: RawDefinition = serde_yaml::from_str(text)?;
        let stages = raw
            .pipeline_stages
            .iter()
            .map(decode_stage)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PipelineDefinition { stages })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
