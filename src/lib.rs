// src/lib.rs
pub mod error;
pub mod pipeline;
pub mod stages;
pub mod stringify;

pub use error::*;
pub use pipeline::*;

pub use pipeline::config::{ErrorStrategy, PipelineConfig, PipelineDefinition, StageConfig};
pub use pipeline::context::{Entry, Extracted, LabelSet, ProcessingStats};
pub use pipeline::stream::{Stage, StreamPipeline};
pub use stages::{LtsvConfig, LtsvStage};
pub use stringify::{Stringify, ValueStringifier};
