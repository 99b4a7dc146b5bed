// src/pipeline/stream.rs
use chrono::{DateTime, Utc};
use std::io::{BufRead, Write};
use std::time::Instant;
use tracing::{debug, warn};

use crate::error::{ConfigError, ProcessingError};
use crate::pipeline::config::{ErrorStrategy, PipelineConfig, PipelineDefinition};
use crate::pipeline::context::{Entry, Extracted, LabelSet, PipelineContext, ProcessingStats};

/// A single transformation applied to every log line.
///
/// Stages hold no per-line state, so one instance may serve many threads as
/// long as each call gets its own `extracted` map. Failures are never
/// reported through the call; a stage that cannot do its work leaves the
/// entry alone.
pub trait Stage: Send + Sync {
    fn process(
        &self,
        labels: &LabelSet,
        extracted: &mut Extracted,
        timestamp: &mut DateTime<Utc>,
        line: Option<&str>,
    );

    /// Stage type, used for attribution in logs
    fn name(&self) -> &str;
}

/// Main pipeline orchestrator
pub struct StreamPipeline {
    stages: Vec<Box<dyn Stage>>,
    context: PipelineContext,
    config: PipelineConfig,
    stats: ProcessingStats,
}

impl StreamPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        StreamPipeline {
            stages: Vec::new(),
            context: PipelineContext::new(),
            config,
            stats: ProcessingStats::default(),
        }
    }

    /// Build every stage of a definition, failing on the first invalid one
    pub fn from_definition(
        definition: &PipelineDefinition,
        config: PipelineConfig,
    ) -> Result<Self, ConfigError> {
        let mut pipeline = StreamPipeline::new(config);
        for (idx, stage_config) in definition.stages.iter().enumerate() {
            let stage = stage_config.build(pipeline.config.debug).map_err(|e| {
                warn!(stage = idx, stage_type = stage_config.stage_type(), "invalid stage: {}", e);
                e
            })?;
            pipeline.add_stage(stage);
        }
        Ok(pipeline)
    }

    pub fn add_stage(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn get_config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one line through all stages, starting from an empty extracted map
    pub fn process_line(&self, line: Option<&str>) -> Entry {
        let mut entry = Entry::new(line.map(str::to_owned));
        self.run_stages(&mut entry);
        entry
    }

    /// Run all stages over an entry the caller already populated
    pub fn run_stages(&self, entry: &mut Entry) {
        for stage in &self.stages {
            stage.process(
                &entry.labels,
                &mut entry.extracted,
                &mut entry.timestamp,
                entry.line.as_deref(),
            );
        }
    }

    /// Process a single file/stream, writing one JSON object per line
    pub fn process_stream<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        output: &mut W,
        filename: Option<&str>,
    ) -> Result<ProcessingStats, ProcessingError> {
        let start_time = Instant::now();

        self.context.file_name = filename.map(|s| s.to_string());
        self.context.line_number = 0;

        let mut file_stats = ProcessingStats::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match input.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(ProcessingError::IoError(e)),
            }
            trim_line_ending(&mut buf);

            self.context.line_number += 1;
            file_stats.records_processed += 1;

            let line = match self.check_line(&buf) {
                Ok(line) => line,
                Err(error) => match self.config.error_strategy {
                    ErrorStrategy::FailFast => return Err(error),
                    ErrorStrategy::Skip => {
                        file_stats.errors += 1;
                        debug!(
                            file = self.context.file_name.as_deref(),
                            line = self.context.line_number,
                            "skipping line: {}",
                            error
                        );
                        continue;
                    }
                },
            };

            let entry = self.process_line(Some(line));
            let fields = self.select_keys(entry.extracted);

            if fields.is_empty() {
                file_stats.records_skipped += 1;
                debug!(
                    file = self.context.file_name.as_deref(),
                    line = self.context.line_number,
                    "no fields extracted"
                );
                continue;
            }

            if let Err(e) = self.write_fields(output, &fields) {
                if is_broken_pipe(&e) {
                    break;
                }
                return Err(e);
            }
            file_stats.records_output += 1;
        }

        file_stats.processing_time = start_time.elapsed();
        self.stats.merge(&file_stats);

        Ok(file_stats)
    }

    /// Reject lines the stages should not see
    fn check_line<'a>(&self, bytes: &'a [u8]) -> Result<&'a str, ProcessingError> {
        if bytes.len() > self.config.max_line_length {
            return Err(ProcessingError::LineTooLong {
                length: bytes.len(),
                max_length: self.config.max_line_length,
            });
        }
        std::str::from_utf8(bytes).map_err(|_| ProcessingError::InvalidUtf8 {
            line: self.context.line_number,
        })
    }

    fn select_keys(&self, extracted: Extracted) -> Extracted {
        match &self.config.keys {
            Some(keys) => keys
                .iter()
                .filter_map(|k| extracted.get(k).map(|v| (k.clone(), v.clone())))
                .collect(),
            None => extracted,
        }
    }

    fn write_fields<W: Write>(
        &self,
        output: &mut W,
        fields: &Extracted,
    ) -> Result<(), ProcessingError> {
        let json = serde_json::to_string(fields)?;
        writeln!(output, "{}", json)?;
        Ok(())
    }

    /// Get current accumulated stats
    pub fn get_stats(&self) -> &ProcessingStats {
        &self.stats
    }
}

fn trim_line_ending(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}

fn is_broken_pipe(err: &ProcessingError) -> bool {
    matches!(err, ProcessingError::IoError(e) if e.kind() == std::io::ErrorKind::BrokenPipe)
}
