// src/stages/ltsv.rs
use crate::error::ConfigError;
use crate::pipeline::context::{Extracted, LabelSet};
use crate::pipeline::stream::Stage;
use crate::stringify::{value_kind, Stringify, ValueStringifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, debug_span, Span};

pub const STAGE_TYPE_LTSV: &str = "ltsv";

const RECORD_SEPARATOR: char = '\t';
const LABEL_SEPARATOR: char = ':';

/// Configuration of an `ltsv` stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LtsvConfig {
    /// Extracted field to parse instead of the log line
    #[serde(default)]
    pub source: Option<String>,
}

impl LtsvConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.source.as_deref() {
            Some("") => Err(ConfigError::EmptySource),
            _ => Ok(()),
        }
    }
}

/// Parses LTSV (`label:value` pairs separated by tabs) into extracted fields
pub struct LtsvStage {
    cfg: LtsvConfig,
    debug: bool,
    stringifier: Arc<dyn Stringify>,
    span: Span,
}

impl LtsvStage {
    pub fn new(config: Option<LtsvConfig>, debug: bool) -> Result<Self, ConfigError> {
        let cfg = config.ok_or(ConfigError::EmptyConfig)?;
        cfg.validate()?;

        Ok(LtsvStage {
            cfg,
            debug,
            stringifier: Arc::new(ValueStringifier),
            span: debug_span!("stage", component = "stage", stage_type = STAGE_TYPE_LTSV),
        })
    }

    /// Replace the coercion used for `source` values
    pub fn with_stringifier(mut self, stringifier: Arc<dyn Stringify>) -> Self {
        self.stringifier = stringifier;
        self
    }

    pub fn config(&self) -> &LtsvConfig {
        &self.cfg
    }

    /// Resolve the text to parse: the `source` field if configured, else the line
    fn resolve_input(&self, extracted: &Extracted, line: Option<&str>) -> Option<String> {
        let Some(source) = self.cfg.source.as_deref() else {
            if line.is_none() && self.debug {
                let _enter = self.span.enter();
                debug!("cannot parse a nil entry");
            }
            return line.map(str::to_owned);
        };

        let Some(value) = extracted.get(source) else {
            if self.debug {
                let _enter = self.span.enter();
                debug!(source, "source does not exist in the set of extracted values");
            }
            return None;
        };

        match self.stringifier.stringify(value) {
            Ok(input) => Some(input),
            Err(err) => {
                if self.debug {
                    let _enter = self.span.enter();
                    debug!(
                        source,
                        err = %err,
                        kind = value_kind(value),
                        "failed to convert source value to string"
                    );
                }
                None
            }
        }
    }
}

/// Split an LTSV string into its `(label, value)` pairs.
///
/// Records without a colon are dropped. Only the first colon separates the
/// label, so values may contain colons. Labels are not validated and may be
/// empty.
pub fn parse_ltsv(input: &str) -> impl Iterator<Item = (&str, &str)> {
    input
        .split(RECORD_SEPARATOR)
        .filter_map(|record| record.split_once(LABEL_SEPARATOR))
}

impl Stage for LtsvStage {
    fn process(
        &self,
        _labels: &LabelSet,
        extracted: &mut Extracted,
        _timestamp: &mut DateTime<Utc>,
        line: Option<&str>,
    ) {
        let Some(input) = self.resolve_input(extracted, line) else {
            return;
        };

        for (key, value) in parse_ltsv(&input) {
            extracted.insert(key.to_string(), Value::String(value.to_string()));
        }
    }

    fn name(&self) -> &str {
        STAGE_TYPE_LTSV
    }
}
