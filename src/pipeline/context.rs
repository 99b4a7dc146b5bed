use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Fields extracted from a single log line, threaded through every stage.
///
/// Stages add or overwrite entries; nothing clears the map between stages.
pub type Extracted = IndexMap<String, serde_json::Value>;

/// Labels attached to a log line. Stages that do not own labels only pass
/// them along.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        LabelSet(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Everything the engine tracks for one line while it moves through the stages
#[derive(Debug, Clone)]
pub struct Entry {
    pub labels: LabelSet,
    pub extracted: Extracted,
    pub timestamp: DateTime<Utc>,
    pub line: Option<String>,
}

impl Entry {
    pub fn new(line: Option<String>) -> Self {
        Entry {
            labels: LabelSet::new(),
            extracted: Extracted::new(),
            timestamp: Utc::now(),
            line,
        }
    }
}

/// Runtime statistics
#[derive(Debug, Default, Clone)]
pub struct ProcessingStats {
    pub records_processed: usize,
    pub records_output: usize,
    pub records_skipped: usize,
    pub errors: usize,
    pub processing_time: Duration,
}

impl ProcessingStats {
    pub fn merge(&mut self, other: &ProcessingStats) {
        self.records_processed += other.records_processed;
        self.records_output += other.records_output;
        self.records_skipped += other.records_skipped;
        self.errors += other.errors;
        self.processing_time += other.processing_time;
    }
}

/// Shared context across all stages
#[derive(Debug, Default)]
pub struct PipelineContext {
    pub line_number: usize,
    pub file_name: Option<String>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }
}
