#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("empty ltsv stage configuration")]
    EmptyConfig,

    #[error("empty source")]
    EmptySource,

    #[error("Invalid stage configuration: {0}")]
    Decode(String),

    #[error("Unknown stage type: {0}")]
    UnknownStage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Decode(err.to_string())
    }
}

/// Raised when an extracted value has no string representation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoercionError {
    #[error("can't convert {kind} to string")]
    Unsupported { kind: &'static str },
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Line too long: {length} > {max_length}")]
    LineTooLong { length: usize, max_length: usize },

    #[error("Line {line} is not valid UTF-8")]
    InvalidUtf8 { line: usize },

    #[error("Failed to serialize extracted fields: {0}")]
    Serialize(#[from] serde_json::Error),
}
