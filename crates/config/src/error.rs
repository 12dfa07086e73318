use thiserror::Error;

/// Missing required configuration or an unparseable value found at
/// startup. Always exits nonzero before the reader is started.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read env file {path}: {source}")]
    ReadFile { path: String, source: std::io::Error },

    #[error("invalid env file: {0}")]
    Malformed(String),

    #[error("missing required configuration key: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {detail}")]
    InvalidValue { key: &'static str, detail: String },
}
