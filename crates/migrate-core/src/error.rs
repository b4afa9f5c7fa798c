use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid pattern in rule '{id}': {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },

    #[error("file is not valid UTF-8: {0}")]
    NotUtf8(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("task failed: {0}")]
    Join(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<tokio::task::JoinError> for MigrateError {
    fn from(e: tokio::task::JoinError) -> Self {
        MigrateError::Join(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
