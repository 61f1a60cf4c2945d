use thiserror::Error;

pub type BidwiseResult<T> = Result<T, BidwiseError>;

#[derive(Error, Debug)]
pub enum BidwiseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rule file error ({path}): {message}")]
    RuleFile { path: String, message: String },

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for BidwiseError {
    fn from(err: config::ConfigError) -> Self {
        BidwiseError::Config(err.to_string())
    }
}
