use std::path::PathBuf;

/// Errors detected locally, before anything is sent to the server
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid index restriction: the key does not give access to index `{0}`")]
    InvalidRestriction(String),

    #[error("Invalid expiry: the expiration date must be in the future")]
    InvalidExpiry,

    #[error("The API key secret cannot be used as a signing key")]
    InvalidSigningKey,

    #[error("Invalid documents in {path}: {reason}")]
    InvalidDocument { path: PathBuf, reason: String },

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("No such file: {0}")]
    FileNotFound(PathBuf),

    #[error("CSV delimiter must be exactly one ASCII character, got {0:?}")]
    InvalidCsvDelimiter(String),

    #[error("A CSV delimiter can only be used with CSV files")]
    CsvDelimiterNotAllowed,

    #[error("No {extension} files found in {dir}")]
    NoDocuments { dir: PathBuf, extension: String },

    #[error("Batch size must be greater than zero")]
    InvalidBatchSize,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
