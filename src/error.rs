use thiserror::Error;

/// Errors from the ambient layers (snapshots, configuration).
///
/// Engine operations themselves never fail; they degrade to no-ops.
#[derive(Debug, Error)]
pub enum EchoError {
    /// Reading or writing a snapshot/config file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A snapshot or config file could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No usable data directory on this platform
    #[error("Could not determine data directory")]
    NoDataDir,

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, EchoError>;
