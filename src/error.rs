use std::time::Duration;

use thiserror::Error;

/// Error type for table construction, transforms and group-by execution
#[derive(Error, Debug)]
pub enum Error {
    #[error("shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    #[error("column not found: {0}")]
    UnknownColumn(String),

    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("worker timed out after {timeout:?} on chunk {chunk_index}")]
    WorkerTimeout { chunk_index: usize, timeout: Duration },

    #[error("task for chunk {chunk_index} failed: {cause}")]
    TaskFailure { chunk_index: usize, cause: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("index out of bounds: index {index}, size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::InvalidInput(format!("invalid regular expression: {}", err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_keep_their_message() {
        let io = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"));
        assert_eq!(io.to_string(), "I/O error: no such file");

        let json = Error::from(serde_json::from_str::<serde_json::Value>("{").unwrap_err());
        assert!(json.to_string().starts_with("JSON error: EOF"));
    }
}
