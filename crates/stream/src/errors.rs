use pcload_datastore::DbError;

/// Failure to encode or write a single record.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("JSON encoding failed: {}", _0)]
    Json(#[from] serde_json::Error),

    #[error("CSV encoding failed: {}", _0)]
    Csv(#[from] csv::Error),

    #[error("Write failed: {}", _0)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
#[error("The display cap must be at least {}, got {}", crate::MIN_DISPLAY_CAP, _0)]
pub struct InvalidDisplayCap(pub usize);

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("Reading a row failed after {rows_written} records were written: {source}")]
    Cursor {
        rows_written: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Writing a record failed after {rows_written} records were written: {source}")]
    Serialization {
        rows_written: u64,
        #[source]
        source: EncodeError,
    },

    #[error("The stream was cancelled after {rows_written} records")]
    Cancelled { rows_written: u64 },

    #[error("Unable to start the stream: {}", _0)]
    Store(#[from] DbError),

    #[error(transparent)]
    InvalidDisplayCap(#[from] InvalidDisplayCap),
}

pub type Result<T, E = StreamError> = std::result::Result<T, E>;

impl StreamError {
    /// How many records were completely written before the stream stopped.
    pub fn rows_written(&self) -> u64 {
        match self {
            StreamError::Cursor { rows_written, .. }
            | StreamError::Serialization { rows_written, .. }
            | StreamError::Cancelled { rows_written } => *rows_written,
            StreamError::Store(_) | StreamError::InvalidDisplayCap(_) => 0,
        }
    }
}
