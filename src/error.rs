//! Stream error types

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::stream::StreamStatus;

/// Errors produced by stream operations.
///
/// Cloneable so a stream can keep the error that moved it into
/// [`StreamStatus::Error`] while also returning it to the caller.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Failed to open {}: {source}", path.display())]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("Stream cannot be opened from state {0:?}")]
    InvalidState(StreamStatus),

    #[error("Stream is not open")]
    NotOpen,

    #[error("Stream is closed")]
    Closed,

    #[error("Partial write: {written} of {expected} bytes written")]
    PartialWrite { written: usize, expected: usize },

    #[error("I/O error: {0}")]
    Io(#[source] Arc<io::Error>),
}

impl From<io::Error> for StreamError {
    fn from(err: io::Error) -> Self {
        StreamError::Io(Arc::new(err))
    }
}

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
