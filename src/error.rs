//! Error types for the log tailer library.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for log tailer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors that are not tied to the watched file, such as failing to
    /// spawn the worker thread.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The watched file could not be opened for a pass.
    #[error("Can't open file: {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Seeking or reading failed after the file was opened.
    #[error("Failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration value was rejected.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The tail loop thread panicked before it could be joined.
    #[error("Tail worker panicked")]
    WorkerPanicked,

    /// Event stream has been closed or the tailer dropped.
    #[error("Stream closed")]
    StreamClosed,
}

impl Error {
    /// The path of the watched file, for errors raised by a pass.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Error::Open { path, .. } | Error::Read { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The kind of the underlying I/O error, if there is one.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Error::Io(e) => Some(e.kind()),
            Error::Open { source, .. } | Error::Read { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

/// A convenient Result type for log tailer operations.
pub type Result<T> = std::result::Result<T, Error>;
