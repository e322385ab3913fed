//! Events emitted by a [`Tailer`](crate::Tailer).

use crate::error::Error;
use std::io;
use std::path::PathBuf;

/// One notification from a tailer to its subscribers.
///
/// Within a pass events arrive as `SizeChanged` (only when the size moved),
/// then any number of `NewEntry`, then `BatchEnd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent<E> {
    /// `set_path` switched to a new file.
    PathChanged(PathBuf),
    /// `set_paused` changed the pause state.
    PausedChanged(bool),
    /// The file size differs from the one last observed.
    SizeChanged(u64),
    /// The parser produced an entry.
    NewEntry(E),
    /// A pass finished; the payload is the offset the file was read up to.
    BatchEnd(u64),
    /// The file could not be opened or read. `fatal` is set when the error
    /// ended the session, which happens when the file cannot be opened.
    Error {
        path: PathBuf,
        kind: io::ErrorKind,
        message: String,
        fatal: bool,
    },
}

impl<E> TailEvent<E> {
    pub(crate) fn from_error(error: &Error, fatal: bool) -> Self {
        TailEvent::Error {
            path: error.path().cloned().unwrap_or_default(),
            kind: error.io_kind().unwrap_or(io::ErrorKind::Other),
            message: error.to_string(),
            fatal,
        }
    }

    /// Returns the entry if this is a `NewEntry` event.
    pub fn into_entry(self) -> Option<E> {
        match self {
            TailEvent::NewEntry(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TailEvent::Error { .. })
    }
}
