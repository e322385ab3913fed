//! A log tailer that follows one file on a background thread.
//!
//! Every poll interval the tailer re-opens the file, hands the bytes appended
//! since the previous pass to a [`StreamParser`], and broadcasts what comes
//! out as [`TailEvent`]s. Truncated or rotated files are read again from the
//! start. Reading can be paused and resumed without losing the position.
//!
//! # Example
//!
//! ```rust,no_run
//! use log_tailer::{tail_log, TailEvent};
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (tailer, mut events) = tail_log("app.log", None)?;
//!
//!     while let Some(event) = events.next().await {
//!         match event {
//!             TailEvent::NewEntry(line) => println!("New content: {}", line),
//!             TailEvent::Error { message, .. } => eprintln!("Error: {}", message),
//!             _ => {}
//!         }
//!     }
//!
//!     tailer.close()?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod event;
mod parser;
mod reader;
mod stream;
mod tailer;

#[cfg(test)]
mod test_helpers;

// Public API exports
pub use config::{DEFAULT_PAUSE_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_THREAD_NAME, TailerConfig};
pub use error::{Error, Result};
pub use event::TailEvent;
pub use parser::{LineParser, StreamParser};
pub use stream::EventStream;
pub use tailer::Tailer;

use std::path::Path;

/// Starts tailing `path` with a [`LineParser`] and the default configuration.
///
/// # Arguments
///
/// * `path` - File path to follow
/// * `separator` - Entry separator (defaults to newline)
///
/// The returned stream is subscribed before the loop starts, so it sees the
/// first pass. Events stop when the tailer is closed or dropped.
pub fn tail_log<P: AsRef<Path>>(
    path: P,
    separator: Option<String>,
) -> Result<(Tailer<LineParser>, EventStream<String>)> {
    let separator = separator.unwrap_or_else(|| "\n".to_string());
    let tailer = Tailer::new(move || LineParser::new(separator.clone()));
    let events = tailer.subscribe();
    tailer.set_path(path)?;
    Ok((tailer, events))
}
