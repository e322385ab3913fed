//! The parser seam: turns raw bytes handed over by the tail loop into entries.

use std::io::{self, Read};

/// Consumes raw bytes from the watched file and yields structured entries.
///
/// The tailer creates one parser per session and calls [`parse_stream`] once
/// per pass with a reader limited to the bytes appended since the previous
/// pass. A parser may keep an incomplete trailing entry between calls; it is
/// told to drop such state through [`reset`] when the file was truncated or
/// replaced.
///
/// [`parse_stream`]: StreamParser::parse_stream
/// [`reset`]: StreamParser::reset
pub trait StreamParser: Send + 'static {
    type Entry: Clone + Send + 'static;

    /// Reads `reader` to its end, calling `on_entry` for every complete entry.
    ///
    /// Malformed input is the parser's business; an `Err` is only for I/O
    /// failures of the reader itself.
    fn parse_stream(
        &mut self,
        reader: &mut dyn Read,
        on_entry: &mut dyn FnMut(Self::Entry),
    ) -> io::Result<()>;

    /// Drops any state carried over from earlier passes.
    fn reset(&mut self) {}
}

/// Splits the stream on a separator and yields each non-blank part as a
/// `String`. Bytes after the last separator are held back until the rest of
/// the entry arrives.
#[derive(Debug, Clone)]
pub struct LineParser {
    separator: Vec<u8>,
    pending: Vec<u8>,
}

impl LineParser {
    /// Creates a parser for `separator`; an empty separator falls back to a newline.
    pub fn new(separator: impl Into<String>) -> Self {
        let separator = separator.into();
        let separator = if separator.is_empty() {
            b"\n".to_vec()
        } else {
            separator.into_bytes()
        };

        Self {
            separator,
            pending: Vec::new(),
        }
    }

    pub fn separator(&self) -> &[u8] {
        &self.separator
    }

    /// Bytes of an entry whose separator has not been seen yet.
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new("\n")
    }
}

impl StreamParser for LineParser {
    type Entry = String;

    fn parse_stream(
        &mut self,
        reader: &mut dyn Read,
        on_entry: &mut dyn FnMut(String),
    ) -> io::Result<()> {
        reader.read_to_end(&mut self.pending)?;

        let mut consumed = 0;
        while let Some(pos) = find_separator(&self.pending[consumed..], &self.separator) {
            let part = &self.pending[consumed..consumed + pos];
            if let Some(entry) = decode_part(part) {
                on_entry(entry);
            }
            consumed += pos + self.separator.len();
        }
        self.pending.drain(..consumed);

        Ok(())
    }

    fn reset(&mut self) {
        self.pending.clear();
    }
}

fn find_separator(haystack: &[u8], separator: &[u8]) -> Option<usize> {
    haystack
        .windows(separator.len())
        .position(|window| window == separator)
}

/// Lossy UTF-8 decode, dropping empty and whitespace-only parts.
fn decode_part(part: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(part);
    if text.trim().is_empty() {
        None
    } else {
        Some(text.into_owned())
    }
}
