//! Sequential reader for the scheduler's event and accounting logs.
//!
//! Lines are parsed one at a time. A line that does not parse is skipped
//! and remembered as a [`MalformedLine`]; the call that skipped it leaves
//! `EventFormat` in the reader's register and still returns the next good
//! event. End of file leaves `Eof`, even when the last lines were skipped;
//! those stay listed in [`EventLogReader::malformed`].

mod event;
mod lexer;

pub use event::{EventBody, EventRecord, EventType, MalformedLine, parse_line};
pub use lexer::{Token, tokenize};

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::error::{ErrorKind, LavaResult};
use crate::registry::LastResult;

/// Reads [`EventRecord`]s from a log stream.
#[derive(Debug)]
pub struct EventLogReader<R> {
    reader: R,
    line: usize,
    buf: Vec<u8>,
    malformed: Vec<MalformedLine>,
    last: LastResult,
}

impl EventLogReader<BufReader<File>> {
    /// Open a log file.
    pub async fn open(path: impl AsRef<Path>) -> LavaResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        debug!(path = %path.display(), "Opened event log");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: AsyncBufRead + Unpin> EventLogReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: Vec::new(),
            malformed: Vec::new(),
            last: LastResult::new(),
        }
    }

    /// Next well-formed event, `None` at end of file.
    ///
    /// Only I/O failures are returned as errors.
    pub async fn next_event(&mut self) -> LavaResult<Option<EventRecord>> {
        let mut skipped = false;
        loop {
            self.buf.clear();
            let n = match self.reader.read_until(b'\n', &mut self.buf).await {
                Ok(n) => n,
                Err(e) => return self.last.record(Err(e.into())),
            };
            if n == 0 {
                if skipped {
                    debug!(line = self.line, "Event log ended after malformed lines");
                }
                self.last.set(ErrorKind::Eof);
                return Ok(None);
            }
            self.line += 1;

            let parsed = match std::str::from_utf8(&self.buf) {
                Ok(text) => {
                    let text = text.trim_end_matches(['\n', '\r']);
                    if text.trim().is_empty() {
                        continue;
                    }
                    parse_line(text, self.line).map_err(|reason| (text.to_string(), reason))
                }
                Err(e) => Err((
                    String::from_utf8_lossy(&self.buf).trim_end().to_string(),
                    format!("invalid UTF-8: {e}"),
                )),
            };

            match parsed {
                Ok(event) => {
                    self.last.set(if skipped {
                        ErrorKind::EventFormat
                    } else {
                        ErrorKind::NoError
                    });
                    return Ok(Some(event));
                }
                Err((raw, reason)) => {
                    warn!(line = self.line, %reason, "Skipping malformed event log line");
                    self.malformed.push(MalformedLine {
                        line: self.line,
                        raw,
                        reason,
                    });
                    skipped = true;
                }
            }
        }
    }

    /// Drain the stream.
    pub async fn read_all(&mut self) -> LavaResult<Vec<EventRecord>> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event().await? {
            events.push(event);
        }
        Ok(events)
    }

    /// Lines skipped so far.
    pub fn malformed(&self) -> &[MalformedLine] {
        &self.malformed
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line
    }

    pub fn last_result(&self) -> ErrorKind {
        self.last.get()
    }
}
