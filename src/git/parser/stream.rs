//! Alignment of the two history streams
//!
//! The header/name-status stream and the numstat stream each open every
//! commit with the sentinel line. Lines are buffered per record until the
//! next sentinel (or the end of the stream) closes it; a [`RawRecord`] is
//! released once both streams have closed the same index.

use std::collections::VecDeque;

use super::super::GitError;
use super::super::constants::special::RECORD_SENTINEL;
use super::super::template::HEADER_LINES;
use super::RawRecord;

/// Which history stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Header,
    Numstat,
}

#[derive(Debug, Default)]
struct StreamBuffer {
    /// Closed records not yet released
    closed: VecDeque<Vec<String>>,
    /// Record still receiving lines
    open: Option<Vec<String>>,
    /// Records closed so far
    count: usize,
    finished: bool,
}

impl StreamBuffer {
    fn push(&mut self, line: &str) -> Result<(), GitError> {
        if line == RECORD_SENTINEL {
            self.close_open();
            self.open = Some(Vec::new());
            return Ok(());
        }
        match self.open.as_mut() {
            Some(record) => record.push(line.to_string()),
            None if line.is_empty() => {}
            None => {
                return Err(GitError::ParseError(format!(
                    "Output before first record: {line:?}"
                )));
            }
        }
        Ok(())
    }

    fn close_open(&mut self) {
        if let Some(record) = self.open.take() {
            self.closed.push_back(record);
            self.count += 1;
        }
    }
}

/// Buffers the two streams and releases records in index order
#[derive(Debug, Default)]
pub struct StreamAligner {
    header: StreamBuffer,
    numstat: StreamBuffer,
    next_index: usize,
}

impl StreamAligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns every record that became complete
    pub fn push_line(&mut self, stream: Stream, line: &str) -> Result<Vec<RawRecord>, GitError> {
        let buffer = self.buffer(stream);
        if buffer.finished {
            return Ok(Vec::new());
        }
        buffer.push(line)?;
        self.release()
    }

    /// Mark a stream as ended successfully; closes its last record
    ///
    /// Once both streams have ended, differing record counts are a
    /// `StreamMismatch`.
    pub fn finish(&mut self, stream: Stream) -> Result<Vec<RawRecord>, GitError> {
        let buffer = self.buffer(stream);
        buffer.close_open();
        buffer.finished = true;

        let released = self.release()?;
        if self.is_finished() && self.header.count != self.numstat.count {
            return Err(GitError::StreamMismatch {
                name_status: self.header.count,
                numstat: self.numstat.count,
            });
        }
        Ok(released)
    }

    /// Have both streams ended?
    pub fn is_finished(&self) -> bool {
        self.header.finished && self.numstat.finished
    }

    /// Records released so far
    pub fn released(&self) -> usize {
        self.next_index
    }

    fn buffer(&mut self, stream: Stream) -> &mut StreamBuffer {
        match stream {
            Stream::Header => &mut self.header,
            Stream::Numstat => &mut self.numstat,
        }
    }

    fn release(&mut self) -> Result<Vec<RawRecord>, GitError> {
        let mut ready = Vec::new();
        while !self.header.closed.is_empty() && !self.numstat.closed.is_empty() {
            let (Some(header), Some(numstat)) =
                (self.header.closed.pop_front(), self.numstat.closed.pop_front())
            else {
                break;
            };
            ready.push(self.merge(header, numstat)?);
        }
        Ok(ready)
    }

    fn merge(&mut self, header: Vec<String>, numstat: Vec<String>) -> Result<RawRecord, GitError> {
        let index = self.next_index;
        if header.len() < HEADER_LINES {
            return Err(GitError::ParseError(format!(
                "Record {index}: expected {HEADER_LINES} header lines, got {}",
                header.len()
            )));
        }

        let mut numstat = numstat.into_iter();
        let numstat_hash = numstat.by_ref().find(|l| !l.is_empty()).unwrap_or_default();
        let header_hash = header[0].split_whitespace().next().unwrap_or_default();
        if numstat_hash.trim() != header_hash {
            return Err(GitError::ParseError(format!(
                "Record {index}: streams disagree on commit ({header_hash} vs {numstat_hash})"
            )));
        }

        let mut header = header;
        let name_status = header
            .split_off(HEADER_LINES)
            .into_iter()
            .filter(|l| !l.is_empty())
            .collect();

        self.next_index += 1;
        Ok(RawRecord {
            index,
            header,
            name_status,
            numstat: numstat.filter(|l| !l.is_empty()).collect(),
        })
    }
}
