use std::io::{self, Read};

use bytes::{Bytes, BytesMut};

use crate::position::Position;

const INITIAL_GROWTH: usize = 4096;

/// One line as read from the source, terminator included when present.
/// The final line of an input lacking a trailing terminator is returned
/// once, with `terminated = false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub bytes: Bytes,
    pub terminated: bool,
}

impl LogicalLine {
    /// The line with its terminator (if any) stripped.
    pub fn content(&self) -> &[u8] {
        if !self.terminated {
            return &self.bytes;
        }
        let mut end = self.bytes.len();
        if end >= 2 && &self.bytes[end - 2..] == b"\r\n" {
            end -= 2;
        } else if end >= 1 && self.bytes[end - 1] == b'\n' {
            end -= 1;
        }
        &self.bytes[..end]
    }
}

/// A pull interface over a raw byte source.
///
/// Yields logical lines with CRLF preserved for header scanning, while
/// also exposing the same underlying buffer as a raw byte view for the
/// [`crate::boundary::BoundaryScanner`] and the transfer decoders to read
/// through. Supports one line of lookahead.
pub struct LineBuffer<R> {
    reader: R,
    buf: BytesMut,
    reader_eof: bool,
    final_line_returned: bool,
    position: Position,
    max_line_length: usize,
    tolerate_bare_lf: bool,
    peeked: Option<LogicalLine>,
}

impl<R: Read> LineBuffer<R> {
    pub fn new(reader: R, max_line_length: usize, tolerate_bare_lf: bool) -> Self {
        Self {
            reader,
            buf: BytesMut::new(),
            reader_eof: false,
            final_line_returned: false,
            position: Position::default(),
            max_line_length,
            tolerate_bare_lf,
            peeked: None,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Reads more bytes from the underlying source into the internal
    /// buffer, growing it by at least `want` bytes unless EOF is hit
    /// first. No-op once the source is exhausted.
    fn grow(&mut self, want: usize) -> io::Result<()> {
        if self.reader_eof {
            return Ok(());
        }
        let target = self.buf.len() + want;
        let mut chunk = [0u8; 8192];
        while self.buf.len() < target {
            let n = self.reader.read(&mut chunk)?;
            if n == 0 {
                self.reader_eof = true;
                break;
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }

    fn is_reader_eof(&self) -> bool {
        self.reader_eof
    }

    /// Position of the terminator's end (exclusive) in `self.buf`, if a
    /// line terminator is present.
    fn scan_terminator(&self) -> Option<usize> {
        let data = &self.buf[..];
        let mut i = 0;
        while i < data.len() {
            match data[i] {
                b'\r' => {
                    if i + 1 < data.len() {
                        if data[i + 1] == b'\n' {
                            return Some(i + 2);
                        }
                        i += 1;
                    } else {
                        // Could still turn into CRLF with more data.
                        return None;
                    }
                }
                b'\n' => {
                    if self.tolerate_bare_lf {
                        return Some(i + 1);
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }
        None
    }

    /// Ensures a full line (or EOF) is buffered, without consuming it.
    fn ensure_line_buffered(&mut self) -> io::Result<Option<usize>> {
        loop {
            if let Some(end) = self.scan_terminator() {
                if end > self.max_line_length {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "line too long",
                    ));
                }
                return Ok(Some(end));
            }
            if self.buf.len() > self.max_line_length {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "line too long",
                ));
            }
            if self.is_reader_eof() {
                return Ok(None);
            }
            self.grow(INITIAL_GROWTH)?;
        }
    }

    /// Returns the next logical line without consuming it. Calling
    /// `read_line` afterwards returns the same line.
    pub fn peek_line(&mut self) -> Result<Option<&LogicalLine>, crate::error::Error> {
        if self.peeked.is_none() {
            self.peeked = self.pull_line()?;
        }
        Ok(self.peeked.as_ref())
    }

    /// Consumes and returns the next logical line.
    pub fn read_line(&mut self) -> Result<Option<LogicalLine>, crate::error::Error> {
        if let Some(line) = self.peeked.take() {
            return Ok(Some(line));
        }
        self.pull_line()
    }

    fn pull_line(&mut self) -> Result<Option<LogicalLine>, crate::error::Error> {
        let line_end = self
            .ensure_line_buffered()
            .map_err(|e| self.translate_buffering_error(e))?;

        match line_end {
            Some(end) => {
                let bytes = self.buf.split_to(end).freeze();
                self.position.advance(&bytes);
                Ok(Some(LogicalLine {
                    bytes,
                    terminated: true,
                }))
            }
            None => {
                if self.final_line_returned || self.buf.is_empty() {
                    Ok(None)
                } else {
                    self.final_line_returned = true;
                    let bytes = self.buf.split_to(self.buf.len()).freeze();
                    self.position.advance(&bytes);
                    Ok(Some(LogicalLine {
                        bytes,
                        terminated: false,
                    }))
                }
            }
        }
    }

    fn translate_buffering_error(&self, e: io::Error) -> crate::error::Error {
        if e.kind() == io::ErrorKind::InvalidData {
            crate::error::Error::LineTooLong {
                max: self.max_line_length,
            }
        } else {
            crate::error::Error::SourceClosed(e)
        }
    }

    /// The unread bytes currently buffered, for the boundary scanner and
    /// transfer decoders. Invalidated (conceptually) by any consuming
    /// call; callers must re-fetch after `raw_consume`.
    pub fn raw_unread(&self) -> &[u8] {
        &self.buf
    }

    pub fn raw_is_eof(&self) -> bool {
        self.reader_eof
    }

    /// Grows the raw buffer so at least `want` bytes (or EOF) are
    /// available, returning the number of bytes now buffered.
    pub fn raw_fill(&mut self, want: usize) -> Result<usize, crate::error::Error> {
        if self.buf.len() < want {
            self.grow(want - self.buf.len())
                .map_err(crate::error::Error::SourceClosed)?;
        }
        Ok(self.buf.len())
    }

    /// Consumes `n` bytes from the front of the raw buffer, updating
    /// position tracking. Used once the boundary scanner or a transfer
    /// decoder has determined how many content bytes to take.
    pub fn raw_consume(&mut self, n: usize) -> Bytes {
        let taken = self.buf.split_to(n).freeze();
        self.position.advance(&taken);
        taken
    }

    /// Discards any buffered (but not yet returned) peeked line, so the
    /// next `peek_line`/`read_line` re-scans. Used when the boundary
    /// scanner consumes raw bytes underneath a stale peek.
    pub fn invalidate_peek(&mut self) {
        self.peeked = None;
    }
}
