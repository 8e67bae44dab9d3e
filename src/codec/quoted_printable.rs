use std::collections::VecDeque;
use std::io::{self, Read};

/// Quoted-printable decoder.
///
/// `=HH` decodes to a byte, `=CRLF` is a soft line break and produces no
/// output, and a bare `=` not followed by either is emitted literally
/// (lenient).
pub struct QuotedPrintableDecoder<R> {
    inner: R,
    inner_eof: bool,
    lookahead: VecDeque<u8>,
}

impl<R: Read> QuotedPrintableDecoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            inner_eof: false,
            lookahead: VecDeque::new(),
        }
    }

    fn fill(&mut self, want: usize) -> io::Result<()> {
        let mut byte = [0u8; 1];
        while self.lookahead.len() < want && !self.inner_eof {
            let n = self.inner.read(&mut byte)?;
            if n == 0 {
                self.inner_eof = true;
                break;
            }
            self.lookahead.push_back(byte[0]);
        }
        Ok(())
    }
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

impl<R: Read> Read for QuotedPrintableDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            self.fill(3)?;
            let Some(&b0) = self.lookahead.front() else {
                break;
            };

            if b0 != b'=' {
                buf[written] = self.lookahead.pop_front().unwrap();
                written += 1;
                continue;
            }

            if self.lookahead.len() >= 3 {
                let h1 = self.lookahead[1];
                let h2 = self.lookahead[2];
                if h1 == b'\r' && h2 == b'\n' {
                    self.lookahead.drain(..3);
                    continue;
                }
                if let (Some(hi), Some(lo)) = (hex_val(h1), hex_val(h2)) {
                    self.lookahead.drain(..3);
                    buf[written] = (hi << 4) | lo;
                    written += 1;
                    continue;
                }
            }

            // Lenient: bare `=` not followed by a hex pair or CRLF (either
            // because the input truly has none, or we hit EOF before
            // seeing two more bytes) is emitted literally.
            buf[written] = self.lookahead.pop_front().unwrap();
            written += 1;
        }
        Ok(written)
    }
}

/// Quoted-printable encoder: a `Read` adapter over a raw byte
/// source, producing 7-bit-safe output with 76-column soft wrapping.
pub struct QuotedPrintableEncoder<R> {
    inner: R,
    inner_eof: bool,
    raw: Vec<u8>,
    out: VecDeque<u8>,
    done: bool,
}

const MAX_CONTENT_WIDTH: usize = 75;

impl<R: Read> QuotedPrintableEncoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            inner_eof: false,
            raw: Vec::new(),
            out: VecDeque::new(),
            done: false,
        }
    }

    fn pull_raw(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; 4096];
        let n = self.inner.read(&mut chunk)?;
        if n == 0 {
            self.inner_eof = true;
        } else {
            self.raw.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }

    /// Extracts and encodes the next logical line from `self.raw`,
    /// appending encoded bytes to `self.out`. Returns `true` if a line
    /// was produced (including a final unterminated fragment at EOF).
    fn drain_one_line(&mut self) -> bool {
        match find_line_end(&self.raw, self.inner_eof) {
            Some((content_len, consumed)) => {
                let line: Vec<u8> = self.raw.drain(..consumed).collect();
                encode_line(&line[..content_len], true, &mut self.out);
                true
            }
            None => {
                if self.inner_eof && !self.raw.is_empty() {
                    let line = std::mem::take(&mut self.raw);
                    encode_line(&line, false, &mut self.out);
                    true
                } else {
                    false
                }
            }
        }
    }
}

fn find_line_end(data: &[u8], eof: bool) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'\r' => {
                if i + 1 < data.len() {
                    if data[i + 1] == b'\n' {
                        return Some((i, i + 2));
                    }
                    return Some((i, i + 1));
                } else if eof {
                    return Some((i, i + 1));
                } else {
                    return None;
                }
            }
            b'\n' => return Some((i, i + 1)),
            _ => i += 1,
        }
    }
    None
}

fn encode_piece(b: u8) -> [u8; 3] {
    [b'=', hex_digit(b >> 4), hex_digit(b & 0x0f)]
}

fn hex_digit(nibble: u8) -> u8 {
    match nibble {
        0..=9 => b'0' + nibble,
        _ => b'A' + (nibble - 10),
    }
}

/// Encodes one logical line's content. Space and tab are always escaped
/// rather than left literal: a streaming encoder can't know, at the
/// moment it sees a space, whether a later byte in the same line will
/// turn out to be its last without buffering arbitrarily far ahead, so
/// (unlike the minimal encoding RFC 2045 permits for a trailing space or
/// tab) every occurrence is hex-escaped regardless of position. This
/// costs a few bytes of output size but keeps the transducer
/// lookahead-free.
fn encode_line(content: &[u8], emit_terminator: bool, out: &mut VecDeque<u8>) {
    let mut col = 0usize;

    for &b in content.iter() {
        let literal = (33..=126).contains(&b) && b != b'=';

        let piece_len = if literal { 1 } else { 3 };
        if col + piece_len > MAX_CONTENT_WIDTH {
            out.push_back(b'=');
            out.push_back(b'\r');
            out.push_back(b'\n');
            col = 0;
        }

        if literal {
            out.push_back(b);
            col += 1;
        } else {
            for byte in encode_piece(b) {
                out.push_back(byte);
            }
            col += 3;
        }
    }

    if emit_terminator {
        out.push_back(b'\r');
        out.push_back(b'\n');
    }
}

impl<R: Read> Read for QuotedPrintableEncoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.out.is_empty() && !self.done {
            if self.drain_one_line() {
                continue;
            }
            if self.inner_eof {
                self.done = true;
                break;
            }
            self.pull_raw()?;
        }
        let n = std::cmp::min(buf.len(), self.out.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.out.pop_front().unwrap();
        }
        Ok(n)
    }
}
