use std::collections::VecDeque;
use std::io::{self, Read};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Lenient base64 decoder: whitespace and CRLF are ignored,
/// characters outside the standard alphabet are ignored, and a missing
/// trailing `=` padding run is tolerated. Padding that *is* present must
/// still decode consistently with the standard alphabet.
pub struct Base64Decoder<R> {
    inner: R,
    inner_eof: bool,
    pending: Vec<u8>,
    decoded: VecDeque<u8>,
}

impl<R: Read> Base64Decoder<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            inner_eof: false,
            pending: Vec::new(),
            decoded: VecDeque::new(),
        }
    }

    fn pull_more(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; 4096];
        let n = self.inner.read(&mut chunk)?;
        if n == 0 {
            self.inner_eof = true;
            self.flush_final_group();
            return Ok(());
        }
        for &b in &chunk[..n] {
            if is_base64_char(b) || b == b'=' {
                self.pending.push(b);
            }
            // else: whitespace/CRLF/out-of-alphabet byte, dropped (lenient).
        }
        self.decode_complete_groups();
        Ok(())
    }

    fn decode_complete_groups(&mut self) {
        loop {
            if self.pending.len() < 4 {
                return;
            }
            if self.pending[..4].contains(&b'=') {
                // Padding marks the final group; wait for EOF to flush it
                // so we don't misinterpret a split chunk boundary.
                return;
            }
            let group: Vec<u8> = self.pending.drain(..4).collect();
            if let Ok(bytes) = STANDARD.decode(&group) {
                self.decoded.extend(bytes);
            }
        }
    }

    fn flush_final_group(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let mut group = std::mem::take(&mut self.pending);
        while group.len() % 4 != 0 {
            group.push(b'=');
        }
        if let Ok(bytes) = STANDARD.decode(&group) {
            self.decoded.extend(bytes);
        }
    }
}

fn is_base64_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/'
}

impl<R: Read> Read for Base64Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.decoded.is_empty() && !self.inner_eof {
            self.pull_more()?;
        }
        let n = std::cmp::min(buf.len(), self.decoded.len());
        for slot in buf.iter_mut().take(n) {
            *slot = self.decoded.pop_front().unwrap();
        }
        Ok(n)
    }
}
