use std::io::{self, Read};

/// Pass-through decoder for `7bit`/`8bit`/`binary` transfer encodings,
/// and the fallback used for an unrecognized `Content-Transfer-Encoding`
/// token.
pub struct IdentityDecoder<R> {
    inner: R,
}

impl<R: Read> IdentityDecoder<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Read for IdentityDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}
