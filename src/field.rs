use bytes::Bytes;

/// One logical header field, as emitted by the [`crate::header::HeaderScanner`].
///
/// `source_lines` is the verbatim bytes of every physical line that makes
/// up this field, folding and all, including each line's terminator.
/// `raw_body` is the value half after the first unescaped `:`, with
/// folding whitespace still in place (a single leading space is kept for
/// round-trip).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    raw_body: Bytes,
    source_lines: Bytes,
}

impl Field {
    pub(crate) fn new(name: String, raw_body: Bytes, source_lines: Bytes) -> Self {
        Self {
            name,
            raw_body,
            source_lines,
        }
    }

    /// The field name as it appeared, untouched apart from trimming.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// ASCII case-insensitive comparison.
    pub fn name_is(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other)
    }

    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    pub fn source_lines(&self) -> &[u8] {
        &self.source_lines
    }

    /// Removes folding: every CRLF (or LF) followed by a run of `SP`/`HT`
    /// collapses to a single space, and the result is trimmed of leading
    /// and trailing whitespace.
    ///
    /// Folding is collapsed at the byte level first, then the remaining
    /// bytes are decoded as UTF-8 (lossily, since a field body is not
    /// guaranteed to be well-formed) — never byte-by-byte, which would
    /// split multi-byte sequences (RFC 6532 UTF-8 header values, or a
    /// quoted parameter value containing non-ASCII text) into mojibake.
    pub fn unfolded(&self) -> String {
        let mut out = Vec::with_capacity(self.raw_body.len());
        let mut bytes = self.raw_body.iter().peekable();
        let mut pending_space = false;

        while let Some(&b) = bytes.next() {
            match b {
                b'\r' => continue,
                b'\n' => {
                    pending_space = true;
                }
                b' ' | b'\t' => {
                    pending_space = true;
                }
                _ => {
                    if pending_space && !out.is_empty() {
                        out.push(b' ');
                    }
                    pending_space = false;
                    out.push(b);
                }
            }
        }

        String::from_utf8_lossy(&out).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfolds_continuation_whitespace() {
        let field = Field::new(
            "Subject".to_string(),
            Bytes::from_static(b" Hello,\r\n World!"),
            Bytes::from_static(b"Subject: Hello,\r\n World!\r\n"),
        );
        assert_eq!(field.unfolded(), "Hello, World!");
    }

    #[test]
    fn unfolds_multibyte_utf8_without_splitting_sequences() {
        // "café" as UTF-8: the 'é' is the two bytes 0xC3 0xA9.
        let field = Field::new(
            "Subject".to_string(),
            Bytes::from_static(b" caf\xC3\xA9"),
            Bytes::from_static(b"Subject: caf\xC3\xA9\r\n"),
        );
        assert_eq!(field.unfolded(), "café");
    }

    #[test]
    fn name_compares_case_insensitively() {
        let field = Field::new(
            "Content-Type".to_string(),
            Bytes::new(),
            Bytes::new(),
        );
        assert!(field.name_is("content-type"));
        assert!(field.name_is("CONTENT-TYPE"));
    }
}
