use std::io::Read;

use bytes::{Bytes, BytesMut};

use crate::config::MalformedHeaderPolicy;
use crate::error::{Error, Warning};
use crate::field::Field;
use crate::linebuf::LineBuffer;

/// Reads logical lines into [`Field`]s until the header-terminating empty
/// line (or EOF).
///
/// One call to [`HeaderScanner::next_field`] performs exactly one round
/// of I/O on the underlying [`LineBuffer`] (the field's own line plus any
/// folded continuations) and corresponds to exactly one `Field` or
/// `EndHeader` token.
pub struct HeaderScanner {
    field_index: usize,
}

impl HeaderScanner {
    pub fn new() -> Self {
        Self { field_index: 0 }
    }

    /// Returns the next field, or `None` once the empty line (or EOF) that
    /// terminates the header block is reached.
    pub fn next_field<R: Read>(
        &mut self,
        lb: &mut LineBuffer<R>,
        policy: MalformedHeaderPolicy,
        warnings: &mut Vec<Warning>,
    ) -> Result<Option<Field>, Error> {
        let first = match lb.read_line()? {
            None => return Ok(None),
            Some(line) => line,
        };
        if first.content().is_empty() {
            return Ok(None);
        }

        let mut source_lines = BytesMut::new();
        source_lines.extend_from_slice(&first.bytes);

        let content = first.content();
        let colon = content.iter().position(|&b| b == b':');
        let valid_name_idx = colon.filter(|&idx| valid_field_name(&content[..idx]));

        let (name, mut raw_body) = match valid_name_idx {
            Some(idx) => {
                let name = std::str::from_utf8(&content[..idx])
                    .unwrap_or("")
                    .trim()
                    .to_string();
                let mut body = BytesMut::new();
                body.extend_from_slice(&first.bytes[idx + 1..]);
                (name, body)
            }
            None => match policy {
                MalformedHeaderPolicy::Fail => {
                    return Err(Error::MalformedHeader {
                        reason: "header line has no valid field name".to_string(),
                    });
                }
                MalformedHeaderPolicy::Tolerate => {
                    warnings.push(Warning::MalformedField {
                        index: self.field_index,
                    });
                    (String::new(), BytesMut::new())
                }
            },
        };

        loop {
            let is_continuation = matches!(
                lb.peek_line()?,
                Some(line) if starts_with_fold(&line.bytes)
            );
            if !is_continuation {
                break;
            }
            let line = lb.read_line()?.unwrap();
            source_lines.extend_from_slice(&line.bytes);
            raw_body.extend_from_slice(&line.bytes);
        }

        self.field_index += 1;
        Ok(Some(Field::new(
            name,
            raw_body.freeze(),
            source_lines.freeze(),
        )))
    }
}

fn starts_with_fold(bytes: &Bytes) -> bool {
    matches!(bytes.first(), Some(b' ') | Some(b'\t'))
}

/// `1*<ASCII 33-126 excluding ':'>`, checked after trimming surrounding
/// whitespace. The colon itself is never part of `raw` since the
/// caller slices up to (excluding) its position.
fn valid_field_name(raw: &[u8]) -> bool {
    let trimmed = trim_ascii(raw);
    !trimmed.is_empty() && trimmed.iter().all(|&b| (33..=126).contains(&b))
}

fn trim_ascii(b: &[u8]) -> &[u8] {
    let start = b.iter().position(|&c| !c.is_ascii_whitespace());
    let end = b.iter().rposition(|&c| !c.is_ascii_whitespace());
    match (start, end) {
        (Some(s), Some(e)) => &b[s..=e],
        _ => &[],
    }
}
