use std::io::Read;

use bytes::Bytes;

use crate::error::Error;
use crate::linebuf::LineBuffer;

/// An active multipart boundary on the frame stack: every open
/// `multipart/*` frame contributes one `"--{boundary}"` marker, and the
/// scanner tests all of them at once.
#[derive(Debug, Clone)]
pub struct BoundaryMarker {
    /// `"--" + boundary`, without surrounding CRLF.
    marker: Bytes,
}

impl BoundaryMarker {
    pub fn new(boundary: &str) -> Self {
        let mut marker = Vec::with_capacity(boundary.len() + 2);
        marker.extend_from_slice(b"--");
        marker.extend_from_slice(boundary.as_bytes());
        Self {
            marker: Bytes::from(marker),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Delimiter,
    CloseDelimiter,
}

#[derive(Debug)]
pub struct BoundaryMatch {
    /// Content preceding the delimiter (the leading CRLF that belongs to
    /// the boundary, not the body, is already stripped).
    pub content: Bytes,
    pub kind: BoundaryKind,
    /// Index into the `stack` slice passed to `scan`, identifying which
    /// active boundary matched.
    pub depth: usize,
}

#[derive(Debug)]
pub enum BoundaryScanOutcome {
    Found(BoundaryMatch),
    /// EOF reached with no boundary found: the remaining bytes are
    /// returned and the caller flags this as an unexpected EOF.
    UnexpectedEof { content: Bytes },
}

/// Scans forward over a [`LineBuffer`]'s raw byte view for the earliest
/// occurrence of any active boundary.
pub struct BoundaryScanner;

const CHUNK: usize = 4096;

impl BoundaryScanner {
    /// `at_region_start` is true only for the very first scan of a
    /// multipart body (the preamble), where the leading CRLF requirement
    /// is waived because the boundary may sit at offset 0.
    pub fn scan<R: Read>(
        line_buffer: &mut LineBuffer<R>,
        stack: &[BoundaryMarker],
        at_region_start: bool,
    ) -> Result<BoundaryScanOutcome, Error> {
        line_buffer.invalidate_peek();
        let mut want = CHUNK;
        // Floor below which no candidate can exist: bumped past any
        // position that turned out not to be a genuine delimiter, so we
        // never re-examine and reject the same spot forever.
        let mut min_pos = 0;

        loop {
            let available = line_buffer.raw_fill(want)?;
            let data = line_buffer.raw_unread();
            let eof = line_buffer.raw_is_eof();

            let best = find_best_candidate(data, stack, at_region_start, min_pos);

            match best {
                Some((pos, depth, marker_len)) => {
                    match classify_suffix(data, pos, marker_len, eof) {
                        Classification::NeedMore => {
                            want = available + CHUNK;
                            continue;
                        }
                        Classification::NotAMatch => {
                            min_pos = pos + 1;
                            continue;
                        }
                        Classification::Match { kind, total_len } => {
                            let has_leading_crlf = pos >= 2;
                            let content_len = if has_leading_crlf { pos - 2 } else { pos };
                            let content = line_buffer.raw_consume(content_len);
                            if has_leading_crlf {
                                line_buffer.raw_consume(2);
                            }
                            line_buffer.raw_consume(total_len);
                            return Ok(BoundaryScanOutcome::Found(BoundaryMatch {
                                content,
                                kind,
                                depth,
                            }));
                        }
                    }
                }
                None => {
                    if eof {
                        let remaining = data.len();
                        let content = line_buffer.raw_consume(remaining);
                        return Ok(BoundaryScanOutcome::UnexpectedEof { content });
                    }
                    want = available + CHUNK;
                    continue;
                }
            }
        }
    }
}

/// Finds the earliest candidate boundary position across the whole
/// stack, ignoring anything before `min_pos`. Ties (a position matching
/// more than one boundary, which can only happen via a prefix
/// relationship between two distinct boundary strings) resolve to the
/// innermost frame, i.e. the highest index in `stack`.
fn find_best_candidate(
    data: &[u8],
    stack: &[BoundaryMarker],
    at_region_start: bool,
    min_pos: usize,
) -> Option<(usize, usize, usize)> {
    let mut best: Option<(usize, usize, usize)> = None;
    for (depth, frame) in stack.iter().enumerate().rev() {
        if let Some(pos) =
            find_candidate_position(data, &frame.marker, at_region_start, min_pos)
        {
            match best {
                None => best = Some((pos, depth, frame.marker.len())),
                Some((best_pos, _, _)) if pos < best_pos => {
                    best = Some((pos, depth, frame.marker.len()))
                }
                Some((best_pos, _, _)) if pos == best_pos => {
                    // Same position: innermost (higher index, iterated
                    // first via `.rev()`) already wins since we only
                    // overwrite on strictly smaller positions.
                }
                _ => {}
            }
        }
    }
    best
}

fn find_candidate_position(
    data: &[u8],
    marker: &[u8],
    at_region_start: bool,
    min_pos: usize,
) -> Option<usize> {
    let mut search_from = min_pos;
    while search_from <= data.len() {
        let rel = twoway::find_bytes(&data[search_from..], marker)?;
        let idx = search_from + rel;
        if idx == 0 {
            if at_region_start {
                return Some(idx);
            }
        } else if idx >= 2 && &data[idx - 2..idx] == b"\r\n" {
            return Some(idx);
        }
        search_from = idx + 1;
    }
    None
}

enum Classification {
    Match { kind: BoundaryKind, total_len: usize },
    NotAMatch,
    NeedMore,
}

fn classify_suffix(data: &[u8], pos: usize, marker_len: usize, eof: bool) -> Classification {
    let after = &data[pos + marker_len..];

    if after.starts_with(b"--") {
        // Close-delimiter: "--" LWSP* (CRLF | EOF). Trailing garbage on
        // the same line is ignored up to CRLF.
        let mut j = 2;
        loop {
            if j >= after.len() {
                return if eof {
                    Classification::Match {
                        kind: BoundaryKind::CloseDelimiter,
                        total_len: marker_len + j,
                    }
                } else {
                    Classification::NeedMore
                };
            }
            if after[j..].starts_with(b"\r\n") {
                return Classification::Match {
                    kind: BoundaryKind::CloseDelimiter,
                    total_len: marker_len + j + 2,
                };
            }
            j += 1;
        }
    }

    // Plain delimiter: LWSP* CRLF.
    let mut j = 0;
    while j < after.len() && (after[j] == b' ' || after[j] == b'\t') {
        j += 1;
    }
    if after[j..].starts_with(b"\r\n") {
        return Classification::Match {
            kind: BoundaryKind::Delimiter,
            total_len: marker_len + j + 2,
        };
    }
    if j + 2 > after.len() {
        return if eof {
            Classification::NotAMatch
        } else {
            Classification::NeedMore
        };
    }
    Classification::NotAMatch
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scan(input: &[u8], boundary: &str, at_start: bool) -> BoundaryScanOutcome {
        let mut lb = LineBuffer::new(Cursor::new(input.to_vec()), usize::MAX, true);
        let stack = vec![BoundaryMarker::new(boundary)];
        BoundaryScanner::scan(&mut lb, &stack, at_start).unwrap()
    }

    #[test]
    fn finds_delimiter_at_region_start() {
        let out = scan(b"--b\r\nafter", "b", true);
        match out {
            BoundaryScanOutcome::Found(m) => {
                assert_eq!(&m.content[..], b"");
                assert_eq!(m.kind, BoundaryKind::Delimiter);
            }
            _ => panic!("expected Found"),
        }
    }

    #[test]
    fn finds_delimiter_with_leading_crlf() {
        let out = scan(b"Part1\r\n--b\r\nPart2", "b", false);
        match out {
            BoundaryScanOutcome::Found(m) => {
                assert_eq!(&m.content[..], b"Part1");
                assert_eq!(m.kind, BoundaryKind::Delimiter);
            }
            _ => panic!("expected Found"),
        }
    }

    #[test]
    fn finds_close_delimiter() {
        let out = scan(b"Epilogue text\r\n--b--\r\nmore", "b", false);
        match out {
            BoundaryScanOutcome::Found(m) => {
                assert_eq!(&m.content[..], b"Epilogue text");
                assert_eq!(m.kind, BoundaryKind::CloseDelimiter);
            }
            _ => panic!("expected Found"),
        }
    }

    #[test]
    fn requires_leading_crlf_outside_region_start() {
        // "--b" appears, but not preceded by CRLF, and not at offset 0
        // with at_region_start=false: must skip to the next real match.
        let out = scan(b"x--b\r\n--b\r\nrest", "b", false);
        match out {
            BoundaryScanOutcome::Found(m) => {
                assert_eq!(&m.content[..], b"x--b");
            }
            _ => panic!("expected Found"),
        }
    }

    #[test]
    fn eof_without_boundary_is_unexpected_eof() {
        let out = scan(b"no boundary here", "b", false);
        match out {
            BoundaryScanOutcome::UnexpectedEof { content } => {
                assert_eq!(&content[..], b"no boundary here");
            }
            _ => panic!("expected UnexpectedEof"),
        }
    }

    #[test]
    fn innermost_boundary_wins_on_tie() {
        let mut lb = LineBuffer::new(
            Cursor::new(b"body\r\n--outer--inner\r\nrest".to_vec()),
            usize::MAX,
            true,
        );
        // Stack order mirrors the frame stack: index 0 is the outer
        // multipart frame, index 1 (pushed later) is the inner one.
        let stack = vec![
            BoundaryMarker::new("outer"),
            BoundaryMarker::new("outer--inner"),
        ];
        match BoundaryScanner::scan(&mut lb, &stack, false).unwrap() {
            BoundaryScanOutcome::Found(m) => {
                // Both "outer" (depth 0) and "outer--inner" (depth 1) start
                // at the same position; the scan must prefer the deeper,
                // innermost frame rather than stopping at the shorter
                // prefix belonging to the outer one.
                assert_eq!(m.depth, 1);
            }
            _ => panic!("expected Found"),
        }
    }
}
