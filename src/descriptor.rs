use crate::charset::Charset;

/// `Content-Transfer-Encoding`, parsed as a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    SevenBit,
    EightBit,
    Binary,
    Base64,
    QuotedPrintable,
    /// Anything else. The entity state machine falls back to identity
    /// decoding and records `Warning::InvalidTransferEncoding`.
    Unrecognized,
}

impl TransferEncoding {
    pub fn parse(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "7bit" => TransferEncoding::SevenBit,
            "8bit" => TransferEncoding::EightBit,
            "binary" => TransferEncoding::Binary,
            "base64" => TransferEncoding::Base64,
            "quoted-printable" => TransferEncoding::QuotedPrintable,
            _ => TransferEncoding::Unrecognized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferEncoding::SevenBit => "7bit",
            TransferEncoding::EightBit => "8bit",
            TransferEncoding::Binary => "binary",
            TransferEncoding::Base64 => "base64",
            TransferEncoding::QuotedPrintable => "quoted-printable",
            TransferEncoding::Unrecognized => "7bit",
        }
    }
}

impl Default for TransferEncoding {
    fn default() -> Self {
        TransferEncoding::SevenBit
    }
}

/// Parsed metadata about the entity currently being read, built
/// incrementally from header fields as they're parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyDescriptor {
    mime_type: String,
    mime_subtype: String,
    boundary: Option<String>,
    charset: Charset,
    transfer_encoding: TransferEncoding,
    content_length: Option<u64>,
}

impl Default for BodyDescriptor {
    fn default() -> Self {
        Self {
            mime_type: "text".to_string(),
            mime_subtype: "plain".to_string(),
            boundary: None,
            charset: Charset::default(),
            transfer_encoding: TransferEncoding::default(),
            content_length: None,
        }
    }
}

impl BodyDescriptor {
    /// Default descriptor for a freshly pushed child frame. A
    /// `message/rfc822` child whose own headers never set a Content-Type
    /// inherits the parent's descriptor wholesale; every other child
    /// defaults to `text/plain; charset=us-ascii`.
    pub fn default_for_child(parent: Option<&BodyDescriptor>, is_rfc822_child: bool) -> Self {
        match (is_rfc822_child, parent) {
            (true, Some(parent)) => parent.clone(),
            _ => BodyDescriptor::default(),
        }
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn mime_subtype(&self) -> &str {
        &self.mime_subtype
    }

    pub fn is_multipart(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case("multipart")
    }

    pub fn is_message_rfc822(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case("message") && self.mime_subtype.eq_ignore_ascii_case("rfc822")
    }

    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    pub fn charset(&self) -> &Charset {
        &self.charset
    }

    pub fn transfer_encoding(&self) -> TransferEncoding {
        self.transfer_encoding
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Applies a parsed `Content-Type` field. Malformed values degrade to
    /// the existing defaults without failing the stream.
    pub fn apply_content_type(&mut self, raw_value: &str) {
        let parsed = parse_content_type(raw_value);
        self.mime_type = parsed.mime_type;
        self.mime_subtype = parsed.mime_subtype;
        if let Some(boundary) = parsed.boundary {
            self.boundary = Some(boundary);
        }
        if let Some(charset) = parsed.charset {
            self.charset = Charset::lookup(&charset);
        }
    }

    /// Applies a parsed `Content-Transfer-Encoding` field, returning the
    /// resulting encoding so the caller can warn on an unrecognized token.
    pub fn apply_transfer_encoding(&mut self, raw_value: &str) -> TransferEncoding {
        self.transfer_encoding = TransferEncoding::parse(raw_value);
        self.transfer_encoding
    }

    /// Applies a parsed `Content-Length` field, ignoring anything that
    /// doesn't parse as a non-negative integer.
    pub fn apply_content_length(&mut self, raw_value: &str) {
        if let Ok(len) = raw_value.trim().parse::<u64>() {
            self.content_length = Some(len);
        }
    }
}

struct ParsedContentType {
    mime_type: String,
    mime_subtype: String,
    boundary: Option<String>,
    charset: Option<String>,
}

/// Parses `type/subtype; param=value; ...`, preferring the `mime` crate
/// for the common case and falling back to a permissive hand split for
/// anything it rejects (stray whitespace, duplicate params, etc.) so the
/// stream degrades to defaults instead of failing outright.
fn parse_content_type(raw: &str) -> ParsedContentType {
    let (mime_type, mime_subtype, mut boundary, mut charset) = match raw.trim().parse::<mime::Mime>()
    {
        Ok(m) => (
            m.type_().as_str().to_ascii_lowercase(),
            m.subtype().as_str().to_ascii_lowercase(),
            m.get_param("boundary").map(|v| v.as_str().to_string()),
            m.get_param(mime::CHARSET).map(|v| v.as_str().to_string()),
        ),
        Err(_) => parse_content_type_lenient(raw),
    };

    // Layer in RFC 2231 continuations (`boundary*0`, `boundary*1`, ...)
    // which the `mime` crate does not understand.
    let (cont_boundary, cont_charset) = scan_rfc2231_continuations(raw);
    if boundary.is_none() {
        boundary = cont_boundary;
    }
    if charset.is_none() {
        charset = cont_charset;
    }

    ParsedContentType {
        mime_type,
        mime_subtype,
        boundary,
        charset,
    }
}

fn parse_content_type_lenient(raw: &str) -> (String, String, Option<String>, Option<String>) {
    let mut parts = split_top_level(raw, ';').into_iter();
    let type_subtype = parts.next().unwrap_or("").trim();
    let (mime_type, mime_subtype) = match type_subtype.split_once('/') {
        Some((t, s)) => (
            t.trim().to_ascii_lowercase(),
            s.trim().to_ascii_lowercase(),
        ),
        None => ("text".to_string(), "plain".to_string()),
    };

    let mut boundary = None;
    let mut charset = None;
    for param in parts {
        if let Some((key, value)) = param.split_once('=') {
            let key = key.trim().to_ascii_lowercase();
            let value = unquote(value.trim());
            match key.as_str() {
                "boundary" => boundary = Some(value),
                "charset" => charset = Some(value),
                _ => {}
            }
        }
    }

    (mime_type, mime_subtype, boundary, charset)
}

fn scan_rfc2231_continuations(raw: &str) -> (Option<String>, Option<String>) {
    let mut boundary_parts: Vec<(u32, String)> = Vec::new();
    let mut charset_parts: Vec<(u32, String)> = Vec::new();

    for param in split_top_level(raw, ';').into_iter().skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let Some((base, rest)) = key.split_once('*') else {
            continue;
        };
        let base = base.to_ascii_lowercase();
        if base != "boundary" && base != "charset" {
            continue;
        }
        // `name*N` (plain continuation) or `name*N*` (extended, with a
        // leading charset'lang' annotation on segment 0 that we strip).
        let (index_str, extended) = match rest.strip_suffix('*') {
            Some(stripped) => (stripped, true),
            None => (rest, false),
        };
        let Ok(index) = index_str.parse::<u32>() else {
            continue;
        };
        let mut value = unquote(value.trim()).to_string();
        if extended && index == 0 {
            // charset'language'value — keep only the value part.
            if let Some(pos) = value.match_indices('\'').nth(1) {
                value = value[pos.0 + 1..].to_string();
            }
        }
        match base.as_str() {
            "boundary" => boundary_parts.push((index, value)),
            "charset" => charset_parts.push((index, value)),
            _ => unreachable!(),
        }
    }

    let assemble = |mut parts: Vec<(u32, String)>| -> Option<String> {
        if parts.is_empty() {
            return None;
        }
        parts.sort_by_key(|(i, _)| *i);
        Some(parts.into_iter().map(|(_, v)| v).collect::<String>())
    };

    (assemble(boundary_parts), assemble(charset_parts))
}

/// Splits `s` on `sep` while treating `"..."` spans (with backslash
/// escapes) as opaque, so `boundary="a;b"` isn't split on the `;` inside
/// the quoted value.
fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            c if c == sep && !in_quotes => {
                out.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    out.push(&s[start..]);
    out
}

fn unquote(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"' {
        let inner = &s[1..s.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                    continue;
                }
            }
            out.push(c);
        }
        out
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_multipart_boundary() {
        let mut d = BodyDescriptor::default();
        d.apply_content_type("multipart/mixed; boundary=1729");
        assert!(d.is_multipart());
        assert_eq!(d.boundary(), Some("1729"));
    }

    #[test]
    fn parses_quoted_boundary_with_special_chars() {
        let mut d = BodyDescriptor::default();
        d.apply_content_type(r#"multipart/mixed; boundary="---- =_NextPart 000""#);
        assert_eq!(d.boundary(), Some("---- =_NextPart 000"));
    }

    #[test]
    fn parses_charset_case_insensitively() {
        let mut d = BodyDescriptor::default();
        d.apply_content_type("text/plain; charset=US-ASCII");
        assert_eq!(d.charset().as_str(), "us-ascii");
    }

    #[test]
    fn rfc2231_continuations_assemble_in_order() {
        let mut d = BodyDescriptor::default();
        d.apply_content_type(
            "multipart/mixed; boundary*0=abc; boundary*1=def",
        );
        assert_eq!(d.boundary(), Some("abcdef"));
    }

    #[test]
    fn malformed_content_type_degrades_to_default() {
        let mut d = BodyDescriptor::default();
        d.apply_content_type("");
        assert_eq!(d.mime_type(), "text");
        assert_eq!(d.mime_subtype(), "plain");
    }

    #[test]
    fn transfer_encoding_falls_back_for_unknown_tokens() {
        assert_eq!(
            TransferEncoding::parse("x-proprietary"),
            TransferEncoding::Unrecognized
        );
        assert_eq!(TransferEncoding::parse("Base64"), TransferEncoding::Base64);
    }

    #[test]
    fn rfc822_child_inherits_parent_descriptor_when_headerless() {
        let mut parent = BodyDescriptor::default();
        parent.apply_content_type("message/rfc822");
        parent.apply_content_type("text/html; charset=iso-8859-1");
        let child = BodyDescriptor::default_for_child(Some(&parent), true);
        assert_eq!(child.mime_type(), "text");
        assert_eq!(child.charset().as_str(), "iso-8859-1");

        let non_rfc822_child = BodyDescriptor::default_for_child(Some(&parent), false);
        assert_eq!(non_rfc822_child.mime_type(), "text");
        assert_eq!(non_rfc822_child.mime_subtype(), "plain");
        assert_eq!(non_rfc822_child.charset().as_str(), "us-ascii");
    }
}
