use std::collections::HashMap;

use crate::descriptor::{BodyDescriptor, TransferEncoding};
use crate::error::Warning;
use crate::field::Field;

type FieldParseFn = fn(&mut BodyDescriptor, &Field) -> Option<Warning>;

/// Maps a lowercased field name to the function that updates a
/// [`BodyDescriptor`] from it. Unregistered names (e.g. `Subject`, `Date`,
/// `From`) are a no-op — the address/date grammars themselves are out of
/// scope here.
pub struct FieldRegistry {
    parsers: HashMap<&'static str, FieldParseFn>,
}

impl FieldRegistry {
    pub fn with_builtins() -> Self {
        let mut parsers: HashMap<&'static str, FieldParseFn> = HashMap::new();
        parsers.insert("content-type", parse_content_type);
        parsers.insert("content-transfer-encoding", parse_content_transfer_encoding);
        parsers.insert("content-length", parse_content_length);
        Self { parsers }
    }

    /// Applies `field` to `descriptor` if a parser is registered for its
    /// name, returning any warning the parser produced.
    pub fn apply(&self, descriptor: &mut BodyDescriptor, field: &Field) -> Option<Warning> {
        let key = field.name().to_ascii_lowercase();
        self.parsers.get(key.as_str()).and_then(|f| f(descriptor, field))
    }
}

fn parse_content_type(descriptor: &mut BodyDescriptor, field: &Field) -> Option<Warning> {
    descriptor.apply_content_type(&field.unfolded());
    None
}

fn parse_content_transfer_encoding(
    descriptor: &mut BodyDescriptor,
    field: &Field,
) -> Option<Warning> {
    let raw = field.unfolded();
    let encoding = descriptor.apply_transfer_encoding(&raw);
    if encoding == TransferEncoding::Unrecognized {
        Some(Warning::InvalidTransferEncoding { encoding: raw })
    } else {
        None
    }
}

fn parse_content_length(descriptor: &mut BodyDescriptor, field: &Field) -> Option<Warning> {
    descriptor.apply_content_length(&field.unfolded());
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn field(name: &str, value: &str) -> Field {
        Field::new(
            name.to_string(),
            Bytes::copy_from_slice(value.as_bytes()),
            Bytes::new(),
        )
    }

    #[test]
    fn dispatches_content_type() {
        let registry = FieldRegistry::with_builtins();
        let mut descriptor = BodyDescriptor::default();
        let warning = registry.apply(&mut descriptor, &field("Content-Type", " text/html"));
        assert!(warning.is_none());
        assert_eq!(descriptor.mime_subtype(), "html");
    }

    #[test]
    fn warns_on_unrecognized_transfer_encoding() {
        let registry = FieldRegistry::with_builtins();
        let mut descriptor = BodyDescriptor::default();
        let warning = registry.apply(
            &mut descriptor,
            &field("Content-Transfer-Encoding", " x-weird"),
        );
        assert!(matches!(warning, Some(Warning::InvalidTransferEncoding { .. })));
    }

    #[test]
    fn unregistered_field_is_a_no_op() {
        let registry = FieldRegistry::with_builtins();
        let mut descriptor = BodyDescriptor::default();
        let before = descriptor.clone();
        let warning = registry.apply(&mut descriptor, &field("Subject", " hi"));
        assert!(warning.is_none());
        assert_eq!(descriptor, before);
    }
}
