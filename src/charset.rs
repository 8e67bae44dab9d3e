//! A minimal named charset lookup.
//!
//! Character-set *conversion* is out of scope here: this crate
//! never transcodes bytes. What the state machine needs is just a way to
//! recognize a `charset` parameter name well enough to normalize it for
//! the [`crate::descriptor::BodyDescriptor`] and to hand to a caller-side
//! conversion table. Consumers that need actual decoding plug in their
//! own table keyed on the name this returns.

/// A recognized charset name, normalized to lowercase.
///
/// Unknown names are preserved verbatim (lowercased) rather than
/// rejected: a `charset` parameter only needs to be *recognized* in both
/// quoted and unquoted form, not validated against a fixed registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset(String);

impl Charset {
    pub const US_ASCII: &'static str = "us-ascii";

    pub fn lookup(name: &str) -> Self {
        Charset(name.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_ascii_compatible(&self) -> bool {
        matches!(self.0.as_str(), "us-ascii" | "ascii" | "utf-8" | "utf8")
    }
}

impl Default for Charset {
    fn default() -> Self {
        Charset(Self::US_ASCII.to_string())
    }
}

impl std::fmt::Display for Charset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
