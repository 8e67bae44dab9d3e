use crate::frame::RecursionMode;

/// What to do with a header field whose first line has no `:` or whose
/// name contains bytes outside `1*<ASCII 33-126 excluding ':'>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedHeaderPolicy {
    /// Emit the line as a [`crate::field::Field`] with an empty name and
    /// record a [`crate::error::Warning::MalformedField`] (default).
    Tolerate,
    /// Fail the stream with [`crate::error::Error::MalformedHeader`].
    Fail,
}

/// Knobs accepted by [`crate::stream::MimeTokenStream::parse`] and
/// [`crate::stream::MimeTokenStream::parse_headless`].
///
/// There is no environment variable or file based configuration; every
/// setting is plumbed in explicitly by the caller.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Oversize logical lines fail with `Error::LineTooLong`. Default is
    /// effectively unbounded.
    pub max_line_length: usize,

    /// Upper bound on simultaneous entity frames. Default 100.
    pub max_nesting_depth: usize,

    /// Whether a bare `LF` (not preceded by `CR`) terminates a logical
    /// line. Default `true`.
    pub tolerate_bare_lf: bool,

    /// Policy applied to malformed header lines. Default `Tolerate`.
    pub malformed_header_policy: MalformedHeaderPolicy,

    /// Recursion mode applied to the initial entity and to every
    /// subsequently entered entity, unless overridden mid-stream via
    /// `set_recursion_mode`. Default `Recurse`.
    pub recursion_mode: RecursionMode,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_line_length: usize::MAX,
            max_nesting_depth: 100,
            tolerate_bare_lf: true,
            malformed_header_policy: MalformedHeaderPolicy::Tolerate,
            recursion_mode: RecursionMode::Recurse,
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line_length(mut self, max: usize) -> Self {
        self.max_line_length = max;
        self
    }

    pub fn with_max_nesting_depth(mut self, max: usize) -> Self {
        self.max_nesting_depth = max;
        self
    }

    pub fn with_tolerate_bare_lf(mut self, tolerate: bool) -> Self {
        self.tolerate_bare_lf = tolerate;
        self
    }

    pub fn with_malformed_header_policy(mut self, policy: MalformedHeaderPolicy) -> Self {
        self.malformed_header_policy = policy;
        self
    }

    pub fn with_recursion_mode(mut self, mode: RecursionMode) -> Self {
        self.recursion_mode = mode;
        self
    }
}
