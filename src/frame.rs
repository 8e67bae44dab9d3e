use crate::descriptor::BodyDescriptor;

/// Controls what the entity state machine does when it enters a new
/// entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionMode {
    /// Emit a single `RawEntity` token whose body stream yields the
    /// entire entity, headers included.
    Raw,
    /// Recurse into `message/rfc822` bodies (default).
    Recurse,
    /// Treat `message/rfc822` as an opaque body, without recursing.
    NoRecurse,
}

impl Default for RecursionMode {
    fn default() -> Self {
        RecursionMode::Recurse
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Message,
    Multipart,
    Bodypart,
}

/// One entry on the entity state machine's stack.
///
/// Pushed on `StartMessage`/`StartMultipart`/`StartBodypart`, popped on
/// the matching `End*`. A `Multipart` frame additionally carries the
/// `"--" + boundary` marker the boundary scanner tests against; the
/// full set of active markers is every `Multipart` frame's marker, in
/// stack order, innermost last.
#[derive(Debug, Clone)]
pub struct EntityFrame {
    pub kind: FrameKind,
    pub descriptor: BodyDescriptor,
    pub boundary: Option<crate::boundary::BoundaryMarker>,
    /// Set once the body/preamble/epilogue belonging to this frame has
    /// been fully consumed, so a second `next()` call without an
    /// intervening body read doesn't re-scan it.
    pub exhausted: bool,
    /// This frame's recursion mode, inherited from `ParserConfig` at
    /// push time unless overridden by `set_recursion_mode` before the
    /// frame was entered.
    pub recursion_mode: RecursionMode,
    /// Preamble has already been emitted for this multipart frame.
    /// Distinguishes "about to scan for the first delimiter" from
    /// "already inside a bodypart" across repeated `next()` calls.
    pub preamble_emitted: bool,
}

impl EntityFrame {
    pub fn new(
        kind: FrameKind,
        descriptor: BodyDescriptor,
        boundary: Option<crate::boundary::BoundaryMarker>,
        recursion_mode: RecursionMode,
    ) -> Self {
        Self {
            kind,
            descriptor,
            boundary,
            exhausted: false,
            recursion_mode,
            preamble_emitted: false,
        }
    }
}
