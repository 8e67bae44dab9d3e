use thiserror::Error;

/// Everything that can make the token stream stop producing tokens.
///
/// Fatal: once `next()` or a body read returns one of these, the
/// stream is not resumable.
#[derive(Debug, Error)]
pub enum Error {
    #[error("line exceeded the configured maximum length of {max} bytes")]
    LineTooLong { max: usize },

    #[error("entity frame stack exceeded the configured maximum depth of {max}")]
    NestingTooDeep { max: usize },

    #[error("header line was malformed: {reason}")]
    MalformedHeader { reason: String },

    #[error("attempted to read from a body stream invalidated by a later call to next()")]
    StaleBodyStream,

    #[error("underlying byte source was closed or errored")]
    SourceClosed(#[from] std::io::Error),
}

/// Non-fatal conditions recorded on the stream and retrievable via
/// [`crate::stream::MimeTokenStream::warnings`].
///
/// These never stop the state machine; they explain why it recovered the
/// way it did.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Warning {
    #[error("content-transfer-encoding {encoding:?} is not recognized, falling back to identity")]
    InvalidTransferEncoding { encoding: String },

    #[error("input ended with {open_frames} entity frame(s) still open")]
    UnexpectedEof { open_frames: usize },

    #[error("header field {index} could not be split into name/value, treated as malformed")]
    MalformedField { index: usize },
}
