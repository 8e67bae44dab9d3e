/// One step of the entity state machine.
///
/// Each call to [`crate::stream::MimeTokenStream::next`] returns exactly
/// one of these. `Field`, `Body`, `Preamble`, `Epilogue`, and `RawEntity`
/// carry no payload on the token itself — the data is retrieved via
/// `field()`/`body_reader()` on the stream, which stays valid only until
/// the next `next()` call (see `Error::StaleBodyStream`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    StartHeader,
    Field,
    EndHeader,
    StartMultipart,
    Preamble,
    StartBodypart,
    Body,
    EndBodypart,
    Epilogue,
    EndMultipart,
    StartMessage,
    EndMessage,
    EndOfStream,
    /// Emitted instead of the usual Start/Header/Body/End sequence when
    /// the entering frame's recursion mode is `Raw`.
    RawEntity,
}
