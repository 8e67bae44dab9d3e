use std::io::{self, Read};

use bytes::Bytes;

use crate::boundary::{BoundaryKind, BoundaryMarker, BoundaryScanOutcome, BoundaryScanner};
use crate::codec::BodyDecoder;
use crate::config::ParserConfig;
use crate::descriptor::BodyDescriptor;
use crate::error::{Error, Warning};
use crate::field::Field;
use crate::fields::FieldRegistry;
use crate::frame::{EntityFrame, FrameKind, RecursionMode};
use crate::header::HeaderScanner;
use crate::linebuf::LineBuffer;
use crate::position::Position;
use crate::token::Token;

/// What a body-ish token's captured bytes are for, and therefore whether
/// [`MimeTokenStream::body_reader`] should run them through a transfer
/// decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContentKind {
    /// A bodypart/message body: decode per its `Content-Transfer-Encoding`.
    Body,
    /// Preamble, epilogue, or a `RawEntity` capture: delivered verbatim.
    Raw,
}

/// Which active boundary a scan resolved to, and what should happen once
/// the frame stack is unwound down to it.
#[derive(Debug, Clone, Copy)]
enum PendingOutcome {
    Delimiter { target: usize },
    CloseDelimiter { target: usize },
    Eof,
}

/// What the next call to [`MimeTokenStream::next`] should do.
enum Cursor {
    AwaitingHeaderStart,
    InHeader,
    AfterEndHeader,
    AwaitingMultipartScan,
    /// Capture the whole remaining input as a single `RawEntity`, used
    /// only for the root entity when its recursion mode is `Raw`.
    RawRoot,
    AfterEpilogue(PendingOutcome),
    PopMultipartOwner(PendingOutcome),
    ResolvePendingOutcome(PendingOutcome),
    Finished,
}

/// A decoded or raw body/preamble/epilogue/raw-entity byte stream, valid
/// until the next call to [`MimeTokenStream::next`].
pub enum BodyReader {
    Decoded(BodyDecoder<io::Cursor<Bytes>>),
    Raw(io::Cursor<Bytes>),
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BodyReader::Decoded(d) => d.read(buf),
            BodyReader::Raw(c) => c.read(buf),
        }
    }
}

/// The entity state machine: the top-level coordinator that walks a
/// stack of entity frames, driving the header parser and boundary
/// scanner, and exposing one [`Token`] at a time.
pub struct MimeTokenStream<R> {
    config: ParserConfig,
    line_buffer: LineBuffer<R>,
    frames: Vec<EntityFrame>,
    cursor: Cursor,
    header_scanner: Option<HeaderScanner>,
    field_registry: FieldRegistry,
    current_field: Option<Field>,
    current_content: Option<Bytes>,
    current_content_kind: ContentKind,
    raw_entity_descriptor: Option<BodyDescriptor>,
    warnings: Vec<Warning>,
    unexpected_eof: bool,
    finished: bool,
    /// One-shot override consumed by the next frame entered, per
    /// `set_recursion_mode`'s contract ("before the frame was entered").
    pending_recursion_mode: Option<RecursionMode>,
    /// Consumed exactly once, at the first `AfterEndHeader` (the
    /// synthetic root pushed by `parse_headless`), regardless of which
    /// branch handles that frame — see DESIGN.md for why an unconditional
    /// clear is required instead of only clearing inside the multipart
    /// branch.
    suppress_next_start_multipart: bool,
}

impl<R: Read> MimeTokenStream<R> {
    /// Parses `source` as a full IMF message: headers, then body.
    pub fn parse(source: R, config: ParserConfig) -> Result<Self, Error> {
        check_depth(0, config.max_nesting_depth)?;

        let mut stream = Self::new(source, config);
        if stream.config.recursion_mode == RecursionMode::Raw {
            stream.cursor = Cursor::RawRoot;
        } else {
            stream.frames.push(EntityFrame::new(
                FrameKind::Message,
                BodyDescriptor::default(),
                None,
                stream.config.recursion_mode,
            ));
            stream.cursor = Cursor::AwaitingHeaderStart;
        }
        Ok(stream)
    }

    /// Parses `source` as a headless body: no surrounding IMF headers, a
    /// `Content-Type` supplied out of band. `StartMultipart` for the
    /// synthesized root is suppressed — see DESIGN.md.
    pub fn parse_headless(
        source: R,
        forced_content_type: &str,
        config: ParserConfig,
    ) -> Result<Self, Error> {
        check_depth(0, config.max_nesting_depth)?;

        let mut descriptor = BodyDescriptor::default();
        descriptor.apply_content_type(forced_content_type);

        let mut stream = Self::new(source, config);
        stream.frames.push(EntityFrame::new(
            FrameKind::Message,
            descriptor,
            None,
            stream.config.recursion_mode,
        ));
        stream.suppress_next_start_multipart = true;
        stream.cursor = Cursor::AfterEndHeader;
        Ok(stream)
    }

    fn new(source: R, config: ParserConfig) -> Self {
        let line_buffer = LineBuffer::new(source, config.max_line_length, config.tolerate_bare_lf);
        Self {
            config,
            line_buffer,
            frames: Vec::new(),
            cursor: Cursor::Finished,
            header_scanner: None,
            field_registry: FieldRegistry::with_builtins(),
            current_field: None,
            current_content: None,
            current_content_kind: ContentKind::Raw,
            raw_entity_descriptor: None,
            warnings: Vec::new(),
            unexpected_eof: false,
            finished: false,
            pending_recursion_mode: None,
            suppress_next_start_multipart: false,
        }
    }

    /// Advances the state machine by exactly one [`Token`].
    pub fn next(&mut self) -> Result<Token, Error> {
        self.current_content = None;
        self.raw_entity_descriptor = None;

        if self.finished {
            return Ok(Token::EndOfStream);
        }

        match std::mem::replace(&mut self.cursor, Cursor::Finished) {
            Cursor::AwaitingHeaderStart => self.start_header(),
            Cursor::InHeader => self.continue_header(),
            Cursor::AfterEndHeader => self.after_end_header(),
            Cursor::AwaitingMultipartScan => self.awaiting_multipart_scan(),
            Cursor::RawRoot => self.enter_raw_frame(BodyDescriptor::default()),
            Cursor::AfterEpilogue(outcome) => self.after_epilogue(outcome),
            Cursor::PopMultipartOwner(outcome) => self.pop_multipart_owner(outcome),
            Cursor::ResolvePendingOutcome(outcome) => self.resolve_pending_outcome(outcome),
            Cursor::Finished => self.finish(),
        }
    }

    fn start_header(&mut self) -> Result<Token, Error> {
        log::trace!("entering header block for frame depth {}", self.frames.len());
        self.header_scanner = Some(HeaderScanner::new());
        self.cursor = Cursor::InHeader;
        Ok(Token::StartHeader)
    }

    fn continue_header(&mut self) -> Result<Token, Error> {
        let mut scanner = self.header_scanner.take().expect("header scanner active");
        let field = scanner.next_field(
            &mut self.line_buffer,
            self.config.malformed_header_policy,
            &mut self.warnings,
        )?;
        match field {
            Some(field) => {
                let top = self.frames.last_mut().expect("frame on stack during header scan");
                if let Some(warning) = self.field_registry.apply(&mut top.descriptor, &field) {
                    self.warnings.push(warning);
                }
                self.current_field = Some(field);
                self.header_scanner = Some(scanner);
                self.cursor = Cursor::InHeader;
                Ok(Token::Field)
            }
            None => {
                self.current_field = None;
                self.cursor = Cursor::AfterEndHeader;
                Ok(Token::EndHeader)
            }
        }
    }

    fn after_end_header(&mut self) -> Result<Token, Error> {
        let suppress = std::mem::take(&mut self.suppress_next_start_multipart);
        let idx = self.frames.len() - 1;
        let descriptor = self.frames[idx].descriptor.clone();

        if descriptor.is_multipart() {
            match descriptor.boundary() {
                Some(boundary) => {
                    let marker = BoundaryMarker::new(boundary);
                    let inherited_mode = self.frames[idx].recursion_mode;
                    log::debug!("entering multipart region with boundary {:?}", boundary);
                    self.frames.push(EntityFrame::new(
                        FrameKind::Multipart,
                        descriptor,
                        Some(marker),
                        inherited_mode,
                    ));
                    self.cursor = Cursor::AwaitingMultipartScan;
                    if suppress {
                        self.awaiting_multipart_scan()
                    } else {
                        Ok(Token::StartMultipart)
                    }
                }
                None => {
                    log::debug!("multipart content-type missing a boundary parameter, degrading to opaque body");
                    self.begin_body()
                }
            }
        } else if descriptor.is_message_rfc822() {
            match self.frames[idx].recursion_mode {
                RecursionMode::NoRecurse => self.begin_body(),
                RecursionMode::Recurse => {
                    check_depth(self.frames.len(), self.config.max_nesting_depth)?;
                    let child_mode = self
                        .pending_recursion_mode
                        .take()
                        .unwrap_or(self.config.recursion_mode);
                    let child_descriptor = BodyDescriptor::default_for_child(Some(&descriptor), true);
                    if child_mode == RecursionMode::Raw {
                        self.enter_raw_frame(child_descriptor)
                    } else {
                        self.frames.push(EntityFrame::new(
                            FrameKind::Message,
                            child_descriptor,
                            None,
                            child_mode,
                        ));
                        self.cursor = Cursor::AwaitingHeaderStart;
                        Ok(Token::StartMessage)
                    }
                }
                RecursionMode::Raw => unreachable!("Raw-mode frames never reach AfterEndHeader"),
            }
        } else {
            self.begin_body()
        }
    }

    fn begin_body(&mut self) -> Result<Token, Error> {
        let (content, outcome) = self.scan_to_boundary(false)?;
        if let Some(frame) = self.frames.last_mut() {
            frame.exhausted = true;
        }
        self.current_content = Some(content);
        self.current_content_kind = ContentKind::Body;
        self.cursor = Cursor::ResolvePendingOutcome(outcome);
        Ok(Token::Body)
    }

    fn enter_raw_frame(&mut self, descriptor: BodyDescriptor) -> Result<Token, Error> {
        check_depth(self.frames.len(), self.config.max_nesting_depth)?;
        log::debug!("capturing entity {} in raw mode", self.frames.len());
        let (content, outcome) = self.scan_to_boundary(false)?;
        self.current_content = Some(content);
        self.current_content_kind = ContentKind::Raw;
        self.raw_entity_descriptor = Some(descriptor);
        self.cursor = Cursor::ResolvePendingOutcome(outcome);
        Ok(Token::RawEntity)
    }

    fn awaiting_multipart_scan(&mut self) -> Result<Token, Error> {
        let (content, outcome) = self.scan_to_boundary(true)?;
        if let Some(frame) = self.frames.last_mut() {
            frame.preamble_emitted = true;
        }
        if content.is_empty() {
            self.resolve_pending_outcome(outcome)
        } else {
            self.current_content = Some(content);
            self.current_content_kind = ContentKind::Raw;
            self.cursor = Cursor::ResolvePendingOutcome(outcome);
            Ok(Token::Preamble)
        }
    }

    fn push_bodypart(&mut self, target: usize) -> Result<Token, Error> {
        check_depth(self.frames.len(), self.config.max_nesting_depth)?;
        let mode = self
            .pending_recursion_mode
            .take()
            .unwrap_or(self.config.recursion_mode);
        let descriptor = BodyDescriptor::default_for_child(None, false);
        if mode == RecursionMode::Raw {
            return self.enter_raw_frame(descriptor);
        }
        debug_assert_eq!(self.frames[target].kind, FrameKind::Multipart);
        self.frames
            .push(EntityFrame::new(FrameKind::Bodypart, descriptor, None, mode));
        self.cursor = Cursor::AwaitingHeaderStart;
        Ok(Token::StartBodypart)
    }

    fn begin_epilogue(&mut self, target: usize) -> Result<Token, Error> {
        let (content, outcome) = self.scan_to_boundary_excluding(false, target)?;
        self.current_content = Some(content);
        self.current_content_kind = ContentKind::Raw;
        self.cursor = Cursor::AfterEpilogue(outcome);
        Ok(Token::Epilogue)
    }

    fn after_epilogue(&mut self, outcome: PendingOutcome) -> Result<Token, Error> {
        let frame = self.frames.pop().expect("multipart frame present after epilogue");
        debug_assert_eq!(frame.kind, FrameKind::Multipart);
        self.cursor = Cursor::PopMultipartOwner(outcome);
        Ok(Token::EndMultipart)
    }

    fn pop_multipart_owner(&mut self, outcome: PendingOutcome) -> Result<Token, Error> {
        let frame = self.frames.pop().expect("multipart owner frame present");
        let token = match frame.kind {
            FrameKind::Message => Token::EndMessage,
            FrameKind::Bodypart => Token::EndBodypart,
            FrameKind::Multipart => unreachable!("a multipart frame cannot own another directly"),
        };
        self.cursor = Cursor::ResolvePendingOutcome(outcome);
        Ok(token)
    }

    fn resolve_pending_outcome(&mut self, outcome: PendingOutcome) -> Result<Token, Error> {
        match outcome {
            PendingOutcome::Eof => {
                if self.frames.is_empty() {
                    self.finish()
                } else {
                    let frame = self.frames.pop().unwrap();
                    let token = match frame.kind {
                        FrameKind::Message => Token::EndMessage,
                        FrameKind::Bodypart => Token::EndBodypart,
                        FrameKind::Multipart => Token::EndMultipart,
                    };
                    self.cursor = Cursor::ResolvePendingOutcome(PendingOutcome::Eof);
                    Ok(token)
                }
            }
            PendingOutcome::Delimiter { target } | PendingOutcome::CloseDelimiter { target } => {
                let top_idx = self.frames.len() - 1;
                if top_idx != target {
                    // An ancestor's boundary interrupted a still-open
                    // descendant frame. No close-delimiter/epilogue was
                    // ever seen for it, so it closes the same way an
                    // unexpected-EOF frame would: straight to its End*
                    // token, no fabricated Epilogue.
                    let frame = self.frames.pop().unwrap();
                    let token = match frame.kind {
                        FrameKind::Message => Token::EndMessage,
                        FrameKind::Bodypart => Token::EndBodypart,
                        FrameKind::Multipart => Token::EndMultipart,
                    };
                    self.cursor = Cursor::ResolvePendingOutcome(outcome);
                    Ok(token)
                } else {
                    match outcome {
                        PendingOutcome::Delimiter { .. } => self.push_bodypart(target),
                        PendingOutcome::CloseDelimiter { .. } => self.begin_epilogue(target),
                        PendingOutcome::Eof => unreachable!(),
                    }
                }
            }
        }
    }

    fn finish(&mut self) -> Result<Token, Error> {
        self.finished = true;
        self.cursor = Cursor::Finished;
        Ok(Token::EndOfStream)
    }

    /// Every currently open `Multipart` frame's boundary marker, paired
    /// with its index in `self.frames`, innermost last.
    fn active_boundary_stack(&self) -> Vec<(usize, BoundaryMarker)> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.kind == FrameKind::Multipart)
            .filter_map(|(i, f)| f.boundary.clone().map(|b| (i, b)))
            .collect()
    }

    fn scan_to_boundary(&mut self, at_region_start: bool) -> Result<(Bytes, PendingOutcome), Error> {
        self.scan_active(at_region_start, None)
    }

    fn scan_to_boundary_excluding(
        &mut self,
        at_region_start: bool,
        exclude_idx: usize,
    ) -> Result<(Bytes, PendingOutcome), Error> {
        self.scan_active(at_region_start, Some(exclude_idx))
    }

    fn scan_active(
        &mut self,
        at_region_start: bool,
        exclude_idx: Option<usize>,
    ) -> Result<(Bytes, PendingOutcome), Error> {
        let indexed: Vec<(usize, BoundaryMarker)> = self
            .active_boundary_stack()
            .into_iter()
            .filter(|(i, _)| Some(*i) != exclude_idx)
            .collect();
        let markers: Vec<BoundaryMarker> = indexed.iter().map(|(_, m)| m.clone()).collect();

        match BoundaryScanner::scan(&mut self.line_buffer, &markers, at_region_start)? {
            BoundaryScanOutcome::Found(m) => {
                let (frame_idx, _) = indexed[m.depth];
                log::trace!("boundary match at frame {} ({:?})", frame_idx, m.kind);
                let outcome = match m.kind {
                    BoundaryKind::Delimiter => PendingOutcome::Delimiter { target: frame_idx },
                    BoundaryKind::CloseDelimiter => PendingOutcome::CloseDelimiter { target: frame_idx },
                };
                Ok((m.content, outcome))
            }
            BoundaryScanOutcome::UnexpectedEof { content } => {
                if !markers.is_empty() {
                    log::debug!("reached EOF with {} boundary frame(s) still open", markers.len());
                    self.unexpected_eof = true;
                    self.warnings.push(Warning::UnexpectedEof {
                        open_frames: self.frames.len(),
                    });
                }
                Ok((content, PendingOutcome::Eof))
            }
        }
    }

    /// The descriptor of the entity whose tokens are currently being
    /// emitted.
    pub fn body_descriptor(&self) -> Option<&BodyDescriptor> {
        self.raw_entity_descriptor
            .as_ref()
            .or_else(|| self.frames.last().map(|f| &f.descriptor))
    }

    /// The field most recently returned via `Token::Field`.
    pub fn field(&self) -> Option<&Field> {
        self.current_field.as_ref()
    }

    /// A reader over the content captured by the most recent `Body`,
    /// `Preamble`, `Epilogue`, or `RawEntity` token. Valid only until the
    /// next call to `next()`; a second call fails with
    /// `Error::StaleBodyStream`.
    pub fn body_reader(&mut self) -> Result<BodyReader, Error> {
        let content = self.current_content.take().ok_or(Error::StaleBodyStream)?;
        let cursor = io::Cursor::new(content);
        match self.current_content_kind {
            ContentKind::Body => {
                let encoding = self
                    .frames
                    .last()
                    .map(|f| f.descriptor.transfer_encoding())
                    .unwrap_or_default();
                Ok(BodyReader::Decoded(BodyDecoder::for_encoding(encoding, cursor)))
            }
            ContentKind::Raw => Ok(BodyReader::Raw(cursor)),
        }
    }

    /// Overrides the recursion mode applied to the next entity this
    /// stream enters. One-shot: cleared once consumed.
    pub fn set_recursion_mode(&mut self, mode: RecursionMode) {
        self.pending_recursion_mode = Some(mode);
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn unexpected_eof(&self) -> bool {
        self.unexpected_eof
    }

    /// The current position in the underlying byte source, updated on
    /// every byte consumed by the line buffer.
    pub fn position(&self) -> Position {
        self.line_buffer.position()
    }
}

fn check_depth(current_len: usize, max: usize) -> Result<(), Error> {
    if current_len >= max {
        Err(Error::NestingTooDeep { max })
    } else {
        Ok(())
    }
}
