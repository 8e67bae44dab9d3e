//! Transfer-encoding transducers.
//!
//! Each decoder wraps a lower `Read` byte source the way `base64`'s own
//! `read::DecoderReader` does, pulling and transforming bytes on demand
//! rather than buffering a whole body up front.

mod base64_decoder;
mod identity;
mod quoted_printable;

pub use base64_decoder::Base64Decoder;
pub use identity::IdentityDecoder;
pub use quoted_printable::{QuotedPrintableDecoder, QuotedPrintableEncoder};

use std::io::Read;

use crate::descriptor::TransferEncoding;

/// A transfer-decoded body reader, selected by [`TransferEncoding`].
///
/// `7bit`/`8bit`/`binary` and any unrecognized token (which records
/// `Warning::InvalidTransferEncoding` and falls back to identity) all
/// take the identity path.
pub enum BodyDecoder<R> {
    Identity(IdentityDecoder<R>),
    Base64(Base64Decoder<R>),
    QuotedPrintable(QuotedPrintableDecoder<R>),
}

impl<R: Read> BodyDecoder<R> {
    pub fn for_encoding(encoding: TransferEncoding, inner: R) -> Self {
        match encoding {
            TransferEncoding::Base64 => BodyDecoder::Base64(Base64Decoder::new(inner)),
            TransferEncoding::QuotedPrintable => {
                BodyDecoder::QuotedPrintable(QuotedPrintableDecoder::new(inner))
            }
            TransferEncoding::SevenBit
            | TransferEncoding::EightBit
            | TransferEncoding::Binary
            | TransferEncoding::Unrecognized => BodyDecoder::Identity(IdentityDecoder::new(inner)),
        }
    }
}

impl<R: Read> Read for BodyDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            BodyDecoder::Identity(d) => d.read(buf),
            BodyDecoder::Base64(d) => d.read(buf),
            BodyDecoder::QuotedPrintable(d) => d.read(buf),
        }
    }
}
