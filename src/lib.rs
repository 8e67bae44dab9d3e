//! A streaming token parser for Internet Message Format (RFC 5322)
//! entities with MIME (RFC 2045-2049) multipart and nested-message
//! structure.
//!
//! [`MimeTokenStream`] is a pull-based state machine: each call to
//! [`MimeTokenStream::next`] advances it by exactly one [`Token`],
//! walking arbitrarily nested `multipart/*` and `message/rfc822`
//! structure, decoding transfer encodings on demand, and exposing each
//! body as its own sub-stream without buffering the whole input.

mod boundary;
mod charset;
mod codec;
mod config;
mod descriptor;
mod error;
mod field;
mod fields;
mod frame;
mod header;
mod linebuf;
mod position;
mod stream;
mod token;

pub use charset::Charset;
pub use codec::{Base64Decoder, BodyDecoder, IdentityDecoder, QuotedPrintableDecoder, QuotedPrintableEncoder};
pub use config::{MalformedHeaderPolicy, ParserConfig};
pub use descriptor::{BodyDescriptor, TransferEncoding};
pub use error::{Error, Warning};
pub use field::Field;
pub use frame::RecursionMode;
pub use position::Position;
pub use stream::{BodyReader, MimeTokenStream};
pub use token::Token;
