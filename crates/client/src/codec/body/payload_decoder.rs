//! Chooses the body framing of a response and decodes it.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};

/// Decodes a response body with the framing announced by its head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    /// Everything up to the connection close is body
    UntilClose,
    NoBody,
}

impl PayloadDecoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    pub fn until_close() -> Self {
        Self { kind: Kind::UntilClose }
    }

    /// Whether the peer closing the connection ends the body cleanly.
    pub fn ends_on_close(&self) -> bool {
        matches!(self.kind, Kind::UntilClose)
    }
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(size: PayloadSize) -> Self {
        match size {
            PayloadSize::Length(0) | PayloadSize::Empty => Self::empty(),
            PayloadSize::Length(n) => Self::fix_length(n),
            PayloadSize::Chunked => Self::chunked(),
            PayloadSize::UntilClose => Self::until_close(),
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(length_decoder) => length_decoder.decode(src),
            Kind::Chunked(chunked_decoder) => chunked_decoder.decode(src),
            Kind::UntilClose if src.is_empty() => Ok(None),
            Kind::UntilClose => Ok(Some(PayloadItem::Chunk(src.split().freeze()))),
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_decoder_from_size() {
        assert_eq!(PayloadDecoder::from(PayloadSize::Length(0)), PayloadDecoder::empty());
        assert_eq!(PayloadDecoder::from(PayloadSize::Empty), PayloadDecoder::empty());
        assert_eq!(PayloadDecoder::from(PayloadSize::Chunked), PayloadDecoder::chunked());
        assert!(PayloadDecoder::from(PayloadSize::UntilClose).ends_on_close());
        assert!(!PayloadDecoder::from(PayloadSize::Length(3)).ends_on_close());
    }

    #[test]
    fn until_close_takes_everything() {
        let mut decoder = PayloadDecoder::until_close();
        let mut src = BytesMut::from(&b"partial body"[..]);

        let item = decoder.decode(&mut src).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap().as_ref(), b"partial body");
        assert!(src.is_empty());
        assert_eq!(decoder.decode(&mut src).unwrap(), None);
    }

    #[test]
    fn no_body_is_immediately_done() {
        let mut src = BytesMut::from(&b"next"[..]);
        assert_eq!(PayloadDecoder::empty().decode(&mut src).unwrap(), Some(PayloadItem::Eof));
        assert_eq!(&src[..], b"next");
    }
}
