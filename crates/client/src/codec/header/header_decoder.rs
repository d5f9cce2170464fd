//! Response head decoder.
//!
//! Parses the status line and the header fields of a response with
//! `httparse`, then slices names and values out of the frozen head bytes
//! instead of copying them. Header names keep the case they had on the wire
//! and duplicates keep their order.
//!
//! # Limits
//!
//! Both limits come from the client configuration:
//!
//! - the number of header fields (`max_headers`)
//! - the size of the whole head in bytes (`bufsize`)

use bytes::{Bytes, BytesMut};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, ResponseHead};

/// Shortest complete head: `HTTP/1.1 200\r\n\r\n`
const MIN_HEAD_LEN: usize = 16;

/// Decoder turning raw bytes into a [`ResponseHead`].
#[derive(Debug, Clone)]
pub struct HeaderDecoder {
    max_headers: usize,
    max_head_bytes: usize,
}

impl HeaderDecoder {
    pub fn new(max_headers: usize, max_head_bytes: usize) -> Self {
        Self { max_headers, max_head_bytes }
    }
}

impl Decoder for HeaderDecoder {
    type Item = ResponseHead;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < MIN_HEAD_LEN {
            return Ok(None);
        }

        let mut headers = vec![httparse::EMPTY_HEADER; self.max_headers];
        let mut res = httparse::Response::new(&mut headers);

        let status = res.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(self.max_headers),
            e => ParseError::invalid_header(e),
        })?;

        let head_len = match status {
            Status::Complete(head_len) => head_len,
            Status::Partial => {
                ensure!(src.len() <= self.max_head_bytes, ParseError::too_large_header(src.len(), self.max_head_bytes));
                return Ok(None);
            }
        };

        trace!(head_len, header_count = res.headers.len(), "parsed response head");
        ensure!(head_len <= self.max_head_bytes, ParseError::too_large_header(head_len, self.max_head_bytes));

        let version = match res.version {
            Some(0) => http::Version::HTTP_10,
            Some(1) => http::Version::HTTP_11,
            v => return Err(ParseError::InvalidVersion(v)),
        };
        let status = res.code.ok_or(ParseError::InvalidStatus(None))?;
        ensure!((100..1000).contains(&status), ParseError::InvalidStatus(Some(status)));

        let base = src.as_ptr() as usize;
        let reason = res.reason.filter(|r| !r.is_empty()).map(|r| Span::of(base, r.as_bytes()));
        let spans: Vec<(Span, Span)> =
            res.headers.iter().map(|h| (Span::of(base, h.name.as_bytes()), Span::of(base, h.value))).collect();

        let head = src.split_to(head_len).freeze();

        Ok(Some(ResponseHead {
            version,
            status,
            reason: reason.map_or_else(Bytes::new, |span| span.slice(&head)),
            headers: spans.into_iter().map(|(name, value)| (name.slice(&head), value.slice(&head))).collect(),
        }))
    }
}

/// Byte range of a parsed token inside the head buffer.
#[derive(Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
}

impl Span {
    fn of(base: usize, token: &[u8]) -> Self {
        let start = token.as_ptr() as usize - base;
        Self { start, end: start + token.len() }
    }

    fn slice(self, head: &Bytes) -> Bytes {
        head.slice(self.start..self.end)
    }
}
