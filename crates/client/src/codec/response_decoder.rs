//! Streaming decoder for a single HTTP/1.x response.
//!
//! The decoder yields the response head first, then payload items until
//! [`PayloadItem::Eof`]. Interim `1xx` responses are skipped (except
//! `101 Switching Protocols`, which ends the exchange) so callers only ever
//! see the final response.

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::config::HttpClientConfig;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, ResponseHead};

#[derive(Debug)]
pub struct ResponseDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
    head_request: bool,
    done: bool,
}

impl ResponseDecoder {
    /// Creates a decoder for the response to a request.
    ///
    /// `head_request` must be set when the request method was `HEAD`, since
    /// such responses announce a length without carrying a body.
    pub fn new(config: &HttpClientConfig, head_request: bool) -> Self {
        Self {
            header_decoder: HeaderDecoder::new(config.max_headers, config.bufsize),
            payload_decoder: None,
            head_request,
            done: false,
        }
    }

    /// Whether the whole response was decoded.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<(ResponseHead, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.done {
            return Ok(None);
        }

        if let Some(payload_decoder) = &mut self.payload_decoder {
            let item = payload_decoder.decode(src)?;
            if let Some(PayloadItem::Eof) = item {
                self.payload_decoder = None;
                self.done = true;
            }
            return Ok(item.map(Message::Payload));
        }

        loop {
            let Some(head) = self.header_decoder.decode(src)? else {
                return Ok(None);
            };

            if head.is_informational() && head.status != 101 {
                trace!(status = head.status, "skip interim response");
                continue;
            }

            let payload_size = payload_size(&head, self.head_request)?;
            trace!(status = head.status, ?payload_size, "decoded response head");
            self.payload_decoder = Some(payload_size.into());
            return Ok(Some(Message::Header((head, payload_size))));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }

        if self.done {
            return Ok(None);
        }

        match &self.payload_decoder {
            Some(payload_decoder) if payload_decoder.ends_on_close() => {
                self.payload_decoder = None;
                self.done = true;
                Ok(Some(Message::Payload(PayloadItem::Eof)))
            }
            Some(_) => Err(ParseError::invalid_body("connection closed before the end of the body")),
            None if src.is_empty() => Ok(None),
            None => Err(ParseError::invalid_header("connection closed inside the response head")),
        }
    }
}

/// Determines how the body of `head` is delimited
/// ([RFC 9112 Section 6.3](https://www.rfc-editor.org/rfc/rfc9112#section-6.3)).
fn payload_size(head: &ResponseHead, head_request: bool) -> Result<PayloadSize, ParseError> {
    if head_request || head.is_informational() || head.status == 204 || head.status == 304 {
        return Ok(PayloadSize::Empty);
    }

    // transfer-encoding overrides content-length
    if let Some(te) = head.header_values("transfer-encoding").last() {
        return Ok(if is_chunked(te) { PayloadSize::Chunked } else { PayloadSize::UntilClose });
    }

    let mut length = None;
    for value in head.header_values("content-length") {
        let parsed = std::str::from_utf8(value)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| ParseError::invalid_content_length(format!("value {value:?} is not u64")))?;

        match length {
            Some(prev) if prev != parsed => {
                return Err(ParseError::invalid_content_length("conflicting content-length values"));
            }
            _ => length = Some(parsed),
        }
    }

    Ok(length.map_or(PayloadSize::UntilClose, PayloadSize::Length))
}

/// Whether `chunked` is the final transfer coding.
fn is_chunked(value: &Bytes) -> bool {
    value.rsplit(|b| *b == b',').next().is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(b"chunked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn decoder(head_request: bool) -> ResponseDecoder {
        ResponseDecoder::new(&HttpClientConfig::default(), head_request)
    }

    fn body_of(decoder: &mut ResponseDecoder, src: &mut BytesMut) -> (Vec<u8>, bool) {
        let mut body = Vec::new();
        while let Some(message) = decoder.decode(src).unwrap() {
            match message {
                Message::Payload(PayloadItem::Chunk(bytes)) => body.extend_from_slice(&bytes),
                Message::Payload(PayloadItem::Eof) => return (body, true),
                Message::Header(_) => panic!("unexpected second head"),
            }
        }
        (body, false)
    }

    #[test]
    fn content_length_body() {
        let mut src = BytesMut::from(indoc! {"
            HTTP/1.1 200 OK
            Content-Length: 5

            hello"});
        let mut decoder = decoder(false);

        let Some(Message::Header((head, size))) = decoder.decode(&mut src).unwrap() else {
            panic!("expected head");
        };
        assert_eq!(head.status, 200);
        assert_eq!(size, PayloadSize::Length(5));

        assert_eq!(body_of(&mut decoder, &mut src), (b"hello".to_vec(), true));
        assert!(decoder.is_done());
        assert!(decoder.decode(&mut src).unwrap().is_none());
    }

    #[test]
    fn skips_interim_responses() {
        let mut src = BytesMut::from("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 204 No Content\r\n\r\n");
        let mut decoder = decoder(false);

        let Some(Message::Header((head, size))) = decoder.decode(&mut src).unwrap() else {
            panic!("expected head");
        };
        assert_eq!(head.status, 204);
        assert_eq!(size, PayloadSize::Empty);
        assert!(matches!(decoder.decode(&mut src).unwrap(), Some(Message::Payload(PayloadItem::Eof))));
    }

    #[test]
    fn head_request_has_no_body() {
        let mut src = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 1234\r\n\r\n");
        let mut decoder = decoder(true);

        let Some(Message::Header((_, size))) = decoder.decode(&mut src).unwrap() else {
            panic!("expected head");
        };
        assert_eq!(size, PayloadSize::Empty);
    }

    #[test]
    fn transfer_encoding_wins_over_length() {
        let mut src = BytesMut::from(indoc! {"
            HTTP/1.1 200 OK
            Content-Length: 100
            Transfer-Encoding: gzip, Chunked

            "});
        let mut decoder = decoder(false);

        let Some(Message::Header((_, size))) = decoder.decode(&mut src).unwrap() else {
            panic!("expected head");
        };
        assert_eq!(size, PayloadSize::Chunked);
    }

    #[test]
    fn conflicting_lengths_are_rejected() {
        let mut src = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\n");
        assert!(matches!(decoder(false).decode(&mut src), Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn body_until_close() {
        let mut src = BytesMut::from("HTTP/1.0 200 OK\r\n\r\nsome bytes");
        let mut decoder = decoder(false);

        let Some(Message::Header((_, size))) = decoder.decode(&mut src).unwrap() else {
            panic!("expected head");
        };
        assert_eq!(size, PayloadSize::UntilClose);
        assert_eq!(body_of(&mut decoder, &mut src), (b"some bytes".to_vec(), false));

        assert!(matches!(decoder.decode_eof(&mut src).unwrap(), Some(Message::Payload(PayloadItem::Eof))));
        assert!(decoder.decode_eof(&mut src).unwrap().is_none());
    }

    #[test]
    fn truncated_body_is_an_error() {
        let mut src = BytesMut::from("HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort");
        let mut decoder = decoder(false);

        decoder.decode(&mut src).unwrap();
        body_of(&mut decoder, &mut src);
        assert!(matches!(decoder.decode_eof(&mut src), Err(ParseError::InvalidBody { .. })));
    }
}
