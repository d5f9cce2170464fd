//! Serializes the head blocks of a request onto the wire.
//!
//! Header names are written with the case they were given, and no header is
//! added or rewritten here: the request builder already decided what goes
//! out.

use std::io;
use std::io::ErrorKind;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::htx::{Block, RequestLine};

/// Encoder for the request line, header and end-of-headers blocks.
#[derive(Debug, Default)]
pub struct HeaderEncoder;

impl HeaderEncoder {
    fn put_request_line(line: &RequestLine, dst: &mut BytesMut) {
        dst.reserve(line.method.as_str().len() + line.target.len() + line.version.len() + 4);
        dst.put_slice(line.method.as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(&line.target);
        dst.put_u8(b' ');
        dst.put_slice(&line.version);
        dst.put_slice(b"\r\n");
    }
}

impl Encoder<&Block> for HeaderEncoder {
    type Error = io::Error;

    fn encode(&mut self, block: &Block, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match block {
            Block::ReqStartLine(line) => Self::put_request_line(line, dst),
            Block::Header { name, value } => {
                dst.reserve(name.len() + value.len() + 4);
                dst.put_slice(name);
                dst.put_slice(b": ");
                dst.put_slice(value);
                dst.put_slice(b"\r\n");
            }
            Block::EndOfHeaders => dst.put_slice(b"\r\n"),
            other => {
                error!(block_type = ?other.block_type(), "block can't be written as a request head");
                return Err(io::Error::from(ErrorKind::InvalidInput));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Method;

    use crate::htx::StartLineFlags;

    #[test]
    fn writes_head_verbatim() {
        let blocks = [
            Block::ReqStartLine(RequestLine {
                flags: StartLineFlags::VER_11,
                method: Method::GET,
                target: Bytes::from_static(b"http://example.com/"),
                version: Bytes::from_static(b"HTTP/1.1"),
            }),
            Block::header(&b"Host"[..], &b"example.com"[..]),
            Block::header(&b"x-lower"[..], &b"v"[..]),
            Block::EndOfHeaders,
        ];

        let mut dst = BytesMut::new();
        for block in &blocks {
            HeaderEncoder.encode(block, &mut dst).unwrap();
        }

        assert_eq!(&dst[..], b"GET http://example.com/ HTTP/1.1\r\nHost: example.com\r\nx-lower: v\r\n\r\n");
    }

    #[test]
    fn refuses_body_blocks() {
        let mut dst = BytesMut::new();
        let err = HeaderEncoder.encode(&Block::Data(Bytes::from_static(b"x")), &mut dst).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(dst.is_empty());
    }
}
