//! Response head as produced by the wire decoder.

use bytes::Bytes;
use http::Version;

use crate::htx::{Block, StartLineFlags, StatusLine};

/// Status line and raw headers of a response, in wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub version: Version,
    pub status: u16,
    pub reason: Bytes,
    pub headers: Vec<(Bytes, Bytes)>,
}

impl ResponseHead {
    /// Iterates the values of every header named `name`, ignoring case.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Bytes> + 'a {
        self.headers.iter().filter(move |(n, _)| n.eq_ignore_ascii_case(name.as_bytes())).map(|(_, v)| v)
    }

    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status)
    }

    fn version_bytes(&self) -> Bytes {
        match self.version {
            Version::HTTP_10 => Bytes::from_static(b"HTTP/1.0"),
            _ => Bytes::from_static(b"HTTP/1.1"),
        }
    }

    /// Converts the head into structured blocks: the status line, one block
    /// per header and the end-of-headers marker.
    pub fn into_blocks(self, flags: StartLineFlags) -> Vec<Block> {
        let mut flags = flags | StartLineFlags::IS_RESP;
        if self.version == Version::HTTP_11 {
            flags = flags | StartLineFlags::VER_11;
        }

        let mut blocks = Vec::with_capacity(self.headers.len() + 2);
        blocks.push(Block::ResStartLine(StatusLine {
            flags,
            version: self.version_bytes(),
            status: self.status,
            reason: self.reason,
        }));
        blocks.extend(self.headers.into_iter().map(|(name, value)| Block::Header { name, value }));
        blocks.push(Block::EndOfHeaders);
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head() -> ResponseHead {
        ResponseHead {
            version: Version::HTTP_11,
            status: 200,
            reason: Bytes::from_static(b"OK"),
            headers: vec![
                (Bytes::from_static(b"Content-Length"), Bytes::from_static(b"3")),
                (Bytes::from_static(b"Set-Cookie"), Bytes::from_static(b"a=1")),
                (Bytes::from_static(b"set-cookie"), Bytes::from_static(b"b=2")),
            ],
        }
    }

    #[test]
    fn header_values_ignore_case_and_keep_duplicates() {
        let head = head();
        let cookies: Vec<_> = head.header_values("SET-COOKIE").collect();
        assert_eq!(cookies, vec![&Bytes::from_static(b"a=1"), &Bytes::from_static(b"b=2")]);
        assert!(head.header_values("Server").next().is_none());
    }

    #[test]
    fn into_blocks_keeps_order() {
        let blocks = head().into_blocks(StartLineFlags::XFER_LEN);

        assert_eq!(blocks.len(), 5);
        match &blocks[0] {
            Block::ResStartLine(sl) => {
                assert!(sl.is_response());
                assert!(sl.flags.contains(StartLineFlags::VER_11 | StartLineFlags::XFER_LEN));
                assert_eq!(sl.version, Bytes::from_static(b"HTTP/1.1"));
                assert_eq!(sl.status, 200);
            }
            other => panic!("unexpected block {other:?}"),
        }
        assert_eq!(blocks[1], Block::header(&b"Content-Length"[..], &b"3"[..]));
        assert_eq!(blocks[4], Block::EndOfHeaders);
    }
}
