use std::fmt;
use std::ops::BitOr;

use bytes::Bytes;
use http::Method;

/// Flags carried by a start line.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct StartLineFlags(u32);

impl StartLineFlags {
    pub const NONE: Self = Self(0);
    /// The start line belongs to a response
    pub const IS_RESP: Self = Self(0x0000_0001);
    /// Version is HTTP/1.1
    pub const VER_11: Self = Self(0x0000_0002);
    /// The message length is known without reading until close
    pub const XFER_LEN: Self = Self(0x0000_0004);
    /// The message carries no body
    pub const BODYLESS: Self = Self(0x0000_0008);
    /// The request target was normalized
    pub const NORMALIZED_URI: Self = Self(0x0000_0010);
    /// The request target contains a scheme
    pub const HAS_SCHM: Self = Self(0x0000_0020);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for StartLineFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for StartLineFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StartLineFlags({:#x})", self.0)
    }
}

/// A request start line: `<method> <target> <version>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub flags: StartLineFlags,
    pub method: Method,
    pub target: Bytes,
    pub version: Bytes,
}

/// A response start line: `<version> <status> <reason>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub flags: StartLineFlags,
    pub version: Bytes,
    pub status: u16,
    pub reason: Bytes,
}

impl StatusLine {
    pub fn is_response(&self) -> bool {
        self.flags.contains(StartLineFlags::IS_RESP)
    }
}

/// A typed unit of an HTTP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    ReqStartLine(RequestLine),
    ResStartLine(StatusLine),
    /// A header as raw bytes; it is only validated when materialized
    Header { name: Bytes, value: Bytes },
    EndOfHeaders,
    Data(Bytes),
}

/// Accounting overhead of a single block inside an [`Htx`](super::Htx)
pub const BLOCK_OVERHEAD: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    ReqStartLine,
    ResStartLine,
    Header,
    EndOfHeaders,
    Data,
}

impl Block {
    pub fn header(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::Header { name: name.into(), value: value.into() }
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            Block::ReqStartLine(_) => BlockType::ReqStartLine,
            Block::ResStartLine(_) => BlockType::ResStartLine,
            Block::Header { .. } => BlockType::Header,
            Block::EndOfHeaders => BlockType::EndOfHeaders,
            Block::Data(_) => BlockType::Data,
        }
    }

    /// Number of payload bytes held by this block.
    pub fn payload_len(&self) -> usize {
        match self {
            Block::ReqStartLine(sl) => sl.method.as_str().len() + sl.target.len() + sl.version.len(),
            Block::ResStartLine(sl) => sl.version.len() + 3 + sl.reason.len(),
            Block::Header { name, value } => name.len() + value.len(),
            Block::EndOfHeaders => 0,
            Block::Data(data) => data.len(),
        }
    }

    /// Bytes this block occupies in a structured buffer.
    pub fn size(&self) -> usize {
        self.payload_len() + BLOCK_OVERHEAD
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Block::Data(_))
    }
}
