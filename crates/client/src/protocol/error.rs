use std::io;

use http::Method;
use thiserror::Error;

use crate::htx::HtxError;

#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("construction error: {source}")]
    Construction {
        #[from]
        source: ConstructionError,
    },

    #[error("request generation error: {source}")]
    Generation {
        #[from]
        source: GenerationError,
    },

    #[error("address error: {source}")]
    Address {
        #[from]
        source: AddressError,
    },
}

/// Allocating a client or one of its buffers failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("no buffer left in pool for the {which} buffer")]
    BufferExhausted { which: &'static str },
}

impl ConstructionError {
    pub fn buffer_exhausted(which: &'static str) -> Self {
        Self::BufferExhausted { which }
    }
}

/// Building the structured request failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("unknown http method: {0}")]
    UnknownMethod(Method),

    #[error("invalid request url: {reason}")]
    InvalidUrl { reason: String },

    #[error("request buffer is already in use")]
    BufferInUse,

    #[error("request does not fit in buffer: {source}")]
    NoRoom {
        #[from]
        source: HtxError,
    },

    #[error("can't derive host from url {url}")]
    MissingHost { url: String },
}

impl GenerationError {
    pub fn invalid_url<S: ToString>(str: S) -> Self {
        Self::InvalidUrl { reason: str.to_string() }
    }
}

/// The url can't be turned into a routable destination.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("cannot parse uri '{url}': {reason}")]
    InvalidUri { url: String, reason: String },

    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),

    #[error("uri '{0}' has no host")]
    MissingHost(String),

    #[error("host '{0}' is not a literal address and no resolver is available")]
    UnresolvedHost(String),
}

impl AddressError {
    pub fn invalid_uri<S: ToString>(url: &str, reason: S) -> Self {
        Self::InvalidUri { url: url.to_owned(), reason: reason.to_string() }
    }
}

/// Errors raised while decoding a response off the wire.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http status: {0:?}")]
    InvalidStatus(Option<u16>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }
}

/// A header name or value is not valid HTTP.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("invalid header name: {0:?}")]
    InvalidName(bytes::Bytes),

    #[error("invalid value for header {0:?}")]
    InvalidValue(bytes::Bytes),
}
