use std::fmt;

use bytes::Bytes;
use http::{HeaderName, HeaderValue};

use crate::protocol::HeaderError;

/// A single `name: value` pair.
///
/// Unlike `http::HeaderMap` the name keeps the case it was written with and
/// pairs keep their order, duplicates included. Both parts are validated
/// when the pair is built.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpHeader {
    name: Bytes,
    value: Bytes,
}

impl HttpHeader {
    /// Builds a header from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HeaderError`] when the name is not a token or the value
    /// contains forbidden bytes.
    pub fn new(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<Self, HeaderError> {
        let name = name.into();
        let value = value.into();

        if HeaderName::from_bytes(&name).is_err() {
            return Err(HeaderError::InvalidName(name));
        }
        if HeaderValue::from_maybe_shared(value.clone()).is_err() {
            return Err(HeaderError::InvalidValue(name));
        }

        Ok(Self { name, value })
    }

    /// Builds a header from static strings.
    ///
    /// # Panics
    ///
    /// Panics if the pair is not a valid header, like `HeaderValue::from_static`.
    pub fn from_static(name: &'static str, value: &'static str) -> Self {
        match Self::new(Bytes::from_static(name.as_bytes()), Bytes::from_static(value.as_bytes())) {
            Ok(header) => header,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn name(&self) -> &str {
        // a valid header name is ascii
        std::str::from_utf8(&self.name).unwrap_or_default()
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn name_bytes(&self) -> &Bytes {
        &self.name
    }

    pub fn value_bytes(&self) -> &Bytes {
        &self.value
    }

    /// Case-insensitive name comparison.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.as_bytes())
    }
}

impl fmt::Debug for HttpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), String::from_utf8_lossy(&self.value))
    }
}
