//! Tunables of the http client engine.
//!
//! The configuration is plain data: it is built once (usually from a JSON
//! document) and handed to [`HttpClientProxy`](crate::client::HttpClientProxy),
//! which passes it down to every client it starts.

use std::time::Duration;

use serde::Deserialize;

/// Default size of a pooled buffer, inbound channel and response body buffer
pub const DEFAULT_BUFSIZE: usize = 16 * 1024;

/// Default maximum number of response headers
pub const DEFAULT_MAX_HEADERS: usize = 101;

/// Default `User-Agent` sent by the console adapter
pub const DEFAULT_USER_AGENT: &str = "micro-httpclient";

/// Engine configuration.
///
/// Every field has a default, so a partial JSON document such as
/// `{"max_headers": 32}` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Capacity in bytes of pool buffers, of the inbound block channel and of
    /// the response body buffer. Also bounds the size of the response head.
    pub bufsize: usize,

    /// Maximum number of headers accepted in a response.
    pub max_headers: usize,

    /// Inactivity timeout in milliseconds while waiting for response bytes.
    /// `None` waits forever.
    pub timeout_ms: Option<u64>,

    /// `User-Agent` value sent by the console adapter.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            bufsize: DEFAULT_BUFSIZE,
            max_headers: DEFAULT_MAX_HEADERS,
            timeout_ms: None,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpClientConfig {
    /// Parses a configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the document is malformed or a
    /// field has the wrong type.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = HttpClientConfig::from_json(r#"{"max_headers": 32, "timeout_ms": 1500}"#).unwrap();

        assert_eq!(config.max_headers, 32);
        assert_eq!(config.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.bufsize, DEFAULT_BUFSIZE);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(HttpClientConfig::from_json("{}").unwrap(), HttpClientConfig::default());
        assert_eq!(HttpClientConfig::default().timeout(), None);
    }

    #[test]
    fn wrong_type_is_rejected() {
        assert!(HttpClientConfig::from_json(r#"{"bufsize": "big"}"#).is_err());
    }
}
