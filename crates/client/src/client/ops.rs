use crate::client::HttpClient;

/// Notifications a caller receives while the response is demultiplexed.
///
/// Every method defaults to a no-op, so an implementor only overrides the
/// steps it cares about. Methods are called synchronously from the applet
/// with the client borrowed: read the response fields from `hc`, but don't
/// touch the shared handle itself from inside a callback.
#[cfg_attr(test, mockall::automock)]
pub trait HttpClientOps {
    /// The status line was stored, once per response.
    fn res_stline(&self, _hc: &HttpClient) {}

    /// The headers were committed, at most once per response.
    fn res_headers(&self, _hc: &HttpClient) {}

    /// Body bytes were appended to the response buffer.
    ///
    /// Fires once per copy: once for each data block that fits whole, and
    /// once for each part of a block split because the body buffer filled
    /// up. Every call leaves bytes to drain with
    /// [`HttpClient::res_xfer`](crate::client::HttpClient::res_xfer).
    fn res_payload(&self, _hc: &HttpClient) {}

    /// The exchange is over, exactly once per started client.
    fn res_end(&self, _hc: &HttpClient) {}
}

/// Callback table with nothing registered.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOps;

impl HttpClientOps for NoopOps {}
