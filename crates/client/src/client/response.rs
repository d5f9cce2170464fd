use bytes::{Bytes, BytesMut};

use crate::buffer::BoundedBuf;
use crate::protocol::HttpHeader;

/// Response fields filled in by the applet.
#[derive(Debug)]
pub struct HttpClientResponse {
    status: u16,
    vsn: Bytes,
    reason: Bytes,
    headers: Option<Vec<HttpHeader>>,
    body: BoundedBuf,
    received: u64,
}

impl HttpClientResponse {
    pub(crate) fn new(body: BytesMut) -> Self {
        Self { status: 0, vsn: Bytes::new(), reason: Bytes::new(), headers: None, body: BoundedBuf::new(body), received: 0 }
    }

    /// Status code, `0` until the status line was received.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Protocol version as sent by the server, e.g. `HTTP/1.1`.
    pub fn vsn(&self) -> &str {
        std::str::from_utf8(&self.vsn).unwrap_or_default()
    }

    pub fn reason(&self) -> &[u8] {
        &self.reason
    }

    /// Committed headers in wire order.
    ///
    /// `None` until the whole header section was extracted; a response whose
    /// headers could not all be extracted never gets any.
    pub fn headers(&self) -> Option<&[HttpHeader]> {
        self.headers.as_deref()
    }

    /// Body bytes waiting to be drained with
    /// [`HttpClient::res_xfer`](crate::client::HttpClient::res_xfer).
    pub fn body(&self) -> &[u8] {
        self.body.as_slice()
    }

    /// Total body bytes received so far, drained or not.
    pub fn received(&self) -> u64 {
        self.received
    }

    pub(crate) fn set_status_line(&mut self, status: u16, vsn: Bytes, reason: Bytes) {
        self.status = status;
        self.vsn = vsn;
        self.reason = reason;
    }

    pub(crate) fn commit_headers(&mut self, headers: Vec<HttpHeader>) {
        self.headers = Some(headers);
    }

    pub(crate) fn body_buf(&self) -> &BoundedBuf {
        &self.body
    }

    pub(crate) fn body_buf_mut(&mut self) -> &mut BoundedBuf {
        &mut self.body
    }

    /// Appends as much of `data` as fits in the body buffer.
    pub(crate) fn put_body(&mut self, data: &[u8]) -> usize {
        let written = self.body.put_slice(data);
        self.received += written as u64;
        written
    }

    pub(crate) fn take_body_buf(&mut self) -> BytesMut {
        std::mem::replace(&mut self.body, BoundedBuf::with_capacity(0)).into_inner()
    }
}
