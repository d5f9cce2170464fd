use bytes::Bytes;
use http::Uri;
use tracing::{debug, trace};

use crate::client::HttpClient;
use crate::ensure;
use crate::htx::{Block, RequestLine, StartLineFlags};
use crate::protocol::{GenerationError, HttpHeader, is_known_method};

const HTTP_11: &[u8] = b"HTTP/1.1";

impl HttpClient {
    /// Builds the structured request into the request buffer.
    ///
    /// The request is the start line (the absolute url as target), a `Host`
    /// header taken from the url authority, then `headers` in order, the end
    /// of headers and the end of message. A `Host` in `headers` is dropped,
    /// the url authority always wins.
    ///
    /// # Errors
    ///
    /// Fails when the method isn't a known one, the url isn't absolute, the
    /// request was already generated, or the request doesn't fit in the
    /// buffer. A client whose generation failed must not be started.
    pub fn req_gen(&mut self, headers: &[HttpHeader]) -> Result<(), GenerationError> {
        let method = &self.req.method;
        ensure!(is_known_method(method), GenerationError::UnknownMethod(method.clone()));

        let htx = &mut self.req.htx;
        ensure!(htx.is_empty() && !htx.is_eom(), GenerationError::BufferInUse);

        let uri: Uri = self.req.url.parse().map_err(GenerationError::invalid_url)?;
        ensure!(uri.scheme().is_some(), GenerationError::invalid_url("url is not absolute"));
        let host = host_of(&uri).ok_or_else(|| GenerationError::MissingHost { url: self.req.url.clone() })?;

        let flags = StartLineFlags::VER_11
            | StartLineFlags::XFER_LEN
            | StartLineFlags::BODYLESS
            | StartLineFlags::NORMALIZED_URI
            | StartLineFlags::HAS_SCHM;

        htx.push(Block::ReqStartLine(RequestLine {
            flags,
            method: method.clone(),
            target: Bytes::copy_from_slice(self.req.url.as_bytes()),
            version: Bytes::from_static(HTTP_11),
        }))?;
        htx.add_header(Bytes::from_static(b"Host"), host)?;

        for header in headers {
            if header.is("host") {
                debug!(?header, "drop supplied host header");
                continue;
            }
            htx.add_header(header.name_bytes().clone(), header.value_bytes().clone())?;
        }

        htx.add_eoh()?;
        htx.set_eom();

        trace!(size = htx.size(), blocks = htx.len(), "request generated");
        Ok(())
    }
}

/// `host[:port]` part of the url authority, without user info.
fn host_of(uri: &Uri) -> Option<Bytes> {
    let authority = uri.authority()?.as_str();
    let host = authority.rsplit('@').next().filter(|host| !host.is_empty())?;
    Some(Bytes::copy_from_slice(host.as_bytes()))
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use bytes::BytesMut;
    use http::Method;
    use tokio_util::codec::Encoder;

    use super::*;
    use crate::codec::RequestEncoder;
    use crate::htx::HtxError;
    use crate::pool::BufferPool;

    fn generate(method: Method, url: &str, headers: &[HttpHeader]) -> Result<BytesMut, GenerationError> {
        let pool = Rc::new(BufferPool::new(1024));
        let client = HttpClient::new(&pool, None, method, url).unwrap();
        let mut hc = client.borrow_mut();
        hc.req_gen(headers)?;

        assert!(hc.req.htx.is_eom());

        let mut encoder = RequestEncoder::new();
        let mut wire = BytesMut::new();
        for block in hc.req.htx.iter() {
            encoder.encode(block, &mut wire).unwrap();
        }
        Ok(wire)
    }

    #[test]
    fn get_with_user_agent() {
        let wire = generate(Method::GET, "http://example.com/", &[HttpHeader::from_static("User-Agent", "X")]).unwrap();

        assert_eq!(&wire[..], b"GET http://example.com/ HTTP/1.1\r\nHost: example.com\r\nUser-Agent: X\r\n\r\n");
    }

    #[test]
    fn host_is_never_duplicated() {
        let headers = [HttpHeader::from_static("host", "other.example"), HttpHeader::from_static("Accept", "*/*")];

        let wire = generate(Method::HEAD, "https://user:pw@127.0.0.1:8443/status?full", &headers).unwrap();

        assert_eq!(
            &wire[..],
            &b"HEAD https://user:pw@127.0.0.1:8443/status?full HTTP/1.1\r\nHost: 127.0.0.1:8443\r\nAccept: */*\r\n\r\n"[..]
        );
    }

    #[test]
    fn start_line_flags() {
        let pool = Rc::new(BufferPool::new(1024));
        let client = HttpClient::new(&pool, None, Method::DELETE, "http://[::1]:8080/x").unwrap();
        let mut hc = client.borrow_mut();
        hc.req_gen(&[]).unwrap();

        let Some(Block::ReqStartLine(line)) = hc.req.htx.first() else {
            panic!("request must start with a start line");
        };
        assert!(line.flags.contains(StartLineFlags::BODYLESS | StartLineFlags::XFER_LEN | StartLineFlags::HAS_SCHM));
        assert_eq!(line.version, Bytes::from_static(b"HTTP/1.1"));
        assert_eq!(hc.req.htx.iter().nth(1), Some(&Block::header(&b"Host"[..], &b"[::1]:8080"[..])));
    }

    #[test]
    fn unknown_method() {
        let method = Method::from_bytes(b"PURGE").unwrap();
        let err = generate(method.clone(), "http://example.com/", &[]).unwrap_err();
        assert_eq!(err, GenerationError::UnknownMethod(method));

        assert_eq!(generate(Method::PATCH, "http://example.com/", &[]).unwrap_err(), GenerationError::UnknownMethod(Method::PATCH));
    }

    #[test]
    fn relative_url() {
        assert!(matches!(generate(Method::GET, "/index.html", &[]), Err(GenerationError::InvalidUrl { .. })));
        assert!(matches!(generate(Method::GET, "http://exa mple/", &[]), Err(GenerationError::InvalidUrl { .. })));
    }

    #[test]
    fn request_too_large() {
        let value = "v".repeat(2048);
        let header = HttpHeader::new(Bytes::from_static(b"X-Large"), Bytes::from(value)).unwrap();

        let err = generate(Method::GET, "http://example.com/", &[header]).unwrap_err();
        assert!(matches!(err, GenerationError::NoRoom { source: HtxError::NoRoom { .. } }));
    }

    #[test]
    fn generates_only_once() {
        let pool = Rc::new(BufferPool::new(1024));
        let client = HttpClient::new(&pool, None, Method::GET, "http://example.com/").unwrap();
        let mut hc = client.borrow_mut();

        hc.req_gen(&[]).unwrap();
        assert_eq!(hc.req_gen(&[]).unwrap_err(), GenerationError::BufferInUse);
    }
}
