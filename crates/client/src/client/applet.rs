//! The response demultiplexer.
//!
//! [`HttpClientApplet`] is a resumable step function: each call to
//! [`HttpClientApplet::io_handler`] makes as much progress as the channels
//! allow and returns to the scheduler. Between calls only the state, the
//! headers staged so far and the end guard are kept.
//!
//! ```text
//! SendRequest -> StatusLine -> Headers -> Body -> End
//!                     |            |               ^
//!                     +------------+---------------+  (no body, mismatch, shutdown)
//! ```

use std::mem;

use tracing::{trace, warn};

use crate::client::HttpClient;
use crate::htx::Block;
use crate::protocol::HttpHeader;
use crate::stream::StreamInterface;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppletState {
    SendRequest,
    StatusLine,
    Headers,
    Body,
    End,
}

/// Why the applet gave control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// More inbound blocks are needed
    Input,
    /// The body buffer is full until the caller drains it
    Room,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Pending(Wait),
    /// The exchange is over and both directions are closed
    Done,
}

enum Flow {
    /// Run the current state again
    Continue,
    /// Nothing to do without new input
    More,
    /// Body buffer full
    Room,
}

#[derive(Debug)]
pub struct HttpClientApplet {
    state: AppletState,
    staged: Vec<HttpHeader>,
    max_headers: usize,
    ended: bool,
}

impl HttpClientApplet {
    pub fn new(max_headers: usize) -> Self {
        Self { state: AppletState::SendRequest, staged: Vec::new(), max_headers, ended: false }
    }

    pub fn state(&self) -> AppletState {
        self.state
    }

    pub fn io_handler(&mut self, hc: &mut HttpClient, si: &mut StreamInterface) -> Step {
        loop {
            let flow = match self.state {
                AppletState::SendRequest => self.send_request(hc, si),
                AppletState::StatusLine => self.status_line(hc, si),
                AppletState::Headers => self.headers(hc, si),
                AppletState::Body => self.body(hc, si),
                AppletState::End => {
                    self.end(hc, si);
                    return Step::Done;
                }
            };

            match flow {
                Flow::Continue => {}
                Flow::Room => return Step::Pending(Wait::Room),
                Flow::More if si.shutdown_seen() => {
                    trace!(state = ?self.state, "shutdown while waiting for input");
                    self.state = AppletState::End;
                }
                Flow::More => return Step::Pending(Wait::Input),
            }
        }
    }

    fn send_request(&mut self, hc: &mut HttpClient, si: &mut StreamInterface) -> Flow {
        let moved = hc.req.htx.transfer_to(si.req.htx_mut());
        si.req.add_input(moved);
        trace!(bytes = moved, "request handed to transport");

        self.state = AppletState::StatusLine;
        // let the transport send the request before looking for a response
        Flow::More
    }

    fn status_line(&mut self, hc: &mut HttpClient, si: &mut StreamInterface) -> Flow {
        match si.res.htx_mut().remove_first() {
            None => Flow::More,
            Some(Block::ResStartLine(line)) if line.is_response() => {
                hc.res.set_status_line(line.status, line.version, line.reason);
                hc.ops().res_stline(hc);

                self.state = if message_done(si) { AppletState::End } else { AppletState::Headers };
                Flow::Continue
            }
            Some(other) => {
                warn!(block_type = ?other.block_type(), "response does not start with a status line");
                self.state = AppletState::End;
                Flow::Continue
            }
        }
    }

    fn headers(&mut self, hc: &mut HttpClient, si: &mut StreamInterface) -> Flow {
        loop {
            let Some(block) = si.res.htx_mut().remove_first() else {
                return Flow::More;
            };

            match block {
                Block::Header { name, value } => {
                    if self.staged.len() >= self.max_headers {
                        warn!(max_headers = self.max_headers, "too many response headers");
                        self.state = AppletState::End;
                        return Flow::Continue;
                    }

                    match HttpHeader::new(name, value) {
                        Ok(header) => self.staged.push(header),
                        Err(e) => {
                            warn!(cause = %e, "can't extract response header");
                            self.state = AppletState::End;
                            return Flow::Continue;
                        }
                    }
                }
                Block::EndOfHeaders => break,
                other => {
                    warn!(block_type = ?other.block_type(), "unexpected block in response headers");
                    self.state = AppletState::End;
                    return Flow::Continue;
                }
            }
        }

        if !self.staged.is_empty() {
            hc.res.commit_headers(mem::take(&mut self.staged));
            hc.ops().res_headers(hc);
        }

        self.state = if message_done(si) { AppletState::End } else { AppletState::Body };
        Flow::Continue
    }

    fn body(&mut self, hc: &mut HttpClient, si: &mut StreamInterface) -> Flow {
        loop {
            if hc.res.body_buf().is_full() {
                trace!("response body buffer full");
                return Flow::Room;
            }

            let htx = si.res.htx_mut();
            match htx.first() {
                None if htx.is_eom() => {
                    self.state = AppletState::End;
                    return Flow::Continue;
                }
                None => return Flow::More,
                Some(Block::Data(_)) => {
                    let room = hc.res.body_buf().room();
                    if let Some(data) = htx.take_data(room) {
                        hc.res.put_body(&data);
                        hc.ops().res_payload(hc);
                    }
                }
                Some(_) => {
                    htx.remove_first();
                }
            }
        }
    }

    fn end(&mut self, hc: &mut HttpClient, si: &mut StreamInterface) {
        if !self.ended {
            self.ended = true;
            hc.ops().res_end(hc);
        }
        si.shutw();
        si.shutr();
    }
}

/// Nothing is left in the inbound channel and nothing more will come.
fn message_done(si: &StreamInterface) -> bool {
    let htx = si.res.htx();
    htx.is_empty() && htx.is_eom()
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use bytes::{Bytes, BytesMut};
    use http::Method;
    use mockall::Sequence;

    use super::*;
    use crate::client::{HttpClientResponse, MockHttpClientOps, SharedHttpClient};
    use crate::htx::{StartLineFlags, StatusLine};
    use crate::pool::BufferPool;

    struct Harness {
        _pool: Rc<BufferPool>,
        client: SharedHttpClient,
        applet: HttpClientApplet,
        si: StreamInterface,
    }

    impl Harness {
        /// A client whose request was already handed to the transport.
        fn new(body_size: usize, ops: MockHttpClientOps) -> Self {
            let pool = Rc::new(BufferPool::new(1024));
            let client = HttpClient::new(&pool, None, Method::GET, "http://127.0.0.1/").unwrap();
            {
                let mut hc = client.borrow_mut();
                hc.set_ops(Rc::new(ops));
                hc.req_gen(&[]).unwrap();
                hc.res = HttpClientResponse::new(BytesMut::with_capacity(body_size));
            }

            let mut harness =
                Self { _pool: pool, client, applet: HttpClientApplet::new(8), si: StreamInterface::new(4096) };
            assert_eq!(harness.step(), Step::Pending(Wait::Input));
            harness
        }

        fn step(&mut self) -> Step {
            let mut hc = self.client.borrow_mut();
            self.applet.io_handler(&mut hc, &mut self.si)
        }

        fn feed(&mut self, blocks: impl IntoIterator<Item = Block>) {
            for block in blocks {
                self.si.res.htx_mut().push(block).unwrap();
            }
        }

        fn eom(&mut self) {
            self.si.res.htx_mut().set_eom();
        }

        fn drain(&mut self) -> Vec<u8> {
            let mut out = Vec::new();
            while self.client.borrow_mut().res_xfer(&mut out) > 0 {}
            out
        }
    }

    fn status_line(status: u16, reason: &'static str) -> Block {
        Block::ResStartLine(StatusLine {
            flags: StartLineFlags::IS_RESP | StartLineFlags::VER_11,
            version: Bytes::from_static(b"HTTP/1.1"),
            status,
            reason: Bytes::from_static(reason.as_bytes()),
        })
    }

    fn data(bytes: &'static [u8]) -> Block {
        Block::Data(Bytes::from_static(bytes))
    }

    fn ops_in_sequence(payloads: usize) -> MockHttpClientOps {
        let mut ops = MockHttpClientOps::new();
        let mut seq = Sequence::new();

        ops.expect_res_stline().times(1).in_sequence(&mut seq).returning(|hc| {
            assert_eq!(hc.response().status(), 200);
            assert_eq!(hc.response().reason(), b"OK");
        });
        ops.expect_res_headers().times(1).in_sequence(&mut seq).returning(|hc| {
            assert_eq!(hc.response().headers().map(<[_]>::len), Some(2));
        });
        ops.expect_res_payload().times(payloads).in_sequence(&mut seq).returning(|_| ());
        ops.expect_res_end().times(1).in_sequence(&mut seq).returning(|_| ());
        ops
    }

    fn full_response() -> Vec<Block> {
        vec![
            status_line(200, "OK"),
            Block::header(&b"Content-Type"[..], &b"text/plain"[..]),
            Block::header(&b"X-Trace"[..], &b"abc"[..]),
            Block::EndOfHeaders,
            data(b"hello "),
            data(b"world"),
        ]
    }

    #[test]
    fn send_request_hands_over_the_whole_request() {
        let h = Harness::new(1024, MockHttpClientOps::new());

        assert_eq!(h.applet.state(), AppletState::StatusLine);
        assert!(h.client.borrow().req.htx.is_empty());
        assert!(h.si.req.htx().is_eom());
        assert_eq!(h.si.req.ready(), h.si.req.htx().size());
    }

    #[test]
    fn callbacks_fire_in_order() {
        let mut h = Harness::new(1024, ops_in_sequence(2));

        h.feed(full_response());
        h.eom();

        assert_eq!(h.step(), Step::Done);
        assert!(h.si.is_closed());
        assert_eq!(h.drain(), b"hello world");

        let hc = h.client.borrow();
        let headers = hc.response().headers().unwrap();
        assert_eq!(headers[0].name(), "Content-Type");
        assert_eq!(hc.response().vsn(), "HTTP/1.1");
    }

    #[test]
    fn any_fragmentation_gives_the_same_sequence() {
        let mut h = Harness::new(1024, ops_in_sequence(2));

        for block in full_response() {
            h.feed([block]);
            assert_eq!(h.step(), Step::Pending(Wait::Input));
            // nothing new: resuming must not replay anything
            assert_eq!(h.step(), Step::Pending(Wait::Input));
        }

        h.eom();
        assert_eq!(h.step(), Step::Done);
        // end fires once even if the applet is called again
        assert_eq!(h.step(), Step::Done);
        assert_eq!(h.drain(), b"hello world");
    }

    #[test]
    fn headers_survive_a_suspension() {
        let mut ops = MockHttpClientOps::new();
        ops.expect_res_stline().times(1).returning(|_| ());
        ops.expect_res_headers().times(1).returning(|hc| {
            let names: Vec<_> = hc.response().headers().unwrap().iter().map(|h| h.name().to_owned()).collect();
            assert_eq!(names, ["A", "B", "C"]);
        });
        ops.expect_res_end().times(1).returning(|_| ());

        let mut h = Harness::new(1024, ops);
        h.feed([status_line(200, "OK"), Block::header(&b"A"[..], &b"1"[..])]);
        h.step();
        h.feed([Block::header(&b"B"[..], &b"2"[..])]);
        h.step();
        assert!(h.client.borrow().response().headers().is_none());

        h.feed([Block::header(&b"C"[..], &b"3"[..]), Block::EndOfHeaders]);
        h.eom();
        assert_eq!(h.step(), Step::Done);
    }

    #[test]
    fn back_pressure_splits_data_without_loss() {
        let mut ops = MockHttpClientOps::new();
        ops.expect_res_stline().times(1).returning(|_| ());
        ops.expect_res_headers().times(0);
        ops.expect_res_payload().times(2).returning(|_| ());
        ops.expect_res_end().times(1).returning(|_| ());

        let mut h = Harness::new(8, ops);
        h.feed([status_line(200, "OK"), Block::EndOfHeaders, data(b"0123456789abcdef")]);
        h.eom();

        assert_eq!(h.step(), Step::Pending(Wait::Room));
        assert_eq!(h.client.borrow().response().body(), b"01234567");

        let mut out = h.drain();
        assert_eq!(h.step(), Step::Pending(Wait::Room));
        out.extend(h.drain());

        assert_eq!(h.step(), Step::Done);
        assert_eq!(out, b"0123456789abcdef");
        assert_eq!(h.client.borrow().response().received(), 16);
    }

    #[test]
    fn shutdown_during_headers_ends_without_headers() {
        let mut ops = MockHttpClientOps::new();
        ops.expect_res_stline().times(1).returning(|_| ());
        ops.expect_res_headers().times(0);
        ops.expect_res_end().times(1).returning(|hc| assert!(hc.response().headers().is_none()));

        let mut h = Harness::new(1024, ops);
        h.feed([status_line(200, "OK"), Block::header(&b"Server"[..], &b"x"[..])]);
        assert_eq!(h.step(), Step::Pending(Wait::Input));
        assert_eq!(h.applet.state(), AppletState::Headers);

        h.si.res.set_shutr();
        assert_eq!(h.step(), Step::Done);
        assert_eq!(h.step(), Step::Done);
        assert!(h.si.is_closed());
    }

    #[test]
    fn shutdown_during_body_keeps_the_partial_body() {
        let mut ops = MockHttpClientOps::new();
        ops.expect_res_stline().times(1).returning(|_| ());
        ops.expect_res_payload().times(1).returning(|_| ());
        ops.expect_res_end().times(1).returning(|hc| assert_eq!(hc.response().body(), b"hello"));

        let mut h = Harness::new(1024, ops);
        h.feed([status_line(200, "OK"), Block::EndOfHeaders, data(b"hello")]);
        assert_eq!(h.step(), Step::Pending(Wait::Input));
        assert_eq!(h.applet.state(), AppletState::Body);

        h.si.res.set_shutr();
        assert_eq!(h.step(), Step::Done);
        assert_eq!(h.step(), Step::Done);
        assert!(h.si.is_closed());
        assert_eq!(h.drain(), b"hello");
        assert_eq!(h.client.borrow().response().received(), 5);
    }

    #[test]
    fn transport_write_failure_ends_the_exchange() {
        let mut ops = MockHttpClientOps::new();
        ops.expect_res_end().times(1).returning(|_| ());

        let mut h = Harness::new(1024, ops);
        h.si.req.set_shutw();
        assert_eq!(h.step(), Step::Done);
    }

    #[test]
    fn protocol_mismatch_ends_immediately() {
        let mut ops = MockHttpClientOps::new();
        ops.expect_res_stline().times(0);
        ops.expect_res_end().times(1).returning(|hc| assert_eq!(hc.response().status(), 0));

        let mut h = Harness::new(1024, ops);
        h.feed([data(b"garbage")]);
        assert_eq!(h.step(), Step::Done);
    }

    #[test]
    fn header_overflow_is_rejected() {
        let mut ops = MockHttpClientOps::new();
        ops.expect_res_stline().times(1).returning(|_| ());
        ops.expect_res_headers().times(0);
        ops.expect_res_end().times(1).returning(|_| ());

        let mut h = Harness::new(1024, ops);
        h.feed([status_line(200, "OK")]);
        for i in 0..9 {
            h.feed([Block::header(Bytes::from(format!("X-{i}")), &b"v"[..])]);
        }
        h.feed([Block::EndOfHeaders]);

        assert_eq!(h.step(), Step::Done);
        assert!(h.client.borrow().response().headers().is_none());
    }

    #[test]
    fn invalid_header_value_skips_headers_callback() {
        let mut ops = MockHttpClientOps::new();
        ops.expect_res_stline().times(1).returning(|_| ());
        ops.expect_res_headers().times(0);
        ops.expect_res_end().times(1).returning(|_| ());

        let mut h = Harness::new(1024, ops);
        h.feed([status_line(200, "OK"), Block::header(&b"X-Bad"[..], &b"a\r\nb"[..]), Block::EndOfHeaders]);
        assert_eq!(h.step(), Step::Done);
    }

    #[test]
    fn bodyless_response_skips_headers_and_body() {
        let mut ops = MockHttpClientOps::new();
        ops.expect_res_stline().times(1).returning(|_| ());
        ops.expect_res_headers().times(0);
        ops.expect_res_payload().times(0);
        ops.expect_res_end().times(1).returning(|_| ());

        let mut h = Harness::new(1024, ops);
        h.feed([status_line(204, "No Content")]);
        h.eom();
        assert_eq!(h.step(), Step::Done);
    }

    #[test]
    fn noop_ops_are_fine() {
        let pool = Rc::new(BufferPool::new(64));
        let client = HttpClient::new(&pool, None, Method::GET, "http://127.0.0.1/").unwrap();
        let mut si = StreamInterface::new(256);
        let mut applet = HttpClientApplet::new(8);

        assert_eq!(applet.io_handler(&mut client.borrow_mut(), &mut si), Step::Pending(Wait::Input));

        si.res.htx_mut().push(status_line(200, "OK")).unwrap();
        si.res.htx_mut().set_eom();
        assert_eq!(applet.io_handler(&mut client.borrow_mut(), &mut si), Step::Done);
    }
}
