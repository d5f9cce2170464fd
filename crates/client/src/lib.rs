//! A cooperative HTTP/1.1 client engine
//!
//! This crate lets components living on a single-threaded event loop (an
//! admin console, health probes, configuration fetchers) issue an HTTP
//! request and consume the response incrementally, without a thread of their
//! own. Each exchange is an applet: a resumable state machine driven by a
//! task on the current tokio `LocalSet`, which turns the response into
//! structured blocks and hands status line, headers and body to the caller
//! through callbacks.
//!
//! # Features
//!
//! - Request generation from a method, an absolute url and ordered headers
//! - Incremental response demultiplexing with partial-data resumption
//! - Bounded body buffer with back-pressure towards the transport
//! - Plain TCP and TLS (rustls) transports
//! - Buffer pool with exhaustion handling
//!
//! # Example
//!
//! ```no_run
//! use std::rc::Rc;
//!
//! use http::Method;
//! use micro_httpclient::client::{HttpClient, HttpClientOps, HttpClientProxy};
//! use micro_httpclient::config::HttpClientConfig;
//! use micro_httpclient::protocol::HttpHeader;
//! use tokio::sync::Notify;
//! use tracing::info;
//!
//! struct Done(Rc<Notify>);
//!
//! impl HttpClientOps for Done {
//!     fn res_stline(&self, hc: &HttpClient) {
//!         info!(status = hc.response().status(), "got status line");
//!     }
//!
//!     fn res_end(&self, _hc: &HttpClient) {
//!         self.0.notify_one();
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let proxy = HttpClientProxy::new(HttpClientConfig::default());
//!     let done = Rc::new(Notify::new());
//!
//!     tokio::task::LocalSet::new()
//!         .run_until(async {
//!             let client = HttpClient::new(proxy.pool(), None, Method::GET, "http://127.0.0.1:8080/").unwrap();
//!             client.borrow_mut().set_ops(Rc::new(Done(done.clone())));
//!             client.borrow_mut().req_gen(&[HttpHeader::from_static("User-Agent", "demo")]).unwrap();
//!
//!             HttpClient::start(&client, &proxy).unwrap();
//!             done.notified().await;
//!
//!             let mut body = Vec::new();
//!             while client.borrow_mut().res_xfer(&mut body) > 0 {}
//!             info!(len = body.len(), "got body");
//!
//!             HttpClient::destroy(client);
//!         })
//!         .await;
//! }
//! ```
//!
//! # Architecture
//!
//! - [`client`]: the client handle, its callbacks and the response demultiplexer
//! - [`stream`]: channels between the applet and its transport, connectors and the driving task
//! - [`htx`]: the structured message buffer both channels carry
//! - [`codec`]: HTTP/1 wire encoding of requests and decoding of responses
//! - [`protocol`]: shared protocol types and errors
//! - [`pool`]: the fixed-size buffer pool clients allocate from
//! - [`config`]: engine tunables
//!
//! # Limitations
//!
//! - HTTP/1.x only
//! - Destinations must be literal IP addresses, nothing is resolved
//! - One request per connection, no redirects
//! - Bodies are received, requests never carry one

pub mod client;
pub mod codec;
pub mod config;
pub mod htx;
pub mod pool;
pub mod protocol;
pub mod stream;

mod buffer;
mod utils;
pub(crate) use utils::ensure;
