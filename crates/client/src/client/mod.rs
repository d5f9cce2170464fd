//! The client handle and the applet driving it.
//!
//! - [`HttpClient`]: one exchange, shared as a [`SharedHttpClient`] between
//!   its caller and its task. Built with [`HttpClient::new`], its request is
//!   generated with [`HttpClient::req_gen`], it is started through an
//!   [`HttpClientProxy`] and its body drained with [`HttpClient::res_xfer`].
//! - [`HttpClientOps`]: callbacks fired while the response comes in.
//! - [`HttpClientApplet`]: the response demultiplexer run by the task.

mod applet;
mod handle;
mod ops;
mod proxy;
mod request;
mod response;

pub use applet::{AppletState, HttpClientApplet, Step, Wait};
pub use handle::{HttpClient, SharedHttpClient, XFER_CHUNK};
pub use ops::{HttpClientOps, NoopOps};
pub use proxy::{HttpClientProxy, resolve_destination};
pub use response::HttpClientResponse;

#[cfg(test)]
pub use ops::MockHttpClientOps;
