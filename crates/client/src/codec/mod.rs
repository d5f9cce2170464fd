//! Wire codec of the client.
//!
//! - Outbound: [`RequestEncoder`] serializes the blocks of a structured
//!   bodyless request through [`header`].
//! - Inbound: [`ResponseDecoder`] parses the response head through
//!   [`header`] and its body through [`body`], yielding
//!   [`Message`](crate::protocol::Message)s.
//!
//! Both sides implement the `tokio_util::codec` traits, so the driver feeds
//! them plain `BytesMut` buffers read from or written to the transport.

mod body;
mod header;
mod request_encoder;
mod response_decoder;

pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
