//! Response body decoding.
//!
//! - [`PayloadDecoder`] picks the framing announced by the response head
//!   and delegates to one of:
//!   - `LengthDecoder` for `Content-Length` bodies
//!   - `ChunkedDecoder` for chunked transfer encoding
//!   - a pass-through for bodies ended by the connection close

mod chunked_decoder;
mod length_decoder;
mod payload_decoder;

pub use payload_decoder::PayloadDecoder;
