//! Head processing on both directions of an exchange.
//!
//! - [`HeaderDecoder`]: parses a response status line and header fields,
//!   enforcing the configured count and size limits
//! - [`HeaderEncoder`]: writes request start line and header blocks

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
