//! Protocol types shared by the codec and the client engine.
//!
//! - **Messages** ([`message`]): items produced by the response decoder
//!   - [`Message`]: either the response head or a payload item
//!   - [`PayloadItem`]: a chunk of body bytes or the end of the body
//!   - [`PayloadSize`]: how the body length is determined
//!
//! - **Heads and headers**:
//!   - [`ResponseHead`]: status line and headers in wire order
//!   - [`HttpHeader`]: a validated, case-preserving header pair
//!   - [`KNOWN_METHODS`]: methods a request can be generated for
//!
//! - **Errors** ([`error`]):
//!   - [`HttpClientError`]: top-level error type
//!   - [`ConstructionError`], [`GenerationError`], [`AddressError`]: errors
//!     returned synchronously by the client handle operations
//!   - [`ParseError`]: response decoding errors

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod response;
pub use response::ResponseHead;

mod header;
pub use header::HttpHeader;

mod method;
pub use method::KNOWN_METHODS;
pub use method::is_known_method;

mod error;
pub use error::AddressError;
pub use error::ConstructionError;
pub use error::GenerationError;
pub use error::HeaderError;
pub use error::HttpClientError;
pub use error::ParseError;
