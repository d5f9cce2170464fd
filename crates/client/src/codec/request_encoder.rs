//! Writes request blocks onto the wire.

use std::io;
use std::io::ErrorKind;

use bytes::BytesMut;
use tokio_util::codec::Encoder;
use tracing::error;

use crate::codec::header::HeaderEncoder;
use crate::htx::Block;

/// Encodes the blocks of one bodyless request, in order.
///
/// Head blocks go through [`HeaderEncoder`]. Nothing is accepted once the
/// head was terminated.
#[derive(Debug, Default)]
pub struct RequestEncoder {
    header_encoder: HeaderEncoder,
    head_done: bool,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Encoder<&Block> for RequestEncoder {
    type Error = io::Error;

    fn encode(&mut self, block: &Block, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.head_done {
            error!(block_type = ?block.block_type(), "request block after end of headers");
            return Err(io::Error::from(ErrorKind::InvalidInput));
        }

        self.header_encoder.encode(block, dst)?;
        self.head_done = matches!(block, Block::EndOfHeaders);
        Ok(())
    }
}
