//! Structured HTTP message buffer.
//!
//! An [`Htx`] holds an HTTP message as an ordered queue of typed [`Block`]s
//! (start line, headers, end-of-headers, data) instead of raw bytes. Producers
//! append blocks at the back, consumers look at and remove blocks at the
//! front, so progress is expressed by block removal rather than byte offsets.
//!
//! The buffer has a fixed capacity: each block costs its payload plus
//! [`BLOCK_OVERHEAD`] bytes, and appends that would exceed the capacity fail
//! with [`HtxError::NoRoom`] (data blocks may be appended partially instead).
//! Once the end-of-message flag is set no more blocks are accepted.

mod block;

pub use block::{BLOCK_OVERHEAD, Block, BlockType, RequestLine, StartLineFlags, StatusLine};

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use thiserror::Error;

use crate::ensure;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HtxError {
    #[error("no room for block, needed {needed} bytes but only {room} left")]
    NoRoom { needed: usize, room: usize },

    #[error("message is already complete")]
    MessageComplete,
}

#[derive(Debug)]
pub struct Htx {
    blocks: VecDeque<Block>,
    size: usize,
    capacity: usize,
    eom: bool,
    storage: Option<BytesMut>,
}

impl Htx {
    /// Creates an empty structured buffer able to hold `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { blocks: VecDeque::new(), size: 0, capacity, eom: false, storage: None }
    }

    /// Creates an empty structured buffer sized after a pooled buffer, which
    /// is kept until [`Htx::into_buf`] hands it back.
    pub fn from_buf(buf: BytesMut) -> Self {
        let capacity = buf.capacity();
        Self { storage: Some(buf), ..Self::with_capacity(capacity) }
    }

    /// Returns the pooled buffer backing this structured buffer, if any.
    pub fn into_buf(self) -> Option<BytesMut> {
        self.storage
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes used by the queued blocks.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn room(&self) -> usize {
        self.capacity.saturating_sub(self.size)
    }

    pub fn is_full(&self) -> bool {
        self.room() <= BLOCK_OVERHEAD
    }

    /// Number of queued blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Whether the end-of-message marker was set.
    pub fn is_eom(&self) -> bool {
        self.eom
    }

    pub fn set_eom(&mut self) {
        self.eom = true;
    }

    /// Appends a block at the back.
    ///
    /// # Errors
    ///
    /// Fails when the message is complete or the block does not fit.
    pub fn push(&mut self, block: Block) -> Result<(), HtxError> {
        ensure!(!self.eom, HtxError::MessageComplete);

        let needed = block.size();
        ensure!(needed <= self.room(), HtxError::NoRoom { needed, room: self.room() });

        self.size += needed;
        self.blocks.push_back(block);
        Ok(())
    }

    /// Appends a header block.
    ///
    /// # Errors
    ///
    /// See [`Htx::push`].
    pub fn add_header(&mut self, name: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<(), HtxError> {
        self.push(Block::header(name, value))
    }

    /// Appends the end-of-headers marker.
    ///
    /// # Errors
    ///
    /// See [`Htx::push`].
    pub fn add_eoh(&mut self) -> Result<(), HtxError> {
        self.push(Block::EndOfHeaders)
    }

    /// Appends as much of `data` as fits and returns the number of bytes added.
    pub fn add_data(&mut self, mut data: Bytes) -> usize {
        if self.eom || data.is_empty() || self.room() <= BLOCK_OVERHEAD {
            return 0;
        }

        let len = data.len().min(self.room() - BLOCK_OVERHEAD);
        let data = data.split_to(len);
        self.size += len + BLOCK_OVERHEAD;
        self.blocks.push_back(Block::Data(data));
        len
    }

    pub fn first(&self) -> Option<&Block> {
        self.blocks.front()
    }

    /// Removes and returns the first block.
    pub fn remove_first(&mut self) -> Option<Block> {
        let block = self.blocks.pop_front()?;
        self.size -= block.size();
        Some(block)
    }

    /// Takes up to `max` bytes from the first block when it is a data block.
    ///
    /// The block is removed once all of its bytes were taken, otherwise its
    /// front is cut and the rest stays queued.
    pub fn take_data(&mut self, max: usize) -> Option<Bytes> {
        let Some(Block::Data(data)) = self.blocks.front_mut() else {
            return None;
        };

        if data.len() <= max {
            return match self.remove_first() {
                Some(Block::Data(data)) => Some(data),
                _ => None,
            };
        }

        let taken = data.split_to(max);
        self.size -= taken.len();
        Some(taken)
    }

    /// Iterates the queued blocks from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Iterates the queued blocks of a single type.
    pub fn iter_type(&self, block_type: BlockType) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(move |block| block.block_type() == block_type)
    }

    /// Moves every block and the end-of-message marker into `dst`, returning
    /// the number of bytes moved.
    ///
    /// `dst` is expected to be at least as large as `self`; room is not checked.
    pub fn transfer_to(&mut self, dst: &mut Htx) -> usize {
        let moved = self.size;
        dst.size += moved;
        dst.blocks.extend(self.blocks.drain(..));
        dst.eom |= self.eom;

        self.size = 0;
        self.eom = false;
        moved
    }
}
