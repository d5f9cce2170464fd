//! Raw byte buffer with a hard capacity.
//!
//! `BytesMut` grows on demand, the response body buffer must not: the
//! demultiplexer checks [`BoundedBuf::room`] and pauses when it is zero.

use bytes::{Buf, BufMut, BytesMut};

#[derive(Debug)]
pub struct BoundedBuf {
    buf: BytesMut,
    capacity: usize,
}

impl BoundedBuf {
    /// Wraps a pooled buffer, its current capacity becomes the hard limit.
    pub fn new(mut buf: BytesMut) -> Self {
        buf.clear();
        let capacity = buf.capacity();
        Self { buf, capacity }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity), capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Buffered bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn room(&self) -> usize {
        self.capacity - self.buf.len()
    }

    pub fn is_full(&self) -> bool {
        self.room() == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Appends as much of `src` as fits, returns the number of bytes written.
    pub fn put_slice(&mut self, src: &[u8]) -> usize {
        let len = src.len().min(self.room());
        self.buf.extend_from_slice(&src[..len]);
        len
    }

    /// Moves up to `max` bytes into `dst`, bounded by what `dst` can take.
    pub fn xfer<B: BufMut + ?Sized>(&mut self, dst: &mut B, max: usize) -> usize {
        let len = max.min(self.buf.len()).min(dst.remaining_mut());
        dst.put_slice(&self.buf[..len]);
        self.buf.advance(len);
        len
    }

    pub fn into_inner(self) -> BytesMut {
        self.buf
    }
}
