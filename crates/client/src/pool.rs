//! Fixed-size buffer pool.
//!
//! Every client allocates two buffers when it is constructed: one backing the
//! structured request and one holding the raw response body. Buffers come
//! from a [`BufferPool`] which may cap the number of outstanding buffers.
//! When the cap is reached the pool runs its reclamation hook once, giving
//! its owner a chance to release idle buffers, before reporting exhaustion.

use std::cell::{Cell, RefCell};
use std::fmt;

use bytes::BytesMut;
use tracing::{debug, warn};

/// Hook run when the pool is exhausted, returns how many buffers it released.
pub type ReclaimHook = Box<dyn Fn(&BufferPool) -> usize>;

pub struct BufferPool {
    buf_size: usize,
    limit: Option<usize>,
    used: Cell<usize>,
    free: RefCell<Vec<BytesMut>>,
    reclaim: RefCell<Option<ReclaimHook>>,
}

impl BufferPool {
    /// Creates an unbounded pool handing out buffers of `buf_size` bytes.
    pub fn new(buf_size: usize) -> Self {
        Self { buf_size, limit: None, used: Cell::new(0), free: RefCell::new(Vec::new()), reclaim: RefCell::new(None) }
    }

    /// Creates a pool allowing at most `limit` outstanding buffers.
    pub fn with_limit(buf_size: usize, limit: usize) -> Self {
        Self { limit: Some(limit), ..Self::new(buf_size) }
    }

    /// Installs the hook run on exhaustion.
    pub fn set_reclaim_hook(&self, hook: impl Fn(&BufferPool) -> usize + 'static) {
        *self.reclaim.borrow_mut() = Some(Box::new(hook));
    }

    pub fn buf_size(&self) -> usize {
        self.buf_size
    }

    /// Number of buffers currently handed out.
    pub fn in_use(&self) -> usize {
        self.used.get()
    }

    fn exhausted(&self) -> bool {
        self.limit.is_some_and(|limit| self.used.get() >= limit)
    }

    /// Allocates an empty buffer with a capacity of `buf_size` bytes.
    ///
    /// Returns `None` when the pool stays exhausted after reclamation.
    pub fn alloc(&self) -> Option<BytesMut> {
        if self.exhausted() {
            let freed = match self.reclaim.borrow().as_ref() {
                Some(hook) => hook(self),
                None => 0,
            };
            debug!(freed, in_use = self.used.get(), "buffer pool exhausted, ran reclaim hook");

            if self.exhausted() {
                warn!(in_use = self.used.get(), "buffer pool exhausted");
                return None;
            }
        }

        self.used.set(self.used.get() + 1);
        let buf = self.free.borrow_mut().pop().unwrap_or_else(|| BytesMut::with_capacity(self.buf_size));
        Some(buf)
    }

    /// Gives a buffer back to the pool.
    pub fn release(&self, mut buf: BytesMut) {
        self.used.set(self.used.get().saturating_sub(1));
        buf.clear();
        if buf.capacity() >= self.buf_size {
            self.free.borrow_mut().push(buf);
        }
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("buf_size", &self.buf_size)
            .field("limit", &self.limit)
            .field("used", &self.used.get())
            .field("free", &self.free.borrow().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn alloc_and_release_are_accounted() {
        let pool = BufferPool::with_limit(64, 2);

        let a = pool.alloc().unwrap();
        let b = pool.alloc().unwrap();
        assert_eq!(pool.in_use(), 2);
        assert!(a.capacity() >= 64);
        assert!(pool.alloc().is_none());

        pool.release(a);
        assert_eq!(pool.in_use(), 1);
        assert!(pool.alloc().is_some());

        pool.release(b);
    }

    #[test]
    fn reclaim_hook_runs_on_exhaustion() {
        let pool = BufferPool::with_limit(16, 1);
        let held = Rc::new(RefCell::new(pool.alloc()));
        let calls = Rc::new(Cell::new(0));

        let hook_held = Rc::clone(&held);
        let hook_calls = Rc::clone(&calls);
        pool.set_reclaim_hook(move |pool| {
            hook_calls.set(hook_calls.get() + 1);
            match hook_held.borrow_mut().take() {
                Some(buf) => {
                    pool.release(buf);
                    1
                }
                None => 0,
            }
        });

        assert!(pool.alloc().is_some());
        assert_eq!(calls.get(), 1);

        // nothing left to reclaim
        assert!(pool.alloc().is_none());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn released_buffers_are_reused_empty() {
        let pool = BufferPool::new(32);
        let mut buf = pool.alloc().unwrap();
        buf.extend_from_slice(b"dirty");
        pool.release(buf);

        let buf = pool.alloc().unwrap();
        assert!(buf.is_empty());
    }
}
