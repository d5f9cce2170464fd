//! Transport side of an exchange.
//!
//! A [`StreamInterface`] is what the client applet sees of its connection:
//! an outbound `req` channel it writes request blocks into, and an inbound
//! `res` channel the driver fills with response blocks decoded off the
//! socket. Each channel carries the half-close flags raised by the transport
//! (peer closed, write failed, timeout) and by the applet once it is done.
//!
//! The [`task`] module drives one applet over one connection, and
//! [`connector`] opens the plain or TLS connection it runs on.

pub mod connector;
pub(crate) mod task;

use crate::htx::Htx;

/// One direction of a stream: a structured buffer plus its shutdown flags.
#[derive(Debug)]
pub struct Channel {
    htx: Htx,
    ready: usize,
    shutr: bool,
    shutw: bool,
}

impl Channel {
    pub fn new(htx: Htx) -> Self {
        Self { htx, ready: 0, shutr: false, shutw: false }
    }

    pub fn htx(&self) -> &Htx {
        &self.htx
    }

    pub fn htx_mut(&mut self) -> &mut Htx {
        &mut self.htx
    }

    /// Marks `bytes` more bytes as ready for the consumer of this channel.
    pub fn add_input(&mut self, bytes: usize) {
        self.ready += bytes;
    }

    /// Bytes marked ready and not yet picked up.
    pub fn ready(&self) -> usize {
        self.ready
    }

    /// Picks up the ready count, resetting it.
    pub fn take_ready(&mut self) -> usize {
        std::mem::take(&mut self.ready)
    }

    /// Read side closed: nothing more will be produced into this channel.
    pub fn is_shutr(&self) -> bool {
        self.shutr
    }

    pub fn set_shutr(&mut self) {
        self.shutr = true;
    }

    /// Write side closed: what is put into this channel won't be sent.
    pub fn is_shutw(&self) -> bool {
        self.shutw
    }

    pub fn set_shutw(&mut self) {
        self.shutw = true;
    }
}

/// The applet's view of its connection.
#[derive(Debug)]
pub struct StreamInterface {
    /// Outbound request blocks, consumed by the driver
    pub req: Channel,
    /// Inbound response blocks, produced by the driver
    pub res: Channel,
    read_closed: bool,
    write_closed: bool,
}

impl StreamInterface {
    /// Creates a stream whose channels can each hold `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            req: Channel::new(Htx::with_capacity(capacity)),
            res: Channel::new(Htx::with_capacity(capacity)),
            read_closed: false,
            write_closed: false,
        }
    }

    /// The applet won't write anymore.
    pub fn shutw(&mut self) {
        self.write_closed = true;
        self.req.set_shutw();
    }

    /// The applet won't read anymore.
    pub fn shutr(&mut self) {
        self.read_closed = true;
        self.res.set_shutr();
    }

    /// Both directions were closed by the applet.
    pub fn is_closed(&self) -> bool {
        self.read_closed && self.write_closed
    }

    /// The transport reported a half-close in either direction.
    pub fn shutdown_seen(&self) -> bool {
        self.res.is_shutr() || self.req.is_shutw()
    }
}
