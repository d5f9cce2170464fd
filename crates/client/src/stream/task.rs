//! The task running one client over one connection.
//!
//! The task owns the connection and the [`StreamInterface`] and repeatedly:
//!
//! 1. runs the applet step with the client borrowed
//! 2. writes the request blocks the applet handed over
//! 3. decodes response bytes into blocks while the inbound channel has room
//! 4. waits for socket data, a wake-up from the caller or the timeout
//!
//! The client is only borrowed while the applet runs, never across an await,
//! so its caller can drain the body between two steps. The task keeps a weak
//! reference only: once the caller dropped the client it stops silently.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::{Rc, Weak};
use std::time::Duration;

use bytes::{Buf, BytesMut};
use http::Method;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Notify;
use tokio::task::AbortHandle;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, info, trace, warn};

use crate::client::{HttpClient, HttpClientApplet, Step};
use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::config::HttpClientConfig;
use crate::ensure;
use crate::htx::{Block, StartLineFlags};
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, ResponseHead};
use crate::stream::connector::{BoxedIo, Connector, Destination};
use crate::stream::{Channel, StreamInterface};

/// Reference to a running client task.
#[derive(Debug, Clone)]
pub struct AppletRef {
    wake: Rc<Notify>,
    abort: AbortHandle,
}

impl AppletRef {
    pub(crate) fn new(wake: Rc<Notify>, abort: AbortHandle) -> Self {
        Self { wake, abort }
    }

    /// Asks the task to run the applet again.
    ///
    /// A wake-up sent while the task is busy is kept for its next wait.
    pub fn wakeup(&self) {
        self.wake.notify_one();
    }

    /// Stops the task at its next suspension point, without any callback.
    pub(crate) fn abort(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}

type DecodedMessage = Message<(ResponseHead, PayloadSize)>;

enum Event {
    Woken,
    Read(io::Result<usize>),
    TimedOut,
}

pub(crate) async fn run(
    client: Weak<RefCell<HttpClient>>,
    wake: Rc<Notify>,
    connector: Rc<dyn Connector>,
    dst: Destination,
    config: HttpClientConfig,
) {
    let Some((method, url)) = client.upgrade().map(|c| {
        let hc = c.borrow();
        (hc.method().clone(), hc.url().to_owned())
    }) else {
        return;
    };

    let mut si = StreamInterface::new(config.bufsize);
    let mut applet = HttpClientApplet::new(config.max_headers);
    let mut encoder = RequestEncoder::new();
    let mut decoder = ResponseDecoder::new(&config, method == Method::HEAD);

    let mut io = match bounded(config.timeout(), connector.connect(&dst)).await {
        Ok(io) => Some(io),
        Err(e) => {
            warn!(cause = %e, addr = %dst.addr, "can't connect to server");
            si.req.set_shutw();
            si.res.set_shutr();
            None
        }
    };

    let mut read_buf = BytesMut::with_capacity(config.bufsize);
    let mut write_buf = BytesMut::new();
    let mut backlog = Backlog::default();
    let mut peer_closed = false;

    loop {
        let step = {
            let Some(client) = client.upgrade() else {
                debug!(%url, "http client released, stop its task");
                return;
            };
            let mut hc = client.borrow_mut();
            applet.io_handler(&mut hc, &mut si)
        };

        if step == Step::Done || si.is_closed() {
            break;
        }

        let mut progress = false;

        if si.req.take_ready() > 0 {
            if let Some(io) = io.as_mut() {
                let sent = bounded(config.timeout(), flush(&mut encoder, &mut si.req, &mut write_buf, io)).await;
                if let Err(e) = sent {
                    warn!(cause = %e, "can't send request");
                    si.req.set_shutw();
                    progress = true;
                }
            }
        }

        if !si.res.is_shutr() {
            match fill(&mut decoder, &mut read_buf, &mut backlog, &mut si.res, peer_closed) {
                Ok(filled) => progress |= filled,
                Err(e) => {
                    error!(cause = %e, "invalid response");
                    si.res.set_shutr();
                    progress = true;
                }
            }

            if peer_closed && backlog.is_empty() && !si.res.is_shutr() {
                trace!("server closed the connection");
                si.res.set_shutr();
                progress = true;
            }
        }

        if progress {
            continue;
        }

        let reading = io.is_some() && !peer_closed && !si.res.is_shutr() && backlog.is_empty() && !decoder.is_done();
        if reading && read_buf.capacity() - read_buf.len() < config.bufsize / 4 {
            read_buf.reserve(config.bufsize);
        }

        let event = tokio::select! {
            _ = wake.notified() => Event::Woken,
            res = read_some(io.as_mut(), &mut read_buf), if reading => Event::Read(res),
            _ = sleep_or_never(config.timeout()), if reading => Event::TimedOut,
        };

        match event {
            Event::Woken => trace!("http client task woken up"),
            Event::Read(Ok(0)) => peer_closed = true,
            Event::Read(Ok(n)) => trace!(bytes = n, "read response bytes"),
            Event::Read(Err(e)) => {
                warn!(cause = %e, "can't read response");
                si.res.set_shutr();
            }
            Event::TimedOut => {
                warn!(timeout_ms = ?config.timeout_ms, "timeout waiting for response");
                si.res.set_shutr();
            }
        }
    }

    let (status, received) = match client.upgrade() {
        Some(client) => {
            let mut hc = client.borrow_mut();
            hc.applet = None;
            (hc.response().status(), hc.response().received())
        }
        None => (0, 0),
    };

    info!(%method, %url, status, body_bytes = received, "http client exchange done");

    if let Some(mut io) = io {
        if let Err(e) = io.shutdown().await {
            trace!(cause = %e, "shutdown after exchange");
        }
    }
}

/// Encodes the request blocks queued in `req` and writes them out.
async fn flush(encoder: &mut RequestEncoder, req: &mut Channel, buf: &mut BytesMut, io: &mut BoxedIo) -> io::Result<()> {
    while let Some(block) = req.htx_mut().remove_first() {
        encoder.encode(&block, buf)?;
    }

    io.write_all_buf(buf).await?;
    io.flush().await
}

/// Response blocks decoded but not yet moved into the inbound channel.
#[derive(Debug, Default)]
struct Backlog {
    blocks: VecDeque<Block>,
    eom: bool,
}

impl Backlog {
    fn is_empty(&self) -> bool {
        self.blocks.is_empty() && !self.eom
    }

    fn push(&mut self, message: DecodedMessage) {
        match message {
            Message::Header((head, payload_size)) => {
                let mut flags = StartLineFlags::NONE;
                if payload_size.has_xfer_len() {
                    flags = flags | StartLineFlags::XFER_LEN;
                }
                if payload_size.is_empty() {
                    flags = flags | StartLineFlags::BODYLESS;
                }
                self.blocks.extend(head.into_blocks(flags));
            }
            Message::Payload(PayloadItem::Chunk(data)) => self.blocks.push_back(Block::Data(data)),
            Message::Payload(PayloadItem::Eof) => self.eom = true,
        }
    }

    /// Moves as many blocks as fit into `res`, splitting data blocks to fill
    /// it up. Returns whether anything was moved.
    fn flush_into(&mut self, res: &mut Channel) -> Result<bool, ParseError> {
        let htx = res.htx_mut();
        let before = htx.size();
        let mut eom = false;

        while let Some(block) = self.blocks.pop_front() {
            match block {
                Block::Data(mut data) => {
                    let written = htx.add_data(data.clone());
                    data.advance(written);
                    if !data.is_empty() {
                        self.blocks.push_front(Block::Data(data));
                        break;
                    }
                }
                block => {
                    let needed = block.size();
                    if needed > htx.room() {
                        ensure!(!htx.is_empty(), ParseError::too_large_header(needed, htx.capacity()));
                        self.blocks.push_front(block);
                        break;
                    }
                    htx.push(block).map_err(ParseError::invalid_header)?;
                }
            }
        }

        if self.blocks.is_empty() && self.eom {
            self.eom = false;
            htx.set_eom();
            eom = true;
        }

        let moved = htx.size() - before;
        res.add_input(moved);
        Ok(moved > 0 || eom)
    }
}

/// Decodes response bytes into the inbound channel until it is full or the
/// decoder needs more bytes. Returns whether the channel received anything.
fn fill(
    decoder: &mut ResponseDecoder,
    src: &mut BytesMut,
    backlog: &mut Backlog,
    res: &mut Channel,
    eof: bool,
) -> Result<bool, ParseError> {
    let mut added = backlog.flush_into(res)?;

    while backlog.is_empty() {
        let decoded = if eof { decoder.decode_eof(src)? } else { decoder.decode(src)? };
        let Some(message) = decoded else {
            break;
        };
        backlog.push(message);
        added |= backlog.flush_into(res)?;
    }

    Ok(added)
}

/// Runs `fut` within `timeout`, expiry being reported as a
/// [`io::ErrorKind::TimedOut`] error.
async fn bounded<T>(timeout: Option<Duration>, fut: impl Future<Output = io::Result<T>>) -> io::Result<T> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, fut).await.unwrap_or_else(|_| Err(io::ErrorKind::TimedOut.into())),
        None => fut.await,
    }
}

async fn read_some(io: Option<&mut BoxedIo>, buf: &mut BytesMut) -> io::Result<usize> {
    match io {
        Some(io) => io.read_buf(buf).await,
        None => std::future::pending().await,
    }
}

async fn sleep_or_never(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}
