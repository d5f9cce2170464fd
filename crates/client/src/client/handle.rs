use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use bytes::BufMut;
use http::Method;
use tracing::trace;

use crate::client::{HttpClientOps, HttpClientResponse, NoopOps};
use crate::htx::Htx;
use crate::pool::BufferPool;
use crate::protocol::ConstructionError;
use crate::stream::connector::Destination;
use crate::stream::task::AppletRef;

/// Most bytes a single [`HttpClient::res_xfer`] call hands out
pub const XFER_CHUNK: usize = 1024;

/// A client shared between its caller and the task driving it.
pub type SharedHttpClient = Rc<RefCell<HttpClient>>;

/// Request side of a client.
#[derive(Debug)]
pub(crate) struct HttpClientRequest {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) htx: Htx,
}

/// One HTTP exchange: the request to send, the response received so far,
/// the callbacks to notify and the task running it once started.
pub struct HttpClient {
    caller: Option<Weak<dyn Any>>,
    pub(crate) req: HttpClientRequest,
    pub(crate) res: HttpClientResponse,
    ops: Rc<dyn HttpClientOps>,
    pub(crate) dst: Option<Destination>,
    pub(crate) applet: Option<AppletRef>,
    pool: Rc<BufferPool>,
}

impl HttpClient {
    /// Allocates a client and both of its buffers from `pool`.
    ///
    /// `caller` is a non-owning reference to whoever drives the client, for
    /// callbacks to route their notifications with [`HttpClient::caller`].
    ///
    /// # Errors
    ///
    /// Returns [`ConstructionError::BufferExhausted`] if either buffer can't be
    /// allocated; a buffer already taken is given back.
    pub fn new(
        pool: &Rc<BufferPool>,
        caller: Option<Weak<dyn Any>>,
        method: Method,
        url: impl Into<String>,
    ) -> Result<SharedHttpClient, ConstructionError> {
        let req_buf = pool.alloc().ok_or_else(|| ConstructionError::buffer_exhausted("request"))?;
        let Some(res_buf) = pool.alloc() else {
            pool.release(req_buf);
            return Err(ConstructionError::buffer_exhausted("response"));
        };

        let client = Self {
            caller,
            req: HttpClientRequest { method, url: url.into(), htx: Htx::from_buf(req_buf) },
            res: HttpClientResponse::new(res_buf),
            ops: Rc::new(NoopOps),
            dst: None,
            applet: None,
            pool: Rc::clone(pool),
        };
        trace!(method = %client.req.method, url = %client.req.url, "http client allocated");

        Ok(Rc::new(RefCell::new(client)))
    }

    /// Registers the callbacks; must happen before the client is started.
    pub fn set_ops(&mut self, ops: Rc<dyn HttpClientOps>) {
        self.ops = ops;
    }

    pub(crate) fn ops(&self) -> Rc<dyn HttpClientOps> {
        Rc::clone(&self.ops)
    }

    /// The caller registered at construction, if it is still alive and of
    /// type `T`.
    pub fn caller<T: Any>(&self) -> Option<Rc<T>> {
        self.caller.as_ref()?.upgrade()?.downcast::<T>().ok()
    }

    pub fn method(&self) -> &Method {
        &self.req.method
    }

    pub fn url(&self) -> &str {
        &self.req.url
    }

    pub fn response(&self) -> &HttpClientResponse {
        &self.res
    }

    /// Destination resolved by [`HttpClient::start`].
    pub fn dst(&self) -> Option<&Destination> {
        self.dst.as_ref()
    }

    /// Whether a task is still attached to the client. Once this is false
    /// no callback will fire anymore.
    pub fn is_running(&self) -> bool {
        self.applet.is_some()
    }

    /// Moves up to [`XFER_CHUNK`] buffered body bytes into `dst`.
    ///
    /// When the body buffer is left empty the task is woken up so it can
    /// produce more, even if nothing was copied.
    pub fn res_xfer<B: BufMut + ?Sized>(&mut self, dst: &mut B) -> usize {
        let copied = self.res.body_buf_mut().xfer(dst, XFER_CHUNK);

        if self.res.body_buf().is_empty() {
            if let Some(applet) = &self.applet {
                applet.wakeup();
            }
        }

        copied
    }

    /// Releases a client, stopping its task first if it is still running.
    ///
    /// No callback fires once this returned.
    pub fn destroy(this: SharedHttpClient) {
        if let Some(applet) = this.borrow_mut().applet.take() {
            trace!("abort running http client task");
            applet.abort();
        }
        drop(this);
    }
}

impl Drop for HttpClient {
    fn drop(&mut self) {
        let req = std::mem::replace(&mut self.req.htx, Htx::with_capacity(0));
        if let Some(buf) = req.into_buf() {
            self.pool.release(buf);
        }
        self.pool.release(self.res.take_body_buf());
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("req", &self.req)
            .field("res", &self.res)
            .field("dst", &self.dst)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
