use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::rc::Rc;

use http::Uri;
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::client::{HttpClient, SharedHttpClient};
use crate::config::HttpClientConfig;
use crate::pool::BufferPool;
use crate::protocol::AddressError;
use crate::stream::connector::{Connector, Destination, RustlsConnector, TcpConnector, Transport};
use crate::stream::task::{self, AppletRef};

/// Everything clients share: configuration, buffer pool and connectors.
///
/// Passed explicitly to [`HttpClient::start`], so independent proxies (one
/// per test, say) never see each other's clients.
pub struct HttpClientProxy {
    config: HttpClientConfig,
    pool: Rc<BufferPool>,
    raw: Rc<dyn Connector>,
    ssl: Rc<dyn Connector>,
}

impl HttpClientProxy {
    /// Creates a proxy with a pool sized after `config` and the default
    /// TCP and TLS connectors.
    pub fn new(config: HttpClientConfig) -> Self {
        let pool = Rc::new(BufferPool::new(config.bufsize));
        Self { config, pool, raw: Rc::new(TcpConnector), ssl: Rc::new(RustlsConnector::new()) }
    }

    /// Replaces the buffer pool. Its buffers should hold at least
    /// `bufsize` bytes, smaller ones shrink the response body buffer.
    pub fn with_pool(mut self, pool: Rc<BufferPool>) -> Self {
        if pool.buf_size() < self.config.bufsize {
            warn!(pool_buf_size = pool.buf_size(), bufsize = self.config.bufsize, "pool buffers smaller than bufsize");
        }
        self.pool = pool;
        self
    }

    /// Replaces the connector used for `http` urls.
    pub fn with_raw_connector(mut self, connector: Rc<dyn Connector>) -> Self {
        self.raw = connector;
        self
    }

    /// Replaces the connector used for `https` urls.
    pub fn with_ssl_connector(mut self, connector: Rc<dyn Connector>) -> Self {
        self.ssl = connector;
        self
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    pub fn pool(&self) -> &Rc<BufferPool> {
        &self.pool
    }

    pub fn connector(&self, transport: Transport) -> Rc<dyn Connector> {
        match transport {
            Transport::Plain => Rc::clone(&self.raw),
            Transport::Secure => Rc::clone(&self.ssl),
        }
    }
}

impl fmt::Debug for HttpClientProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClientProxy").field("config", &self.config).field("pool", &self.pool).finish_non_exhaustive()
    }
}

/// Turns an absolute url into the address to connect to.
///
/// Only literal IP hosts are accepted, nothing is resolved. The port defaults
/// to the scheme's one.
///
/// # Errors
///
/// Returns [`AddressError`] if the url can't be parsed, its scheme is not
/// `http` or `https`, or its host is missing or not an IP address.
pub fn resolve_destination(url: &str) -> Result<Destination, AddressError> {
    let uri: Uri = url.parse().map_err(|e| AddressError::invalid_uri(url, e))?;

    let transport = match uri.scheme_str() {
        Some("http") => Transport::Plain,
        Some("https") => Transport::Secure,
        Some(other) => return Err(AddressError::UnsupportedScheme(other.to_owned())),
        None => return Err(AddressError::invalid_uri(url, "missing scheme")),
    };

    let host = uri.host().filter(|host| !host.is_empty()).ok_or_else(|| AddressError::MissingHost(url.to_owned()))?;
    let ip: IpAddr = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .map_err(|_| AddressError::UnresolvedHost(host.to_owned()))?;
    let port = uri.port_u16().unwrap_or(transport.default_port());

    Ok(Destination { addr: SocketAddr::new(ip, port), transport })
}

impl HttpClient {
    /// Resolves the destination and spawns the task running the exchange on
    /// the current `LocalSet`.
    ///
    /// The request must have been generated with [`HttpClient::req_gen`]
    /// and the callbacks registered before.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError`] when the url has no literal destination; no
    /// task is created then.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a `tokio::task::LocalSet`, like
    /// `tokio::task::spawn_local`.
    pub fn start(this: &SharedHttpClient, proxy: &HttpClientProxy) -> Result<AppletRef, AddressError> {
        let mut hc = this.borrow_mut();
        let dst = resolve_destination(hc.url())?;
        debug!(url = hc.url(), addr = %dst.addr, transport = ?dst.transport, "start http client");

        let wake = Rc::new(Notify::new());
        let connector = proxy.connector(dst.transport);
        let task = task::run(Rc::downgrade(this), Rc::clone(&wake), connector, dst.clone(), proxy.config().clone());
        let handle = tokio::task::spawn_local(task);

        let applet = AppletRef::new(wake, handle.abort_handle());
        hc.dst = Some(dst);
        hc.applet = Some(applet.clone());
        Ok(applet)
    }
}
