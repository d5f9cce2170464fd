//! Opening the connection a client runs on.
//!
//! The engine only ever talks to a [`Connector`], so tests and embedders can
//! plug in their own transport. Two are provided: [`TcpConnector`] for
//! `http` and [`RustlsConnector`] for `https`.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tracing::trace;

/// Which family of transport a destination needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Plain,
    Secure,
}

impl Transport {
    pub fn default_port(self) -> u16 {
        match self {
            Transport::Plain => 80,
            Transport::Secure => 443,
        }
    }
}

/// Where a client connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub addr: SocketAddr,
    pub transport: Transport,
}

pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin {}

impl<T: AsyncRead + AsyncWrite + Unpin> AsyncStream for T {}

/// A connected, type-erased byte stream.
pub type BoxedIo = Box<dyn AsyncStream>;

#[async_trait(?Send)]
pub trait Connector {
    async fn connect(&self, dst: &Destination) -> io::Result<BoxedIo>;
}

/// Plain TCP connections.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait(?Send)]
impl Connector for TcpConnector {
    async fn connect(&self, dst: &Destination) -> io::Result<BoxedIo> {
        let stream = TcpStream::connect(dst.addr).await?;
        stream.set_nodelay(true)?;
        trace!(addr = %dst.addr, "tcp connected");
        Ok(Box::new(stream))
    }
}

/// TLS over TCP, verifying servers against the webpki root store.
#[derive(Clone)]
pub struct RustlsConnector {
    connector: TlsConnector,
}

impl RustlsConnector {
    pub fn new() -> Self {
        let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let mut config = ClientConfig::builder().with_root_certificates(roots).with_no_client_auth();
        config.alpn_protocols = vec![b"http/1.1".to_vec()];
        Self::with_config(Arc::new(config))
    }

    pub fn with_config(config: Arc<ClientConfig>) -> Self {
        Self { connector: TlsConnector::from(config) }
    }
}

impl Default for RustlsConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RustlsConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RustlsConnector")
    }
}

#[async_trait(?Send)]
impl Connector for RustlsConnector {
    async fn connect(&self, dst: &Destination) -> io::Result<BoxedIo> {
        let tcp = TcpConnector.connect(dst).await?;
        let server_name = ServerName::from(dst.addr.ip());
        let stream = self.connector.connect(server_name, tcp).await?;
        trace!(addr = %dst.addr, "tls handshake done");
        Ok(Box::new(stream))
    }
}
