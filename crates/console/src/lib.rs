//! Admin console front-end of the http client engine.
//!
//! The console understands a single keyword:
//!
//! ```text
//! httpclient <method> <URI>
//! ```
//!
//! It launches the request and dumps the response on its output as it comes:
//! the status line, the headers, then the body. Only admin sessions may use
//! it.
//!
//! The console is the client's caller: the four response callbacks only raise
//! a flag in [`ConsoleCtx`] and wake the console, which does the rendering
//! on its own schedule and pulls the body through
//! [`HttpClient::res_xfer`].

use std::any::Any;
use std::cell::Cell;
use std::io;
use std::rc::{Rc, Weak};
use std::str::FromStr;

use bytes::{Bytes, BytesMut};
use http::Method;
use micro_httpclient::client::{HttpClient, HttpClientOps, HttpClientProxy, SharedHttpClient};
use micro_httpclient::protocol::{HeaderError, HttpClientError, HttpHeader};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Notify;
use tracing::{debug, warn};

/// A status line is waiting to be rendered
pub const RES_STLINE: u8 = 0x01;
/// Headers are waiting to be rendered
pub const RES_HDR: u8 = 0x02;
/// The body buffer holds bytes to forward
pub const RES_BODY: u8 = 0x04;
/// The exchange is over
pub const RES_END: u8 = 0x08;

const KEYWORD: &str = "httpclient";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessLevel {
    User,
    Operator,
    Admin,
}

impl FromStr for AccessLevel {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "operator" => Ok(Self::Operator),
            "admin" => Ok(Self::Admin),
            _ => Err(CliError::UnknownLevel(s.to_owned())),
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Permission denied")]
    PermissionDenied,

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("Unknown access level '{0}'")]
    UnknownLevel(String),

    #[error("Can't start the HTTP client: not enough parameters.")]
    NotEnoughParameters,

    #[error("Can't start the HTTP client: invalid method '{0}'.")]
    InvalidMethod(String),

    #[error("Can't start the HTTP client: {source}.")]
    Start {
        #[from]
        source: HttpClientError,
    },

    #[error("console output error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl CliError {
    fn start<E: Into<HttpClientError>>(e: E) -> Self {
        Self::Start { source: e.into() }
    }
}

/// What the console remembers about the exchange it runs.
#[derive(Debug, Default)]
pub struct ConsoleCtx {
    flags: Cell<u8>,
    wake: Notify,
}

impl ConsoleCtx {
    pub fn flags(&self) -> u8 {
        self.flags.get()
    }

    fn raise(&self, flag: u8) {
        self.flags.set(self.flags.get() | flag);
        self.wake.notify_one();
    }

    fn clear(&self, flag: u8) {
        self.flags.set(self.flags.get() & !flag);
    }
}

/// Callbacks turning client events into console flags.
#[derive(Debug)]
pub struct ConsoleOps;

impl ConsoleOps {
    fn notify(hc: &HttpClient, flag: u8) {
        if let Some(ctx) = hc.caller::<ConsoleCtx>() {
            ctx.raise(flag);
        }
    }
}

impl HttpClientOps for ConsoleOps {
    fn res_stline(&self, hc: &HttpClient) {
        Self::notify(hc, RES_STLINE);
    }

    fn res_headers(&self, hc: &HttpClient) {
        Self::notify(hc, RES_HDR);
    }

    fn res_payload(&self, hc: &HttpClient) {
        Self::notify(hc, RES_BODY);
    }

    fn res_end(&self, hc: &HttpClient) {
        Self::notify(hc, RES_END);
    }
}

/// A console session.
#[derive(Debug)]
pub struct Console {
    proxy: HttpClientProxy,
    level: AccessLevel,
    user_agent: HttpHeader,
}

impl Console {
    /// Creates a session at `level`, sending the configured `User-Agent`
    /// with every request.
    ///
    /// # Errors
    ///
    /// Fails when the configured `User-Agent` is not a valid header value.
    pub fn new(proxy: HttpClientProxy, level: AccessLevel) -> Result<Self, HeaderError> {
        let value = Bytes::from(proxy.config().user_agent.clone());
        let user_agent = HttpHeader::new(Bytes::from_static(b"User-Agent"), value)?;
        Ok(Self { proxy, level, user_agent })
    }

    pub fn proxy(&self) -> &HttpClientProxy {
        &self.proxy
    }

    /// Runs one command line, writing the response or the error message to
    /// `out`. Empty lines are ignored.
    ///
    /// # Errors
    ///
    /// Only fails when `out` can't be written to.
    pub async fn run_command<W: AsyncWrite + Unpin>(&self, line: &str, out: &mut W) -> io::Result<()> {
        match self.execute(line, out).await {
            Ok(()) => Ok(()),
            Err(CliError::Io { source }) => Err(source),
            Err(e) => {
                debug!(cause = %e, line, "console command failed");
                out.write_all(format!("{e}\n").as_bytes()).await?;
                out.flush().await
            }
        }
    }

    /// Runs one command line, writing the response to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] when the command is unknown or not allowed, the
    /// client can't be started, or `out` can't be written to.
    pub async fn execute<W: AsyncWrite + Unpin>(&self, line: &str, out: &mut W) -> Result<(), CliError> {
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some(&keyword) = args.first() else {
            return Ok(());
        };
        if keyword != KEYWORD {
            return Err(CliError::UnknownCommand(keyword.to_owned()));
        }

        let (client, ctx) = self.start(&args[1..])?;
        let result = dump(&client, &ctx, out).await;

        // everything possible was printed, the client can go
        HttpClient::destroy(client);
        result.map_err(CliError::from)
    }

    /// Parses `<method> <URI>` and launches the client.
    fn start(&self, args: &[&str]) -> Result<(SharedHttpClient, Rc<ConsoleCtx>), CliError> {
        if self.level < AccessLevel::Admin {
            return Err(CliError::PermissionDenied);
        }

        let (Some(method), Some(uri)) = (args.first(), args.get(1)) else {
            return Err(CliError::NotEnoughParameters);
        };
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| CliError::InvalidMethod((*method).to_owned()))?;

        let ctx = Rc::new(ConsoleCtx::default());
        let caller: Weak<dyn Any> = Rc::downgrade(&ctx) as Weak<dyn Any>;

        let client = HttpClient::new(self.proxy.pool(), Some(caller), method, *uri).map_err(CliError::start)?;
        {
            let mut hc = client.borrow_mut();
            hc.set_ops(Rc::new(ConsoleOps));
            hc.req_gen(std::slice::from_ref(&self.user_agent)).map_err(CliError::start)?;
        }
        HttpClient::start(&client, &self.proxy).map_err(CliError::start)?;

        Ok((client, ctx))
    }
}

/// Renders the response as the client reports it, one flag at a time, until
/// only the end flag is left.
async fn dump<W: AsyncWrite + Unpin>(client: &SharedHttpClient, ctx: &ConsoleCtx, out: &mut W) -> io::Result<()> {
    let mut chunk = BytesMut::new();

    loop {
        let flags = ctx.flags();

        if flags == 0 {
            ctx.wake.notified().await;
            continue;
        }

        if flags & RES_STLINE != 0 {
            let hc = client.borrow();
            let res = hc.response();
            chunk.extend_from_slice(format!("{} {} ", res.vsn(), res.status()).as_bytes());
            chunk.extend_from_slice(res.reason());
            chunk.extend_from_slice(b"\n");
            ctx.clear(RES_STLINE);
        } else if flags & RES_HDR != 0 {
            let hc = client.borrow();
            for header in hc.response().headers().unwrap_or_default() {
                chunk.extend_from_slice(header.name_bytes());
                chunk.extend_from_slice(b": ");
                chunk.extend_from_slice(header.value());
                chunk.extend_from_slice(b"\r\n");
            }
            chunk.extend_from_slice(b"\r\n");
            ctx.clear(RES_HDR);
        } else if flags & RES_BODY != 0 {
            let mut hc = client.borrow_mut();
            hc.res_xfer(&mut chunk);
            // the flag comes back with the next payload
            if hc.response().body().is_empty() {
                ctx.clear(RES_BODY);
            }
        } else if flags == RES_END {
            ctx.clear(RES_END);
            out.flush().await?;
            return Ok(());
        } else {
            warn!(flags, "unexpected console flags");
            ctx.clear(flags);
        }

        out.write_all_buf(&mut chunk).await?;
    }
}
