//! Byte transports underneath a NETCONF session
//!
//! The session client only needs a bidirectional byte stream. A
//! [`Connector`] opens one per session. [`SshConnector`] runs NETCONF over
//! the SSH `netconf` subsystem (RFC 6242) and authenticates with the
//! credentials carried by [`SessionParams`]; [`TcpConnector`] opens a bare
//! TCP stream for devices or simulators without SSH.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use ssh2::{Channel, HashType, Session};
use tracing::{debug, info};

use crate::config::SessionParams;
use crate::error::{Result, YdkError};

/// A connected byte stream
pub trait Transport: Read + Write + Send {
    /// Tear the connection down. Further reads and writes fail.
    fn disconnect(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn disconnect(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Opens transports for session parameters
pub trait Connector: Send + Sync + fmt::Debug {
    /// Open a transport to `params.host:params.port`.
    ///
    /// Fails with [`YdkError::Connection`] when the peer is unreachable and
    /// [`YdkError::Authentication`] when credentials are rejected.
    fn connect(&self, params: &SessionParams) -> Result<Box<dyn Transport>>;
}

/// Plain TCP connector
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl TcpConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the same timeout to connecting, reading and writing
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            connect_timeout: Some(timeout),
            read_timeout: Some(timeout),
            write_timeout: Some(timeout),
        }
    }

    /// Connected stream with nodelay and timeouts applied
    fn open(&self, params: &SessionParams) -> Result<TcpStream> {
        let stream = open_stream(params, self.connect_timeout).map_err(connection_error(params))?;
        stream.set_nodelay(true).map_err(connection_error(params))?;
        stream
            .set_read_timeout(self.read_timeout)
            .map_err(connection_error(params))?;
        stream
            .set_write_timeout(self.write_timeout)
            .map_err(connection_error(params))?;
        Ok(stream)
    }
}

impl Connector for TcpConnector {
    fn connect(&self, params: &SessionParams) -> Result<Box<dyn Transport>> {
        Ok(Box::new(self.open(params)?))
    }
}

/// SSH subsystem carrying NETCONF
pub const NETCONF_SUBSYSTEM: &str = "netconf";

/// NETCONF over SSH with password authentication.
///
/// The server host key is not verified against a known-hosts store; its
/// SHA-256 fingerprint is logged at `info` level on every connect.
#[derive(Debug, Clone, Default)]
pub struct SshConnector {
    pub connect_timeout: Option<Duration>,
    /// Applied to the handshake and to every blocking channel operation
    pub timeout: Option<Duration>,
}

impl SshConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            connect_timeout: Some(timeout),
            timeout: Some(timeout),
        }
    }
}

impl Connector for SshConnector {
    fn connect(&self, params: &SessionParams) -> Result<Box<dyn Transport>> {
        let ssh_error = |e: ssh2::Error| YdkError::Connection {
            host: params.host.clone(),
            port: params.port,
            reason: e.to_string(),
        };

        let stream = open_stream(params, self.connect_timeout).map_err(connection_error(params))?;
        stream.set_nodelay(true).map_err(connection_error(params))?;

        let mut session = Session::new().map_err(ssh_error)?;
        if let Some(timeout) = self.timeout {
            session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        }
        session.set_tcp_stream(stream);
        session.handshake().map_err(ssh_error)?;

        if let Some(fingerprint) = session.host_key_hash(HashType::Sha256) {
            info!(
                host = %params.host,
                fingerprint = %format!("SHA256:{}", STANDARD_NO_PAD.encode(fingerprint)),
                "SSH host key"
            );
        }

        if let Err(e) = session.userauth_password(&params.username, &params.password) {
            debug!(user = %params.username, error = %e, "password authentication rejected");
            return Err(YdkError::Authentication(params.username.clone()));
        }
        if !session.authenticated() {
            return Err(YdkError::Authentication(params.username.clone()));
        }

        let mut channel = session.channel_session().map_err(ssh_error)?;
        channel.subsystem(NETCONF_SUBSYSTEM).map_err(ssh_error)?;
        debug!(host = %params.host, "opened netconf subsystem");

        Ok(Box::new(SshTransport { session, channel }))
    }
}

/// Channel bound to the `netconf` subsystem
struct SshTransport {
    session: Session,
    channel: Channel,
}

impl Read for SshTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.channel.read(buf)
    }
}

impl Write for SshTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.channel.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.channel.flush()
    }
}

impl Transport for SshTransport {
    fn disconnect(&mut self) -> io::Result<()> {
        self.channel.send_eof()?;
        self.channel.close()?;
        self.session
            .disconnect(None, "session closed", None)
            .map_err(io::Error::from)
    }
}

fn open_stream(params: &SessionParams, timeout: Option<Duration>) -> io::Result<TcpStream> {
    let mut last_error = None;
    for addr in params.address().to_socket_addrs()? {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!(%addr, error = %e, "connect attempt failed");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
    }))
}

fn connection_error(params: &SessionParams) -> impl Fn(io::Error) -> YdkError + '_ {
    move |e| YdkError::Connection {
        host: params.host.clone(),
        port: params.port,
        reason: e.to_string(),
    }
}
