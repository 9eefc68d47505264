//! NETCONF session client
//!
//! A [`NetconfClient`] owns at most one session with one device. It moves
//! between three states:
//!
//! ```text
//!  Disconnected --connect--> Connected --close / failure--> Closed
//!                               ^                              |
//!                               +----------connect-------------+
//! ```
//!
//! Payloads are validated locally before anything is written to the wire;
//! replies are returned verbatim, RPC errors included.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::SessionParams;
use crate::error::{Result, YdkError};
use crate::framing::{Framing, MessageBuffer};
use crate::rpc::{
    CAPABILITY_BASE_1_0, CAPABILITY_BASE_1_1, NETCONF_BASE_NS, RpcOperation, RpcRequest,
};
use crate::transport::{Connector, SshConnector, Transport};
use crate::xml;

/// Connect and I/O timeout used by [`NetconfClient::new`]
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Lifecycle state of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Never connected, or the last connect attempt failed
    Disconnected,
    Connected,
    /// Closed by the caller or torn down after a transport failure
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => f.write_str("disconnected"),
            SessionState::Connected => f.write_str("connected"),
            SessionState::Closed => f.write_str("closed"),
        }
    }
}

/// An established session
struct Session {
    transport: Box<dyn Transport>,
    buffer: MessageBuffer,
    framing: Framing,
    session_id: Option<u32>,
    capabilities: Vec<String>,
}

impl Session {
    /// Send one message and block for exactly one message back
    fn exchange(&mut self, message: &str) -> Result<String> {
        let frame = self.framing.encode(message.as_bytes());
        self.transport.write_all(&frame)?;
        self.transport.flush()?;
        debug!(bytes = message.len(), "sent message");

        let reply = self.buffer.read_message(&mut *self.transport)?;
        debug!(bytes = reply.len(), "received message");
        std::str::from_utf8(&reply)
            .map(str::to_owned)
            .map_err(|_| YdkError::Xml("reply is not valid UTF-8".into()))
    }

    fn teardown(mut self) {
        if let Err(e) = self.transport.disconnect() {
            debug!(error = %e, "transport shutdown failed");
        }
    }
}

/// Server side of the capability exchange
struct ServerHello {
    session_id: Option<u32>,
    capabilities: Vec<String>,
}

/// Blocking NETCONF client bound to one device
pub struct NetconfClient {
    params: SessionParams,
    connector: Arc<dyn Connector>,
    state: SessionState,
    session: Option<Session>,
    next_message_id: u64,
}

impl NetconfClient {
    /// Client for `host:port` over SSH, authenticating with `username` and
    /// `password`. No I/O happens until [`connect`](Self::connect).
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self::from_params(SessionParams::new(username, password, host, port))
    }

    pub fn from_params(params: SessionParams) -> Self {
        Self::with_connector(params, Arc::new(SshConnector::with_timeout(DEFAULT_TIMEOUT)))
    }

    /// Client opening its transport through `connector`
    pub fn with_connector(params: SessionParams, connector: Arc<dyn Connector>) -> Self {
        Self {
            params,
            connector,
            state: SessionState::Disconnected,
            session: None,
            next_message_id: 1,
        }
    }

    /// Open the transport and exchange capabilities.
    ///
    /// A no-op when already connected. On failure the client is left
    /// [`SessionState::Disconnected`].
    pub fn connect(&mut self) -> Result<()> {
        if self.state == SessionState::Connected {
            return Ok(());
        }
        debug!(host = %self.params.host, port = self.params.port, "connecting");

        match self.open_session() {
            Ok(session) => {
                info!(
                    host = %self.params.host,
                    session_id = ?session.session_id,
                    framing = %session.framing,
                    "NETCONF session established"
                );
                self.session = Some(session);
                self.state = SessionState::Connected;
                Ok(())
            }
            Err(e) => {
                warn!(host = %self.params.host, error = %e, "connect failed");
                self.session = None;
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    fn open_session(&self) -> Result<Session> {
        let transport = self.connector.connect(&self.params)?;
        let mut session = Session {
            transport,
            buffer: MessageBuffer::new(Framing::EndOfMessage),
            framing: Framing::EndOfMessage,
            session_id: None,
            capabilities: Vec::new(),
        };

        let hello = match session
            .exchange(&client_hello())
            .and_then(|reply| parse_server_hello(&reply))
        {
            Ok(hello) => hello,
            Err(e) => {
                session.teardown();
                return Err(self.connection_error(format!("capability exchange failed: {}", e)));
            }
        };

        if hello.capabilities.iter().any(|c| c == CAPABILITY_BASE_1_1) {
            session.framing = Framing::Chunked;
            session.buffer.set_framing(Framing::Chunked);
        }
        debug!(capabilities = hello.capabilities.len(), "received server hello");
        session.session_id = hello.session_id;
        session.capabilities = hello.capabilities;
        Ok(session)
    }

    /// Validate `payload`, send it and return the device's raw reply.
    ///
    /// Fails with [`YdkError::NotConnected`] unless connected and with
    /// [`YdkError::BuildPayload`] for payloads that are not a well-formed
    /// `<rpc>`; neither touches the network. A reply carrying
    /// `<rpc-error>` is returned as `Ok`. A transport or framing failure
    /// closes the session.
    pub fn execute_payload(&mut self, payload: &str) -> Result<String> {
        if self.state != SessionState::Connected {
            return Err(YdkError::NotConnected(self.params.host.clone()));
        }

        let request = RpcRequest::parse(payload).inspect_err(|e| {
            if let YdkError::BuildPayload { reason } = e {
                debug!(%reason, "payload rejected");
            }
        })?;

        let generated_id = self.next_message_id.to_string();
        self.next_message_id += 1;
        let expected_id = request.message_id().unwrap_or(&generated_id).to_string();
        let message = request.with_message_id(&generated_id);

        let session = self
            .session
            .as_mut()
            .ok_or_else(|| YdkError::NotConnected(self.params.host.clone()))?;
        let reply = match session.exchange(&message) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(host = %self.params.host, error = %e, "session failed");
                self.drop_session();
                return Err(e);
            }
        };

        if let Ok(root) = xml::parse(&reply)
            && root.attribute("message-id") != Some(expected_id.as_str())
        {
            warn!(
                expected = %expected_id,
                received = ?root.attribute("message-id"),
                "message-id mismatch in reply"
            );
        }

        if *request.operation() == RpcOperation::CloseSession {
            info!(host = %self.params.host, "session closed by close-session");
            self.drop_session();
        }
        Ok(reply)
    }

    /// Close the session.
    ///
    /// Sends `<close-session/>` best effort and shuts the transport down.
    /// A no-op unless connected.
    pub fn close(&mut self) -> Result<()> {
        if self.state != SessionState::Connected {
            return Ok(());
        }
        let message = format!(
            r#"<rpc xmlns="{}" message-id="{}"><close-session/></rpc>"#,
            NETCONF_BASE_NS, self.next_message_id
        );
        self.next_message_id += 1;

        if let Some(session) = self.session.as_mut()
            && let Err(e) = session.exchange(&message)
        {
            debug!(error = %e, "close-session not acknowledged");
        }
        self.drop_session();
        info!(host = %self.params.host, "NETCONF session closed");
        Ok(())
    }

    fn drop_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.teardown();
        }
        self.state = SessionState::Closed;
    }

    fn connection_error(&self, reason: String) -> YdkError {
        YdkError::Connection {
            host: self.params.host.clone(),
            port: self.params.port,
            reason,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    /// Session id assigned by the device in its hello
    pub fn session_id(&self) -> Option<u32> {
        self.session.as_ref().and_then(|s| s.session_id)
    }

    /// Capabilities advertised by the device, empty while not connected
    pub fn capabilities(&self) -> &[String] {
        self.session
            .as_ref()
            .map(|s| s.capabilities.as_slice())
            .unwrap_or_default()
    }

    /// Whether the device advertised `uri`, ignoring capability parameters
    pub fn supports_capability(&self, uri: &str) -> bool {
        self.capabilities()
            .iter()
            .any(|c| c.split('?').next() == Some(uri))
    }

    pub fn host(&self) -> &str {
        &self.params.host
    }

    pub fn port(&self) -> u16 {
        self.params.port
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }
}

impl fmt::Debug for NetconfClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetconfClient")
            .field("params", &self.params)
            .field("connector", &self.connector)
            .field("state", &self.state)
            .field("session_id", &self.session_id())
            .finish()
    }
}

impl Drop for NetconfClient {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn client_hello() -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<hello xmlns="{}"><capabilities>"#,
            "<capability>{}</capability><capability>{}</capability>",
            "</capabilities></hello>"
        ),
        NETCONF_BASE_NS, CAPABILITY_BASE_1_0, CAPABILITY_BASE_1_1
    )
}

fn parse_server_hello(message: &str) -> Result<ServerHello> {
    let root = xml::parse(message)?;
    if root.name != "hello" || root.namespace.as_deref().is_some_and(|ns| ns != NETCONF_BASE_NS) {
        return Err(YdkError::Xml(format!("expected <hello>, found <{}>", root)));
    }

    let capabilities: Vec<String> = root
        .child("capabilities")
        .map(|caps| {
            caps.children_named("capability")
                .map(|c| c.text().to_string())
                .collect()
        })
        .unwrap_or_default();
    if !capabilities
        .iter()
        .any(|c| c == CAPABILITY_BASE_1_0 || c == CAPABILITY_BASE_1_1)
    {
        return Err(YdkError::Xml("hello lacks a NETCONF base capability".into()));
    }

    let session_id = root
        .child_text("session-id")
        .map(|id| {
            id.parse::<u32>()
                .map_err(|_| YdkError::Xml(format!("invalid session-id '{}'", id)))
        })
        .transpose()?;

    Ok(ServerHello {
        session_id,
        capabilities,
    })
}
