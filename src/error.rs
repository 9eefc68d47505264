//! Error types for rust-ydk

use thiserror::Error;

use crate::value::YType;

/// Main error type for entity model and session operations
#[derive(Debug, Error)]
pub enum YdkError {
    /// A value of the wrong kind was assigned to a typed leaf
    #[error("Type mismatch on leaf '{name}': expected {expected}, got {found}")]
    TypeMismatch {
        name: String,
        expected: YType,
        found: YType,
    },

    /// Invalid argument, e.g. an ancestor that is not an ancestor
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The parent of an entity was dropped while the child is still in use
    #[error("Entity '{0}' refers to a parent that no longer exists")]
    DetachedEntity(String),

    /// Text could not be decoded into a typed value
    #[error("Type conversion error: {0}")]
    TypeConversion(String),

    /// A value path passed to `Entity::set_value` is not known to the entity
    #[error("Invalid value path '{path}' for entity '{entity}'")]
    InvalidValuePath { entity: String, path: String },

    /// `execute_payload` called on a session that is not connected
    #[error("Could not execute payload. Not connected to {0}")]
    NotConnected(String),

    /// Payload rejected locally before any network I/O
    #[error("Could not build payload")]
    BuildPayload { reason: String },

    /// Connection could not be established (refused, timeout, bad hello)
    #[error("Connection to {host}:{port} failed: {reason}")]
    Connection {
        host: String,
        port: u16,
        reason: String,
    },

    /// Credentials rejected by the transport
    #[error("Authentication failed for user '{0}'")]
    Authentication(String),

    /// Malformed NETCONF message framing
    #[error("Framing error: {0}")]
    Framing(String),

    /// Peer closed the session
    #[error("Connection closed")]
    ConnectionClosed,

    /// Malformed XML in a reply or hello message
    #[error("XML error: {0}")]
    Xml(String),

    /// IO error (socket operations, config files)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error (session configuration)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl YdkError {
    /// True for errors raised by the session client: local payload
    /// rejections, connection and transport failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected(_)
                | Self::BuildPayload { .. }
                | Self::Connection { .. }
                | Self::Authentication(_)
                | Self::Framing(_)
                | Self::ConnectionClosed
                | Self::Xml(_)
                | Self::Io(_)
        )
    }

    pub(crate) fn build_payload(reason: impl Into<String>) -> Self {
        Self::BuildPayload {
            reason: reason.into(),
        }
    }
}

/// Result type alias for rust-ydk operations
pub type Result<T> = std::result::Result<T, YdkError>;
