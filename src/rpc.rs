//! NETCONF RPC payloads and replies
//!
//! Validates outgoing `<rpc>` documents before any network I/O and
//! classifies `<rpc-reply>` documents into success, data and RPC errors.
//! See: https://www.rfc-editor.org/rfc/rfc6241#section-4

use std::fmt;

use crate::error::{Result, YdkError};
use crate::xml::{self, XmlElement};

/// NETCONF base XML namespace
pub const NETCONF_BASE_NS: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";

/// YANG 1.1 namespace carrying the `action` operation
pub const YANG_1_NS: &str = "urn:ietf:params:xml:ns:yang:1";

/// Capability URI for NETCONF base 1.0 (end-of-message framing)
pub const CAPABILITY_BASE_1_0: &str = "urn:ietf:params:netconf:base:1.0";

/// Capability URI for NETCONF base 1.1 (chunked framing)
pub const CAPABILITY_BASE_1_1: &str = "urn:ietf:params:netconf:base:1.1";

/// Operation wrapped by an `<rpc>` element
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RpcOperation {
    GetConfig,
    EditConfig,
    CopyConfig,
    DeleteConfig,
    Lock,
    Unlock,
    Validate,
    DiscardChanges,
    Commit,
    CancelCommit,
    Get,
    CloseSession,
    KillSession,
    /// YANG 1.1 `action` (RFC 7950 section 7.15.2)
    Action,
    /// Model-defined RPC outside the NETCONF base namespace
    Custom { namespace: String, name: String },
}

impl RpcOperation {
    /// Look up a base-namespace operation by its element name
    pub fn from_base_name(name: &str) -> Option<Self> {
        match name {
            "get-config" => Some(Self::GetConfig),
            "edit-config" => Some(Self::EditConfig),
            "copy-config" => Some(Self::CopyConfig),
            "delete-config" => Some(Self::DeleteConfig),
            "lock" => Some(Self::Lock),
            "unlock" => Some(Self::Unlock),
            "validate" => Some(Self::Validate),
            "discard-changes" => Some(Self::DiscardChanges),
            "commit" => Some(Self::Commit),
            "cancel-commit" => Some(Self::CancelCommit),
            "get" => Some(Self::Get),
            "close-session" => Some(Self::CloseSession),
            "kill-session" => Some(Self::KillSession),
            _ => None,
        }
    }

    /// Element name of the operation
    pub fn name(&self) -> &str {
        match self {
            Self::GetConfig => "get-config",
            Self::EditConfig => "edit-config",
            Self::CopyConfig => "copy-config",
            Self::DeleteConfig => "delete-config",
            Self::Lock => "lock",
            Self::Unlock => "unlock",
            Self::Validate => "validate",
            Self::DiscardChanges => "discard-changes",
            Self::Commit => "commit",
            Self::CancelCommit => "cancel-commit",
            Self::Get => "get",
            Self::CloseSession => "close-session",
            Self::KillSession => "kill-session",
            Self::Action => "action",
            Self::Custom { name, .. } => name,
        }
    }

    /// Base-namespace children the operation must carry.
    ///
    /// Each entry is a set of alternatives; exactly one of them must be
    /// present.
    fn required_children(&self) -> &'static [&'static [&'static str]] {
        match self {
            Self::GetConfig => &[&["source"]],
            Self::EditConfig => &[&["target"], &["config", "url"]],
            Self::CopyConfig => &[&["target"], &["source"]],
            Self::DeleteConfig => &[&["target"]],
            Self::Lock | Self::Unlock => &[&["target"]],
            Self::Validate => &[&["source"]],
            Self::KillSession => &[&["session-id"]],
            _ => &[],
        }
    }

    /// Base-namespace children the operation accepts, required ones included
    fn allowed_children(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::GetConfig => Some(&["source", "filter"]),
            Self::EditConfig => Some(&[
                "target",
                "default-operation",
                "test-option",
                "error-option",
                "config",
                "url",
            ]),
            Self::CopyConfig => Some(&["target", "source"]),
            Self::DeleteConfig | Self::Lock | Self::Unlock => Some(&["target"]),
            Self::Validate => Some(&["source"]),
            Self::DiscardChanges | Self::CloseSession => Some(&[]),
            Self::Commit => Some(&["confirmed", "confirm-timeout", "persist", "persist-id"]),
            Self::CancelCommit => Some(&["persist-id"]),
            Self::Get => Some(&["filter"]),
            Self::KillSession => Some(&["session-id"]),
            Self::Action | Self::Custom { .. } => None,
        }
    }

    /// Children naming a datastore, which must hold exactly one element
    fn datastore_children(&self) -> &'static [&'static str] {
        match self {
            Self::GetConfig | Self::Validate | Self::CopyConfig => &["source", "target"],
            Self::EditConfig | Self::DeleteConfig | Self::Lock | Self::Unlock => &["target"],
            _ => &[],
        }
    }
}

impl fmt::Display for RpcOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated outgoing RPC payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcRequest {
    payload: String,
    operation: RpcOperation,
    message_id: Option<String>,
    /// Byte offset of the `>` (or `/>`) closing the root start tag
    root_tag_end: usize,
}

impl RpcRequest {
    /// Validate a payload.
    ///
    /// The payload must be a single `<rpc>` element in the NETCONF base
    /// namespace (or unqualified) wrapping exactly one recognized operation
    /// with its required children. Every failure is reported as
    /// [`YdkError::BuildPayload`].
    pub fn parse(payload: &str) -> Result<Self> {
        let root = xml::parse(payload).map_err(|e| YdkError::build_payload(e.to_string()))?;

        if root.name != "rpc" || !in_base_namespace(&root) {
            return Err(YdkError::build_payload(format!(
                "root element is <{}>, expected <rpc>",
                root
            )));
        }

        let operation_element = match root.children.as_slice() {
            [single] => single,
            [] => return Err(YdkError::build_payload("<rpc> carries no operation")),
            _ => {
                return Err(YdkError::build_payload(
                    "<rpc> must carry exactly one operation",
                ));
            }
        };
        if !root.text().is_empty() {
            return Err(YdkError::build_payload("unexpected text inside <rpc>"));
        }

        let operation = classify_operation(operation_element)?;
        check_children(&operation, operation_element)?;

        let root_tag_end = root_start_tag_end(&root, payload);
        Ok(Self {
            payload: payload.to_string(),
            operation,
            message_id: root.attribute("message-id").map(String::from),
            root_tag_end,
        })
    }

    pub fn operation(&self) -> &RpcOperation {
        &self.operation
    }

    /// `message-id` attribute present in the original payload
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Original payload text
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Payload text carrying `id` as `message-id`.
    ///
    /// A payload that already carries a message-id is returned unchanged.
    pub fn with_message_id(&self, id: &str) -> String {
        if self.message_id.is_some() {
            return self.payload.clone();
        }
        let mut out = String::with_capacity(self.payload.len() + id.len() + 14);
        out.push_str(&self.payload[..self.root_tag_end]);
        out.push_str(" message-id=\"");
        out.push_str(&xml::escape(id));
        out.push('"');
        out.push_str(&self.payload[self.root_tag_end..]);
        out
    }
}

fn in_base_namespace(element: &XmlElement) -> bool {
    match element.namespace.as_deref() {
        None => true,
        Some(ns) => ns == NETCONF_BASE_NS,
    }
}

fn classify_operation(element: &XmlElement) -> Result<RpcOperation> {
    match element.namespace.as_deref() {
        None | Some(NETCONF_BASE_NS) => RpcOperation::from_base_name(&element.name)
            .ok_or_else(|| YdkError::build_payload(format!("unknown operation <{}>", element.name))),
        Some(YANG_1_NS) if element.name == "action" => Ok(RpcOperation::Action),
        Some(ns) => Ok(RpcOperation::Custom {
            namespace: ns.to_string(),
            name: element.name.clone(),
        }),
    }
}

fn check_children(operation: &RpcOperation, element: &XmlElement) -> Result<()> {
    let Some(allowed) = operation.allowed_children() else {
        return Ok(());
    };

    let base_children: Vec<&XmlElement> = element
        .children
        .iter()
        .filter(|c| in_base_namespace(c))
        .collect();

    for child in &base_children {
        if !allowed.contains(&child.name.as_str()) {
            return Err(YdkError::build_payload(format!(
                "<{}> is not allowed in <{}>",
                child.name, operation
            )));
        }
    }

    for alternatives in operation.required_children() {
        let present = base_children
            .iter()
            .filter(|c| alternatives.contains(&c.name.as_str()))
            .count();
        if present != 1 {
            return Err(YdkError::build_payload(format!(
                "<{}> requires exactly one of <{}>",
                operation,
                alternatives.join(">, <")
            )));
        }
    }

    for child in &base_children {
        if operation.datastore_children().contains(&child.name.as_str())
            && child.children.len() != 1
        {
            return Err(YdkError::build_payload(format!(
                "<{}> in <{}> must name exactly one datastore",
                child.name, operation
            )));
        }
    }
    Ok(())
}

/// Offset of the `>` or `/>` closing the root start tag
fn root_start_tag_end(root: &XmlElement, payload: &str) -> usize {
    let tag_end = root.inner_span.start - 1;
    if payload[..tag_end].ends_with('/') {
        tag_end - 1
    } else {
        tag_end
    }
}

/// One `<rpc-error>` entry of a reply
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RpcError {
    pub error_type: String,
    pub error_tag: String,
    pub error_severity: String,
    pub error_app_tag: Option<String>,
    pub error_path: Option<String>,
    pub error_message: Option<String>,
}

impl RpcError {
    fn from_element(element: &XmlElement) -> Self {
        let text = |name: &str| element.child_text(name).unwrap_or_default().to_string();
        let optional = |name: &str| element.child_text(name).map(String::from);
        Self {
            error_type: text("error-type"),
            error_tag: text("error-tag"),
            error_severity: text("error-severity"),
            error_app_tag: optional("error-app-tag"),
            error_path: optional("error-path"),
            error_message: optional("error-message"),
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.error_type, self.error_severity, self.error_tag)?;
        if let Some(message) = &self.error_message {
            write!(f, " ({})", message)?;
        }
        Ok(())
    }
}

/// Outcome carried by an `<rpc-reply>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    /// `<ok/>`
    Ok,
    /// Raw XML inside `<data>`, or the reply body of a custom RPC
    Data(String),
    /// One or more `<rpc-error>` entries
    Errors(Vec<RpcError>),
}

/// Classified `<rpc-reply>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcReply {
    pub message_id: Option<String>,
    pub kind: ReplyKind,
}

impl RpcReply {
    /// Classify a raw reply.
    ///
    /// Errors take precedence over `<ok/>` and data when a device sends
    /// both, since an `<rpc-error>` with severity warning may accompany them.
    pub fn parse(reply: &str) -> Result<Self> {
        let root = xml::parse(reply)?;
        if root.name != "rpc-reply" {
            return Err(YdkError::Xml(format!(
                "expected <rpc-reply>, found <{}>",
                root
            )));
        }

        let errors: Vec<RpcError> = root
            .children_named("rpc-error")
            .map(RpcError::from_element)
            .collect();

        let kind = if !errors.is_empty() {
            ReplyKind::Errors(errors)
        } else if root.child("ok").is_some() {
            ReplyKind::Ok
        } else if let Some(data) = root.child("data") {
            ReplyKind::Data(data.inner_raw(reply).to_string())
        } else {
            ReplyKind::Data(root.inner_raw(reply).to_string())
        };

        Ok(Self {
            message_id: root.attribute("message-id").map(String::from),
            kind,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.kind == ReplyKind::Ok
    }

    /// RPC errors carried by the reply, empty on success
    pub fn errors(&self) -> &[RpcError] {
        match &self.kind {
            ReplyKind::Errors(errors) => errors,
            _ => &[],
        }
    }

    /// Raw data payload, if the reply carries one
    pub fn data(&self) -> Option<&str> {
        match &self.kind {
            ReplyKind::Data(data) => Some(data),
            _ => None,
        }
    }
}
