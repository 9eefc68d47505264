//! In-process NETCONF device for integration tests
//!
//! Speaks plain TCP with the crate's own framing. Datastores are flat maps
//! from slash-separated leaf paths to leaf text; that is enough for
//! containers and leaves, lists are not modeled.

#![allow(dead_code)]

pub mod model;

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rust_ydk::framing::{Framing, MessageBuffer};
use rust_ydk::rpc::{CAPABILITY_BASE_1_0, CAPABILITY_BASE_1_1, NETCONF_BASE_NS};
use rust_ydk::xml::{self, XmlElement, escape};
use rust_ydk::{Connector, NetconfClient, Result, SessionParams, TcpConnector, YdkError};

/// Device behavior switches
#[derive(Debug, Clone)]
pub struct DeviceOptions {
    /// Advertise base:1.1 and use chunked framing when the client does
    pub base_1_1: bool,
    /// The first `n` sessions drop the connection on their first RPC
    pub hang_up_sessions: u32,
    /// Send a non-hello message instead of the capability exchange
    pub garbage_hello: bool,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            base_1_1: true,
            hang_up_sessions: 0,
            garbage_hello: false,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Datastore {
    pub leaves: BTreeMap<String, String>,
    /// Namespace of each top-level element
    namespaces: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
pub struct DeviceState {
    pub running: Datastore,
    pub candidate: Datastore,
    /// datastore name -> owning session id
    pub locks: HashMap<String, u32>,
    /// RPCs received across all sessions
    pub rpc_count: usize,
}

impl DeviceState {
    fn datastore(&mut self, name: &str) -> std::result::Result<&mut Datastore, Fault> {
        match name {
            "running" => Ok(&mut self.running),
            "candidate" => Ok(&mut self.candidate),
            other => Err(Fault::protocol(
                "invalid-value",
                &format!("unknown datastore '{}'", other),
            )),
        }
    }
}

pub struct MockDevice {
    port: u16,
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    pub fn start() -> Self {
        Self::with_options(DeviceOptions::default())
    }

    pub fn with_options(options: DeviceOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(DeviceState::default()));

        let shared = state.clone();
        thread::spawn(move || {
            let mut next_session_id = 1u32;
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let session_id = next_session_id;
                next_session_id += 1;
                let state = shared.clone();
                let options = options.clone();
                thread::spawn(move || {
                    let _ = serve(stream, session_id, &state, &options);
                    release_locks(&state, session_id);
                });
            }
        });

        Self { port, state }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn params(&self) -> SessionParams {
        SessionParams::new("admin", "admin", "127.0.0.1", self.port)
    }

    /// Disconnected client for this device
    pub fn client(&self) -> NetconfClient {
        client_for(self.params())
    }

    pub fn rpc_count(&self) -> usize {
        self.state.lock().unwrap().rpc_count
    }

    pub fn candidate_leaf(&self, path: &str) -> Option<String> {
        self.state.lock().unwrap().candidate.leaves.get(path).cloned()
    }
}

/// The device speaks NETCONF over bare TCP
pub fn tcp_connector() -> Arc<dyn Connector> {
    Arc::new(TcpConnector::with_timeout(Duration::from_secs(10)))
}

pub fn client_for(params: SessionParams) -> NetconfClient {
    NetconfClient::with_connector(params, tcp_connector())
}

fn release_locks(state: &Mutex<DeviceState>, session_id: u32) {
    if let Ok(mut state) = state.lock() {
        state.locks.retain(|_, owner| *owner != session_id);
    }
}

fn server_hello(session_id: u32, options: &DeviceOptions) -> String {
    let mut caps = format!("<capability>{}</capability>", CAPABILITY_BASE_1_0);
    if options.base_1_1 {
        caps.push_str(&format!("<capability>{}</capability>", CAPABILITY_BASE_1_1));
    }
    caps.push_str("<capability>urn:ietf:params:netconf:capability:candidate:1.0</capability>");
    format!(
        r#"<hello xmlns="{}"><capabilities>{}</capabilities><session-id>{}</session-id></hello>"#,
        NETCONF_BASE_NS, caps, session_id
    )
}

fn serve(
    mut stream: TcpStream,
    session_id: u32,
    state: &Mutex<DeviceState>,
    options: &DeviceOptions,
) -> Result<()> {
    let mut buffer = MessageBuffer::new(Framing::EndOfMessage);

    if options.garbage_hello {
        stream.write_all(&Framing::EndOfMessage.encode(b"<garbage/>"))?;
        let _ = buffer.read_message(&mut stream);
        return Ok(());
    }

    let hello = server_hello(session_id, options);
    stream.write_all(&Framing::EndOfMessage.encode(hello.as_bytes()))?;

    let client_hello = String::from_utf8_lossy(&buffer.read_message(&mut stream)?).into_owned();
    let client_hello = xml::parse(&client_hello)?;
    let client_1_1 = client_hello
        .descendants()
        .iter()
        .any(|e| e.name == "capability" && e.text() == CAPABILITY_BASE_1_1);
    let framing = if options.base_1_1 && client_1_1 {
        Framing::Chunked
    } else {
        Framing::EndOfMessage
    };
    buffer.set_framing(framing);

    loop {
        let message = match buffer.read_message(&mut stream) {
            Ok(message) => message,
            Err(YdkError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e),
        };
        if session_id <= options.hang_up_sessions {
            return Ok(());
        }

        let text = String::from_utf8_lossy(&message).into_owned();
        let (reply, close) = handle(&text, session_id, state);
        stream.write_all(&framing.encode(reply.as_bytes()))?;
        stream.flush()?;
        if close {
            return Ok(());
        }
    }
}

/// An `<rpc-error>` to report
#[derive(Debug)]
struct Fault {
    error_type: &'static str,
    tag: &'static str,
    message: String,
}

impl Fault {
    fn protocol(tag: &'static str, message: &str) -> Self {
        Self {
            error_type: "protocol",
            tag,
            message: message.to_string(),
        }
    }

    fn application(tag: &'static str, message: &str) -> Self {
        Self {
            error_type: "application",
            tag,
            message: message.to_string(),
        }
    }
}

type Outcome = std::result::Result<Option<String>, Fault>;

fn handle(text: &str, session_id: u32, state: &Mutex<DeviceState>) -> (String, bool) {
    let mut state = state.lock().unwrap();
    state.rpc_count += 1;

    let root = match xml::parse(text) {
        Ok(root) => root,
        Err(e) => {
            let fault = Fault::protocol("malformed-message", &e.to_string());
            return (reply(None, Err(fault)), false);
        }
    };
    let message_id = root.attribute("message-id");
    let Some(operation) = root.children.first() else {
        let fault = Fault::protocol("missing-element", "no operation");
        return (reply(message_id, Err(fault)), false);
    };

    let mut close = false;
    let outcome = match operation.name.as_str() {
        "get-config" => get_config(operation, &mut state),
        "get" => Ok(Some(render(&state.running, filter_roots(operation).as_deref()))),
        "edit-config" => edit_config(operation, &mut state),
        "lock" => lock(operation, session_id, &mut state),
        "unlock" => unlock(operation, session_id, &mut state),
        "validate" => datastore_name(operation, "source").map(|_| None),
        "discard-changes" => {
            state.candidate = state.running.clone();
            Ok(None)
        }
        "commit" => {
            state.running = state.candidate.clone();
            Ok(None)
        }
        "close-session" => {
            close = true;
            Ok(None)
        }
        other => Err(Fault::protocol(
            "operation-not-supported",
            &format!("<{}> is not supported", other),
        )),
    };
    (reply(message_id, outcome), close)
}

fn reply(message_id: Option<&str>, outcome: Outcome) -> String {
    let id = message_id
        .map(|id| format!(r#" message-id="{}""#, escape(id)))
        .unwrap_or_default();
    let body = match outcome {
        Ok(None) => "<ok/>".to_string(),
        Ok(Some(data)) => format!("<data>{}</data>", data),
        Err(fault) => format!(
            concat!(
                "<rpc-error><error-type>{}</error-type><error-tag>{}</error-tag>",
                "<error-severity>error</error-severity><error-message>{}</error-message></rpc-error>"
            ),
            fault.error_type,
            fault.tag,
            escape(&fault.message)
        ),
    };
    format!(r#"<rpc-reply xmlns="{}"{}>{}</rpc-reply>"#, NETCONF_BASE_NS, id, body)
}

fn datastore_name<'a>(operation: &'a XmlElement, role: &str) -> std::result::Result<&'a str, Fault> {
    operation
        .child(role)
        .and_then(|el| el.children.first())
        .map(|ds| ds.name.as_str())
        .ok_or_else(|| Fault::protocol("missing-element", role))
}

fn filter_roots(operation: &XmlElement) -> Option<Vec<String>> {
    operation
        .child("filter")
        .map(|filter| filter.children.iter().map(|c| c.name.clone()).collect())
}

fn get_config(operation: &XmlElement, state: &mut DeviceState) -> Outcome {
    let source = datastore_name(operation, "source")?;
    let roots = filter_roots(operation);
    let datastore = state.datastore(source)?;
    Ok(Some(render(datastore, roots.as_deref())))
}

fn edit_config(operation: &XmlElement, state: &mut DeviceState) -> Outcome {
    let target = datastore_name(operation, "target")?.to_string();
    let config = operation
        .child("config")
        .ok_or_else(|| Fault::protocol("missing-element", "config"))?;

    let datastore = state.datastore(&target)?;
    let mut working = datastore.clone();
    for top in &config.children {
        if let Some(ns) = &top.namespace {
            working.namespaces.insert(top.name.clone(), ns.clone());
        }
        apply(top, &top.name, &mut working)?;
    }
    *datastore = working;
    Ok(None)
}

fn apply(element: &XmlElement, path: &str, store: &mut Datastore) -> std::result::Result<(), Fault> {
    let operation = element.attribute("operation").unwrap_or("merge");
    let prefix = format!("{}/", path);

    match operation {
        "delete" | "remove" => {
            let before = store.leaves.len();
            store
                .leaves
                .retain(|key, _| key != path && !key.starts_with(&prefix));
            if operation == "delete" && store.leaves.len() == before {
                return Err(Fault::application(
                    "data-missing",
                    &format!("{} does not exist", path),
                ));
            }
            Ok(())
        }
        _ if element.children.is_empty() => {
            if element.name == "number8" && element.text().parse::<i8>().is_err() {
                return Err(Fault::application(
                    "invalid-value",
                    &format!("'{}' is not a valid value for number8", element.text()),
                ));
            }
            store.leaves.insert(path.to_string(), element.text().to_string());
            Ok(())
        }
        _ => {
            for child in &element.children {
                apply(child, &format!("{}{}", prefix, child.name), store)?;
            }
            Ok(())
        }
    }
}

#[derive(Default)]
struct TreeNode {
    value: Option<String>,
    children: BTreeMap<String, TreeNode>,
}

fn render(store: &Datastore, roots: Option<&[String]>) -> String {
    let mut tree = TreeNode::default();
    for (path, value) in &store.leaves {
        let mut segments = path.split('/');
        let Some(first) = segments.next() else { continue };
        if roots.is_some_and(|roots| !roots.iter().any(|r| r == first)) {
            continue;
        }
        let mut node = tree.children.entry(first.to_string()).or_default();
        for segment in segments {
            node = node.children.entry(segment.to_string()).or_default();
        }
        node.value = Some(value.clone());
    }

    let mut out = String::new();
    for (name, node) in &tree.children {
        write_node(&mut out, name, node, store.namespaces.get(name));
    }
    out
}

fn write_node(out: &mut String, name: &str, node: &TreeNode, namespace: Option<&String>) {
    out.push('<');
    out.push_str(name);
    if let Some(ns) = namespace {
        out.push_str(&format!(r#" xmlns="{}""#, ns));
    }
    let text = node.value.as_deref().unwrap_or_default();
    if node.children.is_empty() && text.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    out.push_str(&escape(text));
    for (child_name, child) in &node.children {
        write_node(out, child_name, child, None);
    }
    out.push_str(&format!("</{}>", name));
}

fn lock(operation: &XmlElement, session_id: u32, state: &mut DeviceState) -> Outcome {
    let target = datastore_name(operation, "target")?;
    state.datastore(target)?;
    match state.locks.get(target) {
        Some(owner) => Err(Fault::protocol(
            "lock-denied",
            &format!("lock held by session {}", owner),
        )),
        None => {
            state.locks.insert(target.to_string(), session_id);
            Ok(None)
        }
    }
}

fn unlock(operation: &XmlElement, session_id: u32, state: &mut DeviceState) -> Outcome {
    let target = datastore_name(operation, "target")?;
    match state.locks.get(target) {
        Some(owner) if *owner == session_id => {
            state.locks.remove(target);
            Ok(None)
        }
        _ => Err(Fault::protocol(
            "operation-failed",
            &format!("{} is not locked by this session", target),
        )),
    }
}
