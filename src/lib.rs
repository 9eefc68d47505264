//! rust-ydk - YANG development kit core
//!
//! This library provides the typed data model shared by schema-generated
//! classes (entities, leaves, leaf-lists and YANG scalar values) plus a
//! blocking NETCONF-over-SSH client that validates RPC payloads and exchanges them
//! with a device.
//!
//! # Example
//!
//! ```no_run
//! use rust_ydk::{NetconfClient, RpcReply};
//!
//! let mut client = NetconfClient::new("admin", "admin", "10.0.0.1", 830);
//! client.connect().unwrap();
//!
//! let reply = client
//!     .execute_payload(
//!         r#"<rpc xmlns="urn:ietf:params:xml:ns:netconf:base:1.0">
//!              <get-config><source><running/></source></get-config>
//!            </rpc>"#,
//!     )
//!     .unwrap();
//! let reply = RpcReply::parse(&reply).unwrap();
//! println!("{:?}", reply.data());
//!
//! client.close().unwrap();
//! ```

pub mod client;
pub mod config;
pub mod entity;
mod error;
pub mod filter;
pub mod framing;
pub mod leaf;
pub mod rpc;
pub mod transport;
pub mod value;
pub mod xml;

pub use client::{NetconfClient, SessionState};
pub use config::SessionParams;
pub use entity::{Entity, EntityData, EntityPath, EntityRef};
pub use error::{Result, YdkError};
pub use filter::YFilter;
pub use leaf::{LeafData, YLeaf, YLeafList};
pub use rpc::{ReplyKind, RpcError, RpcOperation, RpcReply, RpcRequest};
pub use transport::{Connector, SshConnector, TcpConnector, Transport};
pub use value::{Bits, Decimal64, Empty, EnumValue, Identity, ScalarValue, YType};
