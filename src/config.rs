//! Session parameters
//!
//! Everything needed to open a NETCONF session, loadable from JSON:
//!
//! ```json
//! { "username": "admin", "password": "admin", "host": "10.0.0.1", "port": 830 }
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, YdkError};

/// IANA-assigned port for NETCONF over SSH
pub const DEFAULT_NETCONF_PORT: u16 = 830;

fn default_port() -> u16 {
    DEFAULT_NETCONF_PORT
}

/// Credentials and address of a device
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    pub username: String,
    pub password: String,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl SessionParams {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            host: host.into(),
            port,
        }
    }

    /// Load parameters from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Parse parameters from a JSON string
    pub fn from_json_str(content: &str) -> Result<Self> {
        let params: SessionParams = serde_json::from_str(content)?;
        if params.host.trim().is_empty() {
            return Err(YdkError::InvalidArgument("host must not be empty".into()));
        }
        Ok(params)
    }

    /// `host:port` form used for address resolution
    pub fn address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for SessionParams {
    type Err = YdkError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_json_str(s)
    }
}

impl fmt::Debug for SessionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionParams")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}
