use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::validate::{is_valid_ipv4, is_valid_mac};

// ============================================================================
// Server descriptor
// ============================================================================

/// Which wire protocol reaches the management API of a server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransportKind {
    #[default]
    Rest,
    Websocket,
}

/// Saved profiles may hold any spelling, or `null`. Whatever is not a
/// WebSocket name falls back to REST instead of failing the whole file.
impl<'de> Deserialize<'de> for TransportKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .and_then(|s| s.parse().ok())
            .unwrap_or_default())
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Rest => write!(f, "REST"),
            TransportKind::Websocket => write!(f, "WEBSOCKET"),
        }
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REST" => Ok(TransportKind::Rest),
            "WEBSOCKET" | "WS" => Ok(TransportKind::Websocket),
            other => Err(format!("unknown transport kind: {}", other)),
        }
    }
}

/// One remote target. Supplied fresh by the caller on every call; the client
/// never mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub id: u32,
    pub name: String,
    pub mac_address: Option<String>,
    pub broadcast_address: Option<String>,
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub transport: TransportKind,
}

impl ServerDescriptor {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_api(
        mut self,
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        transport: TransportKind,
    ) -> Self {
        self.endpoint = Some(endpoint.into());
        self.api_key = Some(api_key.into());
        self.transport = transport;
        self
    }

    pub fn with_wake(mut self, mac_address: impl Into<String>, broadcast: impl Into<String>) -> Self {
        self.mac_address = Some(mac_address.into());
        self.broadcast_address = Some(broadcast.into());
        self
    }

    /// Both endpoint and key are present and non-empty.
    pub fn is_api_configured(&self) -> bool {
        non_empty(&self.endpoint).is_some() && non_empty(&self.api_key).is_some()
    }

    /// Both MAC and broadcast address are present and valid.
    pub fn is_wake_configured(&self) -> bool {
        match (non_empty(&self.mac_address), non_empty(&self.broadcast_address)) {
            (Some(mac), Some(broadcast)) => is_valid_mac(mac) && is_valid_ipv4(broadcast),
            _ => false,
        }
    }

    /// Endpoint and key, if the descriptor is API-configured.
    pub fn api_target(&self) -> Option<ApiTarget<'_>> {
        Some(ApiTarget {
            endpoint: non_empty(&self.endpoint)?,
            api_key: non_empty(&self.api_key)?,
        })
    }
}

/// Borrowed view of the parts of a descriptor a transport needs.
#[derive(Debug, Clone, Copy)]
pub struct ApiTarget<'a> {
    pub endpoint: &'a str,
    pub api_key: &'a str,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GetState,
    Shutdown,
    Restart,
}

impl Command {
    /// Audit text sent along with power commands.
    pub fn reason(&self) -> &'static str {
        match self {
            Command::GetState => "TrueNAS Signaller state query",
            Command::Shutdown => "TrueNAS Signaller remote shutdown",
            Command::Restart => "TrueNAS Signaller remote restart",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::GetState => write!(f, "get-state"),
            Command::Shutdown => write!(f, "shutdown"),
            Command::Restart => write!(f, "restart"),
        }
    }
}

/// Successful outcome of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// System state as reported by the API, quotes removed.
    State(String),
    Acknowledged,
}

impl CommandOutput {
    pub fn state(&self) -> Option<&str> {
        match self {
            CommandOutput::State(s) => Some(s),
            CommandOutput::Acknowledged => None,
        }
    }
}

/// Removes surrounding whitespace and every double quote, so REST bodies
/// (`"READY"`) and WebSocket string results look the same.
pub fn normalize_state(raw: &str) -> String {
    raw.trim().replace('"', "")
}
