//! JSON envelopes of the WebSocket RPC dialect.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROTOCOL_VERSION: &str = "1";
pub const AUTH_METHOD: &str = "auth.login_with_api_key";

/// Request ids are fixed per step of the script.
pub const AUTH_ID: u32 = 2;
pub const INVOKE_ID: u32 = 3;

/// Error code the API uses for a rejected credential.
pub const AUTH_ERROR_CODE: i64 = 207;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "msg", rename_all = "lowercase")]
pub enum Outbound<'a> {
    Connect {
        version: &'a str,
        support: [&'a str; 1],
    },
    Method {
        id: u32,
        method: &'a str,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        params: Vec<&'a str>,
    },
}

impl<'a> Outbound<'a> {
    pub fn connect() -> Self {
        Outbound::Connect {
            version: PROTOCOL_VERSION,
            support: [PROTOCOL_VERSION],
        }
    }

    pub fn login(api_key: &'a str) -> Self {
        Outbound::Method {
            id: AUTH_ID,
            method: AUTH_METHOD,
            params: vec![api_key],
        }
    }

    pub fn call(method: &'a str, params: Vec<&'a str>) -> Self {
        Outbound::Method {
            id: INVOKE_ID,
            method,
            params,
        }
    }
}

/// Any frame received from the server. Only the fields the client acts on
/// are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct Inbound {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub error: Option<i64>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Inbound {
    pub fn is_msg(&self, kind: &str) -> bool {
        self.msg.as_deref() == Some(kind)
    }

    /// The error object of a `result` frame, if any.
    pub fn result_error(&self) -> Option<&RpcError> {
        if self.is_msg("result") {
            self.error.as_ref()
        } else {
            None
        }
    }
}
