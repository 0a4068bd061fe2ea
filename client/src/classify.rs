//! Folds transport failures and RPC error payloads into [`CommandError`].
//!
//! Both transports route every failure through here so callers see the same
//! shape whichever protocol was used.

use std::time::Duration;
use tokio_tungstenite::tungstenite;

use crate::error::CommandError;
use crate::rpc::{Inbound, RpcError, AUTH_ERROR_CODE};

/// Maps the final status of a REST response to a command failure. `None`
/// means success.
///
/// The API has been seen answering a bad key with 500, so 500 is treated as
/// an authentication failure together with 401.
pub fn classify_status(code: u16, reason: Option<&str>) -> Option<CommandError> {
    match code {
        200 => None,
        404 => Some(CommandError::NotFound),
        401 | 500 => Some(CommandError::Auth),
        _ => Some(CommandError::Api {
            code,
            reason: reason.unwrap_or("Unknown").to_string(),
        }),
    }
}

pub fn classify_http(err: reqwest::Error, timeout: Duration) -> CommandError {
    if err.is_timeout() {
        return CommandError::Timeout(format!(
            "request timed out after {} seconds",
            timeout.as_secs_f32()
        ));
    }
    if let Some(status) = err.status() {
        if let Some(classified) = classify_status(status.as_u16(), status.canonical_reason()) {
            return classified;
        }
    }
    if err.is_decode() || err.is_body() {
        return CommandError::Protocol(format!("failed to read response body: {}", err));
    }
    CommandError::Connection(err.to_string())
}

pub fn classify_ws(err: tungstenite::Error) -> CommandError {
    use tungstenite::Error;

    match err {
        Error::ConnectionClosed | Error::AlreadyClosed => {
            CommandError::Protocol("connection closed".to_string())
        }
        // A refused upgrade is reported as-is; Auth and NotFound are
        // reserved for RPC code 207 and REST paths.
        Error::Http(response) => {
            let status = response.status();
            CommandError::Api {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            }
        }
        Error::Io(e) => CommandError::Connection(e.to_string()),
        Error::Tls(e) => CommandError::Connection(format!("TLS error: {}", e)),
        Error::Url(e) => CommandError::Connection(format!("invalid WebSocket URL: {}", e)),
        Error::HttpFormat(e) => CommandError::Connection(e.to_string()),
        other => CommandError::Protocol(other.to_string()),
    }
}

/// Error payload of an RPC reply. Code 207 is a rejected credential;
/// everything else is reported with the server's reason text.
pub fn classify_rpc_error(err: &RpcError) -> CommandError {
    if err.error == Some(AUTH_ERROR_CODE) {
        return CommandError::Auth;
    }
    CommandError::Protocol(
        err.reason
            .clone()
            .unwrap_or_else(|| "No reason provided".to_string()),
    )
}

/// Parses one text frame and rejects replies that carry an error.
pub fn parse_reply(text: &str) -> Result<Inbound, CommandError> {
    let reply: Inbound = serde_json::from_str(text).map_err(|e| {
        CommandError::Protocol(format!("error parsing JSON response: {}", e))
    })?;

    if reply.is_msg("failed") || reply.is_msg("error") {
        return Err(CommandError::Protocol(format!(
            "server rejected the request: {}",
            text
        )));
    }
    if let Some(err) = reply.result_error() {
        return Err(classify_rpc_error(err));
    }
    Ok(reply)
}
