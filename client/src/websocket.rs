//! WebSocket RPC transport.
//!
//! Every call opens its own connection and walks a fixed script over it:
//!
//! ```text
//! Connected --connect--> Handshaken --login--> Authenticated --call--> Invoked --> Closed
//! ```
//!
//! Each arrow is one outbound frame followed by exactly one awaited reply.
//! The connection is dropped when the call finishes, successfully or not.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_tls_with_config, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use uuid::Uuid;

use crate::classify::{classify_ws, parse_reply};
use crate::client::Transport;
use crate::config::TransportConfig;
use crate::error::{CommandError, Result};
use crate::rpc::{Inbound, Outbound};
use crate::tls::websocket_connector;
use crate::types::{normalize_state, ApiTarget, Command, CommandOutput};

pub const WEBSOCKET_PATH: &str = "/websocket";

/// Swap an `http`/`https` scheme for `ws`/`wss`. Anything else, including
/// URLs that already use a WebSocket scheme, is returned as is.
pub fn to_websocket_url(url: &str) -> String {
    if url.trim().is_empty() {
        return String::new();
    }
    if let Some(rest) = strip_scheme(url, "https://") {
        return format!("wss://{}", rest);
    }
    if let Some(rest) = strip_scheme(url, "http://") {
        return format!("ws://{}", rest);
    }
    url.to_string()
}

fn strip_scheme<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    let head = url.get(..scheme.len())?;
    if head.eq_ignore_ascii_case(scheme) {
        Some(&url[scheme.len()..])
    } else {
        None
    }
}

/// `<ws-scheme>://<host>/websocket` for an API endpoint.
pub fn websocket_endpoint(endpoint: &str) -> String {
    format!(
        "{}{}",
        to_websocket_url(endpoint).trim_end_matches('/'),
        WEBSOCKET_PATH
    )
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Connected,
    Handshaken,
    Authenticated,
    Invoked,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Connected => write!(f, "connect"),
            Phase::Handshaken => write!(f, "login"),
            Phase::Authenticated => write!(f, "call"),
            Phase::Invoked => write!(f, "done"),
        }
    }
}

/// A single RPC conversation. Owned by one call and never shared.
struct Session {
    stream: WsStream,
    phase: Phase,
    receive_timeout: Duration,
    call_id: String,
}

impl Session {
    async fn open(url: &str, config: &TransportConfig) -> Result<Self> {
        let call_id = Uuid::new_v4().to_string();
        let request = url.into_client_request().map_err(classify_ws)?;
        let connector = websocket_connector(config.accept_invalid_certs)?;

        debug!("WS connect {} (call_id={})", url, call_id);
        let connect = connect_async_tls_with_config(request, None, false, Some(connector));
        let (stream, _response) = timeout(config.receive_timeout, connect)
            .await
            .map_err(|_| {
                CommandError::Timeout(format!(
                    "WebSocket connect to {} did not complete within {:?}",
                    url, config.receive_timeout
                ))
            })?
            .map_err(classify_ws)?;

        Ok(Self {
            stream,
            phase: Phase::Connected,
            receive_timeout: config.receive_timeout,
            call_id,
        })
    }

    /// Send one envelope and wait for its reply, advancing to `next`.
    async fn step(&mut self, message: &Outbound<'_>, next: Phase) -> Result<Inbound> {
        let step = self.phase;
        let json = serde_json::to_string(message)
            .map_err(|e| CommandError::Protocol(format!("failed to encode request: {}", e)))?;

        debug!("WS send [{}] (call_id={})", step, self.call_id);
        self.stream
            .send(Message::Text(json))
            .await
            .map_err(classify_ws)?;

        let reply = self.receive(step).await?;
        self.phase = next;
        Ok(reply)
    }

    async fn receive(&mut self, step: Phase) -> Result<Inbound> {
        let deadline = Instant::now() + self.receive_timeout;
        loop {
            let frame = match timeout_at(deadline, self.stream.next()).await {
                Err(_) => {
                    return Err(CommandError::Timeout(format!(
                        "no reply to {} within {:?}",
                        step, self.receive_timeout
                    )))
                }
                Ok(None) => return Err(CommandError::Protocol("connection closed".to_string())),
                Ok(Some(frame)) => frame.map_err(classify_ws)?,
            };

            let text = match frame {
                Message::Text(text) => text,
                Message::Binary(bytes) => String::from_utf8(bytes).map_err(|_| {
                    CommandError::Protocol("received a non UTF-8 binary frame".to_string())
                })?,
                Message::Close(_) => {
                    return Err(CommandError::Protocol(
                        "connection closed by server".to_string(),
                    ))
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            };

            debug!("WS recv [{}] {} (call_id={})", step, text, self.call_id);
            return parse_reply(&text);
        }
    }

    /// Any error payload at this step is a protocol failure, whatever its code.
    async fn handshake(&mut self) -> Result<()> {
        match self.step(&Outbound::connect(), Phase::Handshaken).await {
            Ok(_) => Ok(()),
            Err(CommandError::Auth) => Err(CommandError::Protocol(
                "server rejected the connect handshake".to_string(),
            )),
            Err(e) => Err(e),
        }
    }

    async fn authenticate(&mut self, api_key: &str) -> Result<()> {
        let reply = self
            .step(&Outbound::login(api_key), Phase::Authenticated)
            .await?;
        // A rejected key may come back as a plain `false` result.
        if reply.result == Some(serde_json::Value::Bool(false)) {
            return Err(CommandError::Auth);
        }
        Ok(())
    }

    async fn invoke(&mut self, command: Command) -> Result<CommandOutput> {
        let message = match command {
            Command::GetState => Outbound::call("system.state", vec![]),
            Command::Shutdown => Outbound::call("system.shutdown", vec![command.reason()]),
            Command::Restart => Outbound::call("system.reboot", vec![command.reason()]),
        };
        let reply = self.step(&message, Phase::Invoked).await?;

        match command {
            Command::GetState => match reply.result {
                Some(serde_json::Value::String(state)) => {
                    Ok(CommandOutput::State(normalize_state(&state)))
                }
                other => Err(CommandError::Protocol(format!(
                    "system.state returned a non-string result: {:?}",
                    other
                ))),
            },
            Command::Shutdown | Command::Restart => Ok(CommandOutput::Acknowledged),
        }
    }

    async fn close(mut self) {
        match timeout(self.receive_timeout, self.stream.close(None)).await {
            Ok(Ok(())) => debug!("WS closed after {} (call_id={})", self.phase, self.call_id),
            Ok(Err(e)) => debug!("WS close failed (call_id={}): {}", self.call_id, e),
            Err(_) => debug!("WS close timed out (call_id={})", self.call_id),
        }
    }
}

/// Handshake, login and call over a fresh connection per command.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport {
    config: TransportConfig,
}

impl WebSocketTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn execute(&self, target: ApiTarget<'_>, command: Command) -> Result<CommandOutput> {
        let url = websocket_endpoint(target.endpoint);
        let mut session = Session::open(&url, &self.config).await?;

        let outcome = async {
            session.handshake().await?;
            session.authenticate(target.api_key).await?;
            session.invoke(command).await
        }
        .await;

        session.close().await;
        outcome
    }
}
