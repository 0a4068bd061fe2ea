//! Management client and the transport seam

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::TransportConfig;
use crate::error::{CommandError, Result, WakeError};
use crate::rest::RestTransport;
use crate::types::{
    normalize_state, ApiTarget, Command, CommandOutput, ServerDescriptor, TransportKind,
};
use crate::websocket::WebSocketTransport;
use crate::wol::WakeTarget;

/// One wire protocol capable of executing a management command.
///
/// Implementations attempt the command exactly once and report every failure
/// as a classified [`CommandError`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, target: ApiTarget<'_>, command: Command) -> Result<CommandOutput>;
}

/// Runs commands against a server over whichever transport its descriptor
/// names.
///
/// Holds no per-server state: each call opens and tears down its own
/// connection, so one client can serve any number of concurrent calls.
#[derive(Clone)]
pub struct ManagementClient {
    rest: Arc<dyn Transport>,
    websocket: Arc<dyn Transport>,
}

impl ManagementClient {
    pub fn new() -> Result<Self> {
        Self::with_config(TransportConfig::default())
    }

    pub fn with_config(config: TransportConfig) -> Result<Self> {
        let rest = RestTransport::new(config.clone())?;
        let websocket = WebSocketTransport::new(config);
        Ok(Self::with_transports(Arc::new(rest), Arc::new(websocket)))
    }

    /// Build a client over arbitrary transports.
    pub fn with_transports(rest: Arc<dyn Transport>, websocket: Arc<dyn Transport>) -> Self {
        Self { rest, websocket }
    }

    fn transport(&self, kind: TransportKind) -> &dyn Transport {
        match kind {
            TransportKind::Rest => self.rest.as_ref(),
            TransportKind::Websocket => self.websocket.as_ref(),
        }
    }

    pub async fn execute(
        &self,
        server: &ServerDescriptor,
        command: Command,
    ) -> Result<CommandOutput> {
        let target = server.api_target().ok_or(CommandError::Configuration)?;

        info!(
            "Executing {} on server {} ({}) over {}",
            command, server.id, server.name, server.transport
        );
        let output = self
            .transport(server.transport)
            .execute(target, command)
            .await?;
        debug!("{} on server {} succeeded", command, server.id);

        Ok(match output {
            CommandOutput::State(state) => CommandOutput::State(normalize_state(&state)),
            other => other,
        })
    }

    pub async fn get_state(&self, server: &ServerDescriptor) -> Result<String> {
        match self.execute(server, Command::GetState).await? {
            CommandOutput::State(state) => Ok(state),
            CommandOutput::Acknowledged => Err(CommandError::Protocol(
                "state query returned no state".to_string(),
            )),
        }
    }

    pub async fn shutdown(&self, server: &ServerDescriptor) -> Result<()> {
        self.execute(server, Command::Shutdown).await.map(|_| ())
    }

    pub async fn restart(&self, server: &ServerDescriptor) -> Result<()> {
        self.execute(server, Command::Restart).await.map(|_| ())
    }

    /// Broadcast a magic packet for the server. Does not touch the API.
    pub async fn wake(&self, server: &ServerDescriptor) -> std::result::Result<(), WakeError> {
        WakeTarget::from_descriptor(server)?.send().await
    }
}
