use async_trait::async_trait;
use reqwest::{Method, Url};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::classify::{classify_http, classify_status};
use crate::client::Transport;
use crate::config::TransportConfig;
use crate::error::{CommandError, Result};
use crate::types::{normalize_state, ApiTarget, Command, CommandOutput};

/// Base URL used when a caller sends without an endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://truenas.local";

pub const STATE_PATH: &str = "/api/v2.0/system/state";
pub const SHUTDOWN_PATH: &str = "/api/v2.0/system/shutdown";
pub const REBOOT_PATH: &str = "/api/v2.0/system/reboot";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestMethod {
    Get,
    Post,
}

impl From<RestMethod> for Method {
    fn from(m: RestMethod) -> Self {
        match m {
            RestMethod::Get => Method::GET,
            RestMethod::Post => Method::POST,
        }
    }
}

/// One request/response cycle per call against the REST flavour of the API.
#[derive(Clone)]
pub struct RestTransport {
    http: reqwest::Client,
    config: TransportConfig,
}

impl RestTransport {
    pub fn new(config: TransportConfig) -> Result<Self> {
        // No idle connections are kept: every call opens its own.
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(0)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| CommandError::Connection(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn build_url(endpoint: Option<&str>, path: &str) -> Result<Url> {
        let base = endpoint.filter(|e| !e.is_empty()).unwrap_or(DEFAULT_ENDPOINT);
        let base = Url::parse(base)
            .map_err(|e| CommandError::Connection(format!("invalid endpoint {}: {}", base, e)))?;
        base.join(path).map_err(|e| {
            CommandError::Connection(format!("failed to join {} with {}: {}", base, path, e))
        })
    }

    /// Send one request and return the body of a 200 response verbatim.
    pub async fn send(
        &self,
        endpoint: Option<&str>,
        api_key: &str,
        path: &str,
        method: RestMethod,
        body: Option<serde_json::Value>,
    ) -> Result<String> {
        let url = Self::build_url(endpoint, path)?;
        let req_id = Uuid::new_v4().to_string();

        let mut req = self
            .http
            .request(method.into(), url.clone())
            .bearer_auth(api_key)
            .header("x-request-id", &req_id);
        if let Some(b) = &body {
            req = req.json(b);
        }

        debug!("HTTP {:?} {} (request_id={})", method, url, req_id);
        let timeout = self.config.request_timeout;
        let resp = req.send().await.map_err(|e| classify_http(e, timeout))?;
        let status = resp.status();
        debug!("HTTP {:?} {} -> {}", method, url, status.as_u16());

        if let Some(err) = classify_status(status.as_u16(), status.canonical_reason()) {
            return Err(err);
        }

        resp.text().await.map_err(|e| classify_http(e, timeout))
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn execute(&self, target: ApiTarget<'_>, command: Command) -> Result<CommandOutput> {
        let endpoint = Some(target.endpoint);
        match command {
            Command::GetState => {
                let body = self
                    .send(endpoint, target.api_key, STATE_PATH, RestMethod::Get, None)
                    .await?;
                Ok(CommandOutput::State(normalize_state(&body)))
            }
            Command::Shutdown | Command::Restart => {
                let path = if command == Command::Shutdown {
                    SHUTDOWN_PATH
                } else {
                    REBOOT_PATH
                };
                let body = json!({ "reason": command.reason() });
                self.send(endpoint, target.api_key, path, RestMethod::Post, Some(body))
                    .await?;
                Ok(CommandOutput::Acknowledged)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_url() {
        let url = RestTransport::build_url(Some("https://nas.lan"), STATE_PATH).unwrap();
        assert_eq!(url.as_str(), "https://nas.lan/api/v2.0/system/state");

        // An absolute path replaces whatever path the endpoint carries.
        let url = RestTransport::build_url(Some("https://nas.lan/ui/"), REBOOT_PATH).unwrap();
        assert_eq!(url.as_str(), "https://nas.lan/api/v2.0/system/reboot");
    }

    #[test]
    fn test_build_url_default_endpoint() {
        let url = RestTransport::build_url(None, SHUTDOWN_PATH).unwrap();
        assert_eq!(url.as_str(), "https://truenas.local/api/v2.0/system/shutdown");

        let url = RestTransport::build_url(Some(""), SHUTDOWN_PATH).unwrap();
        assert_eq!(url.host_str(), Some("truenas.local"));
    }

    #[test]
    fn test_build_url_invalid_endpoint() {
        assert!(matches!(
            RestTransport::build_url(Some("not a url"), STATE_PATH),
            Err(CommandError::Connection(_))
        ));
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(Method::from(RestMethod::Get), Method::GET);
        assert_eq!(Method::from(RestMethod::Post), Method::POST);
    }
}
