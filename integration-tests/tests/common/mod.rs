use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Router;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use truenas_signal_client::{ManagementClient, ServerDescriptor, TransportConfig, TransportKind};

/// Find a free TCP port by binding to port 0
pub fn find_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to port 0");
    listener.local_addr().unwrap().port()
}

/// Client with a short step budget so timeout tests stay fast.
pub fn fast_client(timeout: Duration) -> ManagementClient {
    ManagementClient::with_config(TransportConfig::default().with_timeout(timeout))
        .expect("Failed to build client")
}

pub fn server(endpoint: &str, kind: TransportKind) -> ServerDescriptor {
    ServerDescriptor::new(1, "mock-nas").with_api(endpoint, "1-test-key", kind)
}

// ============================================================================
// REST mock
// ============================================================================

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

#[derive(Clone)]
struct RestState {
    status: StatusCode,
    body: String,
    delay: Option<Duration>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Answers every request with one fixed status and body.
pub struct MockRest {
    pub port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl MockRest {
    pub async fn start(status: u16, body: &str) -> Self {
        Self::start_with_delay(status, body, None).await
    }

    pub async fn start_with_delay(status: u16, body: &str, delay: Option<Duration>) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = RestState {
            status: StatusCode::from_u16(status).expect("Invalid status"),
            body: body.to_string(),
            delay,
            requests: requests.clone(),
        };

        let app = Router::new().fallback(rest_handler).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind REST mock");
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            port,
            requests,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for MockRest {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn rest_handler(
    State(state): State<RestState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()),
        body: String::from_utf8_lossy(&body).to_string(),
    });

    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }
    (state.status, state.body.clone())
}

// ============================================================================
// WebSocket RPC mock
// ============================================================================

/// What the mock does after receiving each client frame.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Raw(String),
    /// Never answer
    Silent,
    /// Close the connection instead of answering
    Close,
}

/// Plays a fixed script on every accepted connection and records what the
/// client sent.
pub struct MockRpc {
    pub port: u16,
    received: Arc<Mutex<Vec<Value>>>,
    paths: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl MockRpc {
    pub async fn start(script: Vec<Reply>) -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let paths = Arc::new(Mutex::new(Vec::new()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind WebSocket mock");
        let port = listener.local_addr().unwrap().port();

        let (rx, px) = (received.clone(), paths.clone());
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let script = script.clone();
                let received = rx.clone();
                let paths = px.clone();
                tokio::spawn(async move {
                    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                        paths.lock().unwrap().push(req.uri().path().to_string());
                        Ok(resp)
                    };
                    let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await
                    else {
                        return;
                    };

                    for reply in script {
                        let text = loop {
                            match ws.next().await {
                                Some(Ok(Message::Text(t))) => break t,
                                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                                _ => return,
                            }
                        };
                        let value = serde_json::from_str(&text).unwrap_or(Value::Null);
                        received.lock().unwrap().push(value);

                        match reply {
                            Reply::Json(v) => {
                                if ws.send(Message::Text(v.to_string())).await.is_err() {
                                    return;
                                }
                            }
                            Reply::Raw(s) => {
                                if ws.send(Message::Text(s)).await.is_err() {
                                    return;
                                }
                            }
                            Reply::Silent => {
                                tokio::time::sleep(Duration::from_secs(60)).await;
                                return;
                            }
                            Reply::Close => {
                                let _ = ws.close(None).await;
                                return;
                            }
                        }
                    }

                    // Drain until the client hangs up.
                    while let Some(Ok(_)) = ws.next().await {}
                });
            }
        });

        Self {
            port,
            received,
            paths,
            handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }

    /// Request path of every accepted connection.
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }
}

impl Drop for MockRpc {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Standard replies for a successful conversation.
pub fn connected() -> Reply {
    Reply::Json(serde_json::json!({"msg": "connected", "session": "mock-session"}))
}

pub fn result(id: u32, value: Value) -> Reply {
    Reply::Json(serde_json::json!({"msg": "result", "id": id, "result": value}))
}

pub fn rpc_error(id: u32, code: i64, reason: &str) -> Reply {
    Reply::Json(serde_json::json!({
        "msg": "result",
        "id": id,
        "error": {"error": code, "reason": reason}
    }))
}
