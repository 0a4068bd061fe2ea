//! TrueNAS remote power control
//!
//! This crate sends power-management commands to a TrueNAS server and wakes
//! it with Wake-on-LAN.
//!
//! # Transports
//!
//! - **REST**: one HTTPS request per command against `/api/v2.0/system/*`
//! - **WebSocket RPC**: connect, log in with the API key, then call the
//!   `system.*` method, all on one short-lived connection
//!
//! Both report failures through the same [`CommandError`] taxonomy, so
//! callers never need to know which transport a server uses.
//!
//! # Example
//!
//! ```no_run
//! use truenas_signal_client::{ManagementClient, ServerDescriptor, TransportKind};
//!
//! # async fn example() -> truenas_signal_client::Result<()> {
//! let server = ServerDescriptor::new(1, "nas")
//!     .with_api("https://nas.lan", "1-abcdef", TransportKind::Websocket);
//!
//! let client = ManagementClient::new()?;
//! let state = client.get_state(&server).await?;
//! println!("{}", state);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod rest;
pub mod rpc;
pub mod tls;
pub mod types;
pub mod validate;
pub mod websocket;
pub mod wol;

pub use client::{ManagementClient, Transport};
pub use config::{TransportConfig, DEFAULT_TIMEOUT};
pub use error::{CommandError, Result, WakeError};
pub use rest::RestTransport;
pub use types::{Command, CommandOutput, ServerDescriptor, TransportKind};
pub use validate::{is_valid_ipv4, is_valid_mac};
pub use websocket::{to_websocket_url, WebSocketTransport};
pub use wol::{build_magic_packet, WakeTarget, MAGIC_PACKET_LEN, WOL_PORT};
