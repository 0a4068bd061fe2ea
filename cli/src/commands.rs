use anyhow::{bail, Context, Result};
use std::path::Path;
use std::time::Duration;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::{info, warn};
use truenas_signal_client::{
    is_valid_ipv4, is_valid_mac, CommandError, ManagementClient, ServerDescriptor, TransportKind,
};

use crate::config::ProfileStore;
use crate::display::{display_state, server_row, NOT_CONFIGURED, NO_CONNECTION};

/// Field changes requested on the command line. `Some("")` clears a field.
#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub mac: Option<String>,
    pub broadcast: Option<String>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub transport: Option<TransportKind>,
}

fn trimmed(value: String) -> Option<String> {
    let v = value.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

/// Validate and apply an edit. Nothing is changed if validation fails.
pub fn apply_edit(server: &mut ServerDescriptor, edit: ProfileEdit) -> Result<()> {
    let broadcast = edit.broadcast.map(trimmed);
    let mac = edit.mac.map(trimmed);

    if let Some(Some(b)) = &broadcast {
        if !is_valid_ipv4(b) {
            bail!("Invalid broadcast address {:?}. Example: 192.168.0.255", b);
        }
    }
    if let Some(Some(m)) = &mac {
        if !is_valid_mac(m) {
            bail!("Invalid MAC address {:?}. Example: A1-B2-C3-D4-E5-F6", m);
        }
    }

    if let Some(b) = broadcast {
        server.broadcast_address = b;
    }
    if let Some(m) = mac {
        server.mac_address = m;
    }
    if let Some(e) = edit.endpoint {
        server.endpoint = trimmed(e);
    }
    if let Some(k) = edit.api_key {
        server.api_key = trimmed(k);
    }
    if let Some(t) = edit.transport {
        server.transport = t;
    }
    Ok(())
}

fn lookup(store: &ProfileStore, key: &str) -> Result<ServerDescriptor> {
    store
        .find(key)
        .cloned()
        .with_context(|| format!("No saved server matches {:?}", key))
}

/// Load a saved server and apply a call-time key override.
fn resolve(path: &Path, key: &str, api_key: Option<String>) -> Result<ServerDescriptor> {
    let store = ProfileStore::load(path)?;
    let mut server = lookup(&store, key)?;
    if let Some(k) = api_key.and_then(trimmed) {
        server.api_key = Some(k);
    }
    Ok(server)
}

pub fn list(path: &Path) -> Result<()> {
    let store = ProfileStore::load(path)?;
    if store.servers.is_empty() {
        println!("No servers saved. Add one with `truenas-signal add --name <name>`.");
        return Ok(());
    }
    for server in store.sorted() {
        println!("{}", server_row(server));
    }
    Ok(())
}

pub fn add(path: &Path, name: String, edit: ProfileEdit) -> Result<()> {
    let name = trimmed(name).context("Please provide a name for this server.")?;

    let mut store = ProfileStore::load(path)?;
    let mut server = ServerDescriptor::new(store.allocate_id(), name);
    apply_edit(&mut server, edit)?;

    let id = server.id;
    store.upsert(server);
    store.save(path)?;

    info!("Saved server {} to {:?}", id, path);
    println!("Server saved successfully (id {}).", id);
    Ok(())
}

pub fn edit(path: &Path, key: &str, name: Option<String>, edit: ProfileEdit) -> Result<()> {
    let mut store = ProfileStore::load(path)?;
    let mut server = lookup(&store, key)?;

    if let Some(n) = name {
        server.name = trimmed(n).context("Server name cannot be empty.")?;
    }
    apply_edit(&mut server, edit)?;

    store.upsert(server);
    store.save(path)?;
    println!("Server saved successfully.");
    Ok(())
}

pub fn remove(path: &Path, key: &str) -> Result<()> {
    let mut store = ProfileStore::load(path)?;
    let server = lookup(&store, key)?;
    store.remove(server.id);
    store.save(path)?;
    println!("Server {} deleted.", server.name);
    Ok(())
}

pub fn clear(path: &Path) -> Result<()> {
    let mut store = ProfileStore::load(path)?;
    store.clear();
    store.save(path)?;
    println!("All servers deleted.");
    Ok(())
}

/// Display form of the server state; never fails.
async fn query_status(client: &ManagementClient, server: &ServerDescriptor) -> String {
    if !server.is_api_configured() {
        return NOT_CONFIGURED.to_string();
    }
    match client.get_state(server).await {
        Ok(state) => display_state(&state),
        Err(e) => {
            warn!("State query for {} failed: {}", server.name, e);
            NO_CONNECTION.to_string()
        }
    }
}

pub async fn status(path: &Path, key: &str, api_key: Option<String>) -> Result<()> {
    let server = resolve(path, key, api_key)?;
    let client = ManagementClient::new()?;
    println!("{}", query_status(&client, &server).await);
    Ok(())
}

pub async fn watch(path: &Path, key: &str, interval: u64, api_key: Option<String>) -> Result<()> {
    let server = resolve(path, key, api_key)?;
    let client = ManagementClient::new()?;
    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));

    loop {
        tokio::select! {
            state = async {
                ticker.tick().await;
                query_status(&client, &server).await
            } => {
                println!("[{}] {}: {}", timestamp(), server.name, state);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping watch");
                return Ok(());
            }
        }
    }
}

fn timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(format_description!("[hour]:[minute]:[second]Z"))
        .unwrap_or_default()
}

pub async fn shutdown(path: &Path, key: &str, api_key: Option<String>) -> Result<()> {
    let server = resolve(path, key, api_key)?;
    let client = ManagementClient::new()?;
    client
        .shutdown(&server)
        .await
        .context("Server shutdown failed")?;
    println!("Shutdown request sent.");
    Ok(())
}

pub async fn restart(path: &Path, key: &str, api_key: Option<String>) -> Result<()> {
    let server = resolve(path, key, api_key)?;
    let client = ManagementClient::new()?;
    client
        .restart(&server)
        .await
        .context("Server restart failed")?;
    println!("Restart request sent.");
    Ok(())
}

pub async fn wake(path: &Path, key: &str) -> Result<()> {
    let server = resolve(path, key, None)?;
    let client = ManagementClient::new()?;
    client.wake(&server).await.context("Server wakeup failed")?;
    println!("Wake On LAN magic packet sent.");
    Ok(())
}

pub async fn test(endpoint: String, api_key: String, transport: TransportKind) -> Result<()> {
    let server = ServerDescriptor::new(0, "api-test").with_api(
        endpoint.trim(),
        api_key.trim(),
        transport,
    );
    if !server.is_api_configured() {
        bail!("API not configured. Please ensure that the API key and endpoint have been set.");
    }

    println!("Connection test started; results will be received in 10 seconds or less.");
    let client = ManagementClient::new()?;
    match client.get_state(&server).await {
        Ok(state) => {
            println!(
                "Connection established. The connection test was successful (state: {}).",
                display_state(&state)
            );
            Ok(())
        }
        Err(CommandError::Timeout(_)) => {
            bail!("Request timed out. No response from the server after 10 seconds.")
        }
        Err(e) => bail!("Test failed. Reason: {}", e),
    }
}
