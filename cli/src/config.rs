use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use truenas_signal_client::ServerDescriptor;

/// Saved server profiles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileStore {
    #[serde(default)]
    pub servers: Vec<ServerDescriptor>,
    /// Highest id ever handed out, kept across removals and `clear`.
    #[serde(default)]
    pub last_id: u32,
}

impl ProfileStore {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path).with_context(|| format!("Failed to read config {:?}", path))?;
        let store = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {:?}", parent))?;
        }
        let bytes = serde_json::to_vec_pretty(self).context("Failed to serialize config")?;
        fs::write(path, bytes).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    /// Id for the next new profile. Ids are never reused, even after the
    /// profile holding the highest one is removed.
    pub fn next_id(&self) -> u32 {
        let highest = self.servers.iter().map(|s| s.id).max().unwrap_or(0);
        highest.max(self.last_id) + 1
    }

    /// Reserve [`next_id`](Self::next_id); the reservation persists on save.
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id();
        self.last_id = id;
        id
    }

    /// Profiles ordered by name.
    pub fn sorted(&self) -> Vec<&ServerDescriptor> {
        let mut servers: Vec<_> = self.servers.iter().collect();
        servers.sort_by_key(|s| s.name.to_lowercase());
        servers
    }

    /// Look a server up by numeric id, then by case-insensitive name.
    pub fn find(&self, key: &str) -> Option<&ServerDescriptor> {
        if let Ok(id) = key.parse::<u32>() {
            if let Some(server) = self.servers.iter().find(|s| s.id == id) {
                return Some(server);
            }
        }
        self.servers
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(key))
    }

    /// Insert, or replace the profile with the same id.
    pub fn upsert(&mut self, server: ServerDescriptor) {
        self.servers.retain(|s| s.id != server.id);
        self.servers.push(server);
    }

    pub fn remove(&mut self, id: u32) -> Option<ServerDescriptor> {
        let pos = self.servers.iter().position(|s| s.id == id)?;
        Some(self.servers.remove(pos))
    }

    pub fn clear(&mut self) {
        self.servers.clear();
    }
}

pub fn default_config_path() -> PathBuf {
    let mut dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.push("truenas-signal");
    dir.push("servers.json");
    dir
}
